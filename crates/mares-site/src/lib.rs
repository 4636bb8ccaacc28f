//! Static site generator for the mares archive.
//!
//! Turns a loaded [`mares_db::Archive`] into a tree of HTML pages: a landing
//! page and listing with collection-wide totals, one detail page per record,
//! and per-record pages for its reference materials and transcripts.

pub mod assets;
pub mod generator;
pub mod markup;
pub mod paths;
pub mod templates;

pub use assets::{AssetError, AssetPipeline, CssStep};
pub use generator::{
    BuildConfig, BuildError, BuildResult, DocumentPages, PageKey, PageWarning, SiteGenerator,
    StandalonePage,
};
pub use markup::{to_html, Conversion, MarkupStep, MarkupWarning};
pub use paths::{PageKind, PathTable};
pub use templates::{RenderError, SiteEnvironment};
