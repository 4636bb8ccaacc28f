//! Flat-file record database for mares.
//!
//! Loads one `index.yaml` record per source folder together with its freeform
//! documents, and aggregates `H:M:S` film durations into elapsed totals.

pub mod duration;
pub mod loader;
pub mod record;

pub use duration::{parse_duration, total, DurationError, Elapsed};
pub use loader::{load_archive, Archive, LoadError};
pub use record::{Category, Film, Films, Record, Totals};
