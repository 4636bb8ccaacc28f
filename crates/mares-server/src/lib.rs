//! Local preview server for generated sites.
//!
//! Serves the output directory over HTTP and, with live reload enabled,
//! watches it for changes and tells connected browsers to reload.

pub mod server;
pub mod watcher;
pub mod websocket;

pub use server::{PreviewConfig, PreviewServer, ServerError};
pub use watcher::{FileWatcher, WatchEvent};
pub use websocket::{ReloadHub, ReloadMessage};
