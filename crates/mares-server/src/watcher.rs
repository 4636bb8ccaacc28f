//! File watching for live reload.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

/// Events emitted by the file watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// File was created or modified
    Changed(PathBuf),

    /// File was deleted
    Removed(PathBuf),
}

/// File watcher for detecting changes in the served directory.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Watch `root` recursively.
    ///
    /// Returns the watcher and a channel to receive events. A burst of events
    /// is reported once, as its last event, after 100ms without new events.
    pub fn new(root: &Path) -> Result<(Self, async_mpsc::Receiver<WatchEvent>), std::io::Error> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(std::io::Error::other)?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(std::io::Error::other)?;

        std::thread::spawn(move || {
            let quiet = Duration::from_millis(100);

            while let Ok(event) = sync_rx.recv() {
                let mut latest = last_classified(&event);

                // Wait for the burst to settle, keeping only its last event
                let disconnected = loop {
                    match sync_rx.recv_timeout(quiet) {
                        Ok(event) => {
                            if let Some(e) = last_classified(&event) {
                                latest = Some(e);
                            }
                        }
                        Err(mpsc::RecvTimeoutError::Timeout) => break false,
                        Err(mpsc::RecvTimeoutError::Disconnected) => break true,
                    }
                };

                if let Some(e) = latest {
                    if async_tx.blocking_send(e).is_err() {
                        return;
                    }
                }
                if disconnected {
                    return;
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

/// The last path of `event` that classifies as a change.
fn last_classified(event: &notify::Event) -> Option<WatchEvent> {
    event
        .paths
        .iter()
        .rev()
        .find_map(|path| classify_event(path, &event.kind))
}

/// Classify a notify event into a WatchEvent.
fn classify_event(path: &Path, kind: &notify::EventKind) -> Option<WatchEvent> {
    use notify::EventKind;

    match kind {
        EventKind::Create(_) | EventKind::Modify(_) => Some(WatchEvent::Changed(path.to_path_buf())),
        EventKind::Remove(_) => Some(WatchEvent::Removed(path.to_path_buf())),
        _ => None,
    }
}
