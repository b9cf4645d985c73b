use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher, recommended_watcher};
use tokio::sync::mpsc;

use crate::core::StorageError;

/// Represents a file system event for a watched domain file.
#[derive(Debug, Clone)]
pub struct FileEvent {
    /// The path of the file that changed
    pub path: PathBuf,
    /// The type of change that occurred
    pub kind: FileEventKind,
}

/// The type of file system change that occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    /// File was modified
    Modified,
    /// File was created (including replacement by rename)
    Created,
    /// File was removed
    Removed,
}

/// Watches a single file for changes made by any process.
///
/// The parent directory is watched rather than the file itself, because
/// atomic writes replace the file and would otherwise drop the watch.
/// Events for other files in the directory are filtered out.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl FileWatcher {
    /// Starts watching `path` and returns the watcher and event receiver.
    ///
    /// Uses an unbounded channel since file events are typically infrequent but bursty.
    ///
    /// # Errors
    /// Returns `StorageError::FileWatch` if the path has no parent directory or the
    /// underlying file system watcher cannot be initialized.
    pub fn new(
        path: impl AsRef<Path>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<FileEvent>), StorageError> {
        let path = path.as_ref().to_path_buf();
        let directory = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .ok_or_else(|| StorageError::FileWatch {
                details: format!("'{}' has no parent directory", path.display()),
            })?;
        let file_name = path.file_name().map(|name| name.to_os_string());

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let mut watcher = recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else {
                return;
            };

            let kind = match event.kind {
                EventKind::Create(_) => FileEventKind::Created,
                EventKind::Modify(_) => FileEventKind::Modified,
                EventKind::Remove(_) => FileEventKind::Removed,
                _ => return,
            };

            for changed in event.paths {
                if changed.file_name().map(|name| name.to_os_string()) != file_name {
                    continue;
                }

                let _ = event_tx.send(FileEvent {
                    path: changed,
                    kind,
                });
            }
        })
        .map_err(|e| StorageError::FileWatch {
            details: format!("failed to create watcher: {e}"),
        })?;

        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(|e| StorageError::FileWatch {
                details: format!("failed to watch '{}': {e}", directory.display()),
            })?;

        Ok((
            Self {
                _watcher: watcher,
                path,
            },
            event_rx,
        ))
    }

    /// The file being watched.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
