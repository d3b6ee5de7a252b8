//! Filesystem watcher that turns store file mutations into scan requests.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify_debouncer_mini::{DebouncedEventKind, new_debouncer};
use tracing::{info, warn};

use jobloop_store::DB_FILE_NAME;

use crate::LogWatcher;

const DEBOUNCE: Duration = Duration::from_millis(500);

/// Start watching the logs directory for database mutations.
/// Returns a JoinHandle that can be used to abort the watcher.
pub fn start_log_watcher(
    watcher: Arc<LogWatcher>,
    logs_dir: PathBuf,
) -> Option<tokio::task::JoinHandle<()>> {
    if !logs_dir.exists() {
        info!(
            "Logs directory {} does not exist yet, skipping watcher",
            logs_dir.display()
        );
        return None;
    }

    let handle = tokio::task::spawn_blocking(move || {
        run_watcher(logs_dir, watcher);
    });

    Some(handle)
}

fn run_watcher(logs_dir: PathBuf, log_watcher: Arc<LogWatcher>) {
    let (tx, rx) = std::sync::mpsc::channel();

    let mut debouncer = match new_debouncer(DEBOUNCE, tx) {
        Ok(d) => d,
        Err(e) => {
            warn!("Failed to create file watcher: {e}");
            return;
        }
    };

    if let Err(e) = debouncer
        .watcher()
        .watch(&logs_dir, notify::RecursiveMode::NonRecursive)
    {
        warn!("Failed to watch logs directory: {e}");
        return;
    }

    info!("Log watcher started: watching {}", logs_dir.display());

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                // SQLite touches the db plus -wal/-shm siblings; any of them
                // counts as a store mutation
                let db_changed = events.iter().any(|event| {
                    event.kind == DebouncedEventKind::Any
                        && event
                            .path
                            .file_name()
                            .and_then(|n| n.to_str())
                            .is_some_and(|n| n.starts_with(DB_FILE_NAME))
                });

                if db_changed {
                    let log_watcher = log_watcher.clone();
                    match tokio::runtime::Handle::try_current() {
                        Ok(handle) => {
                            handle.spawn(async move {
                                log_watcher.request_scan().await;
                            });
                        }
                        Err(_) => {
                            warn!("No tokio runtime available for log scan");
                        }
                    }
                }
            }
            Ok(Err(e)) => {
                warn!("Log watcher error: {e:?}");
            }
            Err(_) => {
                info!("Log watcher channel closed, stopping");
                break;
            }
        }
    }
}
