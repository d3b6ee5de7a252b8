//! jobloop-watch: detects newly recorded runs and fans them out.
//!
//! Runner processes write to the store and exit; nothing tells the
//! interactive session directly. This crate watches the store's files,
//! walks rows past a monotonic cursor, and emits notification and refresh
//! events over channels. Each row is processed at most once per process
//! uptime; after a restart the cursor re-seeds from the store's max id, so
//! delivery across restarts is at-least-once.

pub mod snapshot;
pub mod watcher;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use jobloop_config::Settings;
use jobloop_scheduler::JobRegistry;
use jobloop_store::LogStore;
use jobloop_types::RunStatus;

/// A finished run that the user should hear about.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEvent {
    pub job_name: String,
    pub message: String,
    pub success: bool,
    pub output_preview: String,
    pub color: Option<String>,
    pub icon: Option<String>,
}

/// Something in the store changed; views should reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshEvent;

pub struct LogWatcher {
    store: LogStore,
    registry: Arc<JobRegistry>,
    settings: Settings,
    notifications: mpsc::UnboundedSender<NotificationEvent>,
    refresh: mpsc::UnboundedSender<RefreshEvent>,
    last_processed_id: AtomicI64,
    scan_gate: Mutex<()>,
    rescan_queued: AtomicBool,
}

impl LogWatcher {
    /// Build a watcher whose cursor starts at the store's current max id,
    /// so only runs recorded after construction are reported.
    pub async fn new(
        store: LogStore,
        registry: Arc<JobRegistry>,
        settings: Settings,
        notifications: mpsc::UnboundedSender<NotificationEvent>,
        refresh: mpsc::UnboundedSender<RefreshEvent>,
    ) -> jobloop_store::Result<Self> {
        let start_id = store.max_id().await?;
        Ok(Self {
            store,
            registry,
            settings,
            notifications,
            refresh,
            last_processed_id: AtomicI64::new(start_id),
            scan_gate: Mutex::new(()),
            rescan_queued: AtomicBool::new(false),
        })
    }

    pub fn last_processed_id(&self) -> i64 {
        self.last_processed_id.load(Ordering::SeqCst)
    }

    /// Ask for a scan. If one is already in flight the request is queued and
    /// the in-flight scan runs again before releasing the gate, so a change
    /// landing mid-scan is never lost and scans never pile up.
    pub async fn request_scan(&self) {
        let _guard = match self.scan_gate.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                self.rescan_queued.store(true, Ordering::SeqCst);
                return;
            }
        };

        loop {
            if let Err(e) = self.process_new_logs().await {
                warn!("Log scan failed: {e}");
            }
            if !self.rescan_queued.swap(false, Ordering::SeqCst) {
                break;
            }
            debug!("Rescan was queued during scan, running again");
        }
    }

    /// One pass over rows newer than the cursor.
    async fn process_new_logs(&self) -> jobloop_store::Result<()> {
        let cursor = self.last_processed_id.load(Ordering::SeqCst);
        let entries = self.store.entries_after(cursor).await?;
        if entries.is_empty() {
            return Ok(());
        }
        debug!(count = entries.len(), after = cursor, "Processing new log rows");

        for entry in &entries {
            // The cursor advances even for rows we skip
            self.last_processed_id.fetch_max(entry.id, Ordering::SeqCst);

            let job = match self.registry.get_job(&entry.job_name) {
                Ok(Some(job)) => job,
                Ok(None) => {
                    debug!(job = %entry.job_name, "Run for unknown job, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(job = %entry.job_name, "Failed to resolve job: {e}");
                    continue;
                }
            };
            if job.silent {
                continue;
            }

            if let Err(e) = snapshot::write_snapshot(&self.settings.results_dir, entry) {
                warn!(job = %entry.job_name, "Failed to write result snapshot: {e}");
            }

            let success = entry.status == RunStatus::Success;
            let wanted = if success {
                self.settings.notify_on_success
            } else {
                self.settings.notify_on_failure
            };
            if !wanted {
                continue;
            }

            let message = if success {
                format!("Completed successfully in {:.1}s", entry.duration_seconds)
            } else {
                format!("Failed with exit code {}", entry.exit_code)
            };
            let event = NotificationEvent {
                job_name: entry.job_name.clone(),
                message,
                success,
                output_preview: output_preview(&entry.stdout),
                color: job.color.clone(),
                icon: job.icon.clone(),
            };
            if self.notifications.send(event).is_err() {
                debug!("Notification channel closed");
            }
        }

        // One refresh per batch regardless of how many rows landed
        let _ = self.refresh.send(RefreshEvent);
        Ok(())
    }

    /// Drop run entries older than the configured retention. Called once at
    /// watcher startup; failures are logged and swallowed.
    pub async fn run_startup_maintenance(&self) {
        match self
            .store
            .purge_older_than(self.settings.log_retention_days)
            .await
        {
            Ok(0) => {}
            Ok(purged) => info!(purged, "Purged old run entries"),
            Err(e) => warn!("Log maintenance failed: {e}"),
        }
    }
}

/// Condense stdout into a short notification body: first three non-empty
/// lines joined by spaces, capped at 150 characters.
fn output_preview(stdout: &str) -> String {
    let lines: Vec<&str> = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let mut preview = lines.iter().take(3).copied().collect::<Vec<_>>().join(" ");
    if preview.chars().count() > 150 {
        preview = preview.chars().take(147).collect();
        preview.push_str("...");
    } else if lines.len() > 3 {
        preview.push_str("...");
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use jobloop_scheduler::MemoryBackend;
    use jobloop_types::{Job, RunEntry};

    fn entry(id_hint: &str, exit_code: i32) -> RunEntry {
        let now = Local::now();
        RunEntry {
            id: 0,
            job_name: id_hint.to_string(),
            start_time: now,
            end_time: now,
            exit_code,
            status: RunStatus::from_exit_code(exit_code),
            prompt: "p".into(),
            command: "claude -p \"p\"".into(),
            stdout: "line one\nline two".into(),
            stderr: String::new(),
            duration_seconds: 1.5,
            agent_name: "Claude".into(),
            log_file_path: format!("/tmp/{id_hint}.log"),
            favorite: false,
        }
    }

    async fn harness(
        mut settings: Settings,
        jobs: &[Job],
    ) -> (
        LogWatcher,
        LogStore,
        mpsc::UnboundedReceiver<NotificationEvent>,
        mpsc::UnboundedReceiver<RefreshEvent>,
        tempfile::TempDir,
    ) {
        let results = tempfile::tempdir().unwrap();
        settings.results_dir = results.path().to_path_buf();
        let store = LogStore::open_in_memory().unwrap();
        let registry = Arc::new(
            JobRegistry::new(Arc::new(MemoryBackend::new()), "claude -p \"{prompt}\"", "/tmp")
                .with_runner_exe("/usr/bin/jobloop"),
        );
        for job in jobs {
            registry.create_job(job).unwrap();
        }
        let (notif_tx, notif_rx) = mpsc::unbounded_channel();
        let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();
        let watcher = LogWatcher::new(store.clone(), registry, settings, notif_tx, refresh_tx)
            .await
            .unwrap();
        (watcher, store, notif_rx, refresh_rx, results)
    }

    #[test]
    fn test_preview_short_output() {
        assert_eq!(output_preview("hello\nworld"), "hello world");
    }

    #[test]
    fn test_preview_skips_blank_lines_and_marks_overflow() {
        let preview = output_preview("one\n\n  \ntwo\nthree\nfour");
        assert_eq!(preview, "one two three...");
    }

    #[test]
    fn test_preview_hard_cap() {
        let long = "x".repeat(400);
        let preview = output_preview(&long);
        assert_eq!(preview.chars().count(), 150);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn test_preview_empty() {
        assert_eq!(output_preview(""), "");
    }

    #[tokio::test]
    async fn test_scan_advances_cursor_and_notifies() {
        let job = Job::new("build-check", "check the build");
        let (watcher, store, mut notif_rx, mut refresh_rx, _results) =
            harness(Settings::default(), &[job]).await;

        for _ in 0..3 {
            store.insert(&entry("build-check", 0)).await.unwrap();
        }
        watcher.request_scan().await;

        assert_eq!(watcher.last_processed_id(), 3);
        for _ in 0..3 {
            let event = notif_rx.try_recv().unwrap();
            assert!(event.success);
            assert_eq!(event.output_preview, "line one line two");
            assert!(event.message.starts_with("Completed successfully"));
        }
        assert!(notif_rx.try_recv().is_err());
        // One refresh for the whole batch
        assert!(refresh_rx.try_recv().is_ok());
        assert!(refresh_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_and_silent_jobs_skip_but_advance() {
        let mut silent = Job::new("quiet", "p");
        silent.silent = true;
        let (watcher, store, mut notif_rx, _refresh_rx, _results) =
            harness(Settings::default(), &[silent]).await;

        store.insert(&entry("quiet", 0)).await.unwrap();
        store.insert(&entry("never-registered", 1)).await.unwrap();
        watcher.request_scan().await;

        assert_eq!(watcher.last_processed_id(), 2);
        assert!(notif_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failure_message_and_filtering() {
        let job = Job::new("flaky", "p");
        let mut settings = Settings::default();
        settings.notify_on_success = false;
        let (watcher, store, mut notif_rx, _refresh_rx, _results) =
            harness(settings, &[job]).await;

        store.insert(&entry("flaky", 0)).await.unwrap();
        store.insert(&entry("flaky", 7)).await.unwrap();
        watcher.request_scan().await;

        let event = notif_rx.try_recv().unwrap();
        assert!(!event.success);
        assert_eq!(event.message, "Failed with exit code 7");
        assert!(notif_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cursor_starts_at_existing_max() {
        let store = LogStore::open_in_memory().unwrap();
        store.insert(&entry("pre-existing", 0)).await.unwrap();
        store.insert(&entry("pre-existing", 0)).await.unwrap();

        let registry = Arc::new(JobRegistry::new(
            Arc::new(MemoryBackend::new()),
            "claude -p \"{prompt}\"",
            "/tmp",
        ));
        let (notif_tx, mut notif_rx) = mpsc::unbounded_channel();
        let (refresh_tx, _refresh_rx) = mpsc::unbounded_channel();
        let watcher = LogWatcher::new(
            store.clone(),
            registry,
            Settings::default(),
            notif_tx,
            refresh_tx,
        )
        .await
        .unwrap();

        assert_eq!(watcher.last_processed_id(), 2);
        watcher.request_scan().await;
        assert!(notif_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_request_during_scan_triggers_one_more_pass() {
        let job = Job::new("busy", "p");
        let (watcher, store, _notif_rx, _refresh_rx, _results) =
            harness(Settings::default(), &[job]).await;
        let watcher = Arc::new(watcher);

        // Hold the gate so the next request can only queue
        let guard = watcher.scan_gate.try_lock().unwrap();
        store.insert(&entry("busy", 0)).await.unwrap();
        watcher.request_scan().await;
        assert!(watcher.rescan_queued.load(Ordering::SeqCst));
        assert_eq!(watcher.last_processed_id(), 0);
        drop(guard);

        // The queued flag drains on the next scan
        watcher.request_scan().await;
        assert_eq!(watcher.last_processed_id(), 1);
        assert!(!watcher.rescan_queued.load(Ordering::SeqCst));
    }
}
