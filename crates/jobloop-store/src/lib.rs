//! jobloop-store: SQLite-backed run history.
//!
//! One row per job execution, appended by detached runner processes and read
//! by the interactive session. WAL mode is required: the change-detection
//! pipeline polls from a different process than the one writing.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Local};
use rusqlite::{Connection, OptionalExtension};
use tokio::sync::Mutex;

use jobloop_types::{RunEntry, RunStatus};

pub const DB_FILE_NAME: &str = "jobloop_logs.db";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Blocking task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS Logs (
        Id INTEGER PRIMARY KEY AUTOINCREMENT,
        JobName TEXT NOT NULL,
        StartTime TEXT NOT NULL,
        EndTime TEXT,
        ExitCode INTEGER,
        Status INTEGER,
        Prompt TEXT,
        Command TEXT,
        StandardOutput TEXT,
        StandardError TEXT,
        DurationSeconds REAL,
        AgentName TEXT,
        LogFilePath TEXT,
        IsFavorite INTEGER DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS idx_logs_jobname ON Logs(JobName);
    CREATE INDEX IF NOT EXISTS idx_logs_starttime ON Logs(StartTime DESC);";

const COLUMNS: &str = "Id, JobName, StartTime, EndTime, ExitCode, Status, Prompt, Command, \
     StandardOutput, StandardError, DurationSeconds, AgentName, LogFilePath, IsFavorite";

/// SQLite-backed store for run entries.
#[derive(Clone)]
pub struct LogStore {
    conn: Arc<Mutex<Connection>>,
}

impl LogStore {
    /// Open (or create) the database inside the given logs directory.
    pub fn open(logs_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(logs_dir)?;
        let path = logs_dir.join(DB_FILE_NAME);
        let conn = Connection::open(&path)?;

        // WAL so detached runner processes can append while we read
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.execute_batch(SCHEMA)?;

        // Migration for databases created before the favorite bit existed
        let _ = conn.execute_batch("ALTER TABLE Logs ADD COLUMN IsFavorite INTEGER DEFAULT 0;");

        tracing::info!("Run store opened: {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Append a run entry, returning the assigned id.
    pub async fn insert(&self, entry: &RunEntry) -> Result<i64> {
        let conn = self.conn.clone();
        let entry = entry.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT INTO Logs (JobName, StartTime, EndTime, ExitCode, Status, Prompt,
                    Command, StandardOutput, StandardError, DurationSeconds, AgentName,
                    LogFilePath, IsFavorite)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                rusqlite::params![
                    entry.job_name,
                    entry.start_time.to_rfc3339(),
                    entry.end_time.to_rfc3339(),
                    entry.exit_code,
                    entry.status.as_i64(),
                    entry.prompt,
                    entry.command,
                    entry.stdout,
                    entry.stderr,
                    entry.duration_seconds,
                    entry.agent_name,
                    entry.log_file_path,
                    entry.favorite as i64,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await?
    }

    /// Look up a single entry by id.
    pub async fn by_id(&self, id: i64) -> Result<Option<RunEntry>> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt =
                conn.prepare(&format!("SELECT {COLUMNS} FROM Logs WHERE Id = ?1"))?;
            let result = stmt
                .query_row(rusqlite::params![id], map_row)
                .optional()?;
            Ok(result)
        })
        .await?
    }

    /// Look up a single entry by its legacy log-file path.
    pub async fn by_path(&self, log_file_path: &str) -> Result<Option<RunEntry>> {
        let conn = self.conn.clone();
        let path = log_file_path.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM Logs WHERE LogFilePath = ?1 LIMIT 1"
            ))?;
            let result = stmt
                .query_row(rusqlite::params![path], map_row)
                .optional()?;
            Ok(result)
        })
        .await?
    }

    /// Most recent entries across all jobs. Ordered by start time descending,
    /// id descending as tiebreak, so pagination stays stable when start
    /// timestamps collide.
    pub async fn recent(&self, limit: u32, offset: u32) -> Result<Vec<RunEntry>> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM Logs ORDER BY StartTime DESC, Id DESC LIMIT ?1 OFFSET ?2"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![limit, offset], map_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?
    }

    /// All entries for one job, newest first.
    pub async fn by_job(&self, job_name: &str) -> Result<Vec<RunEntry>> {
        let conn = self.conn.clone();
        let job_name = job_name.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM Logs WHERE JobName = ?1 ORDER BY StartTime DESC, Id DESC"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![job_name], map_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?
    }

    /// Case-insensitive substring search over job name, stdout, and prompt.
    pub async fn search(&self, text: &str, limit: u32) -> Result<Vec<RunEntry>> {
        let conn = self.conn.clone();
        let pattern = format!("%{text}%");
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM Logs
                 WHERE JobName LIKE ?1 OR StandardOutput LIKE ?1 OR Prompt LIKE ?1
                 ORDER BY StartTime DESC, Id DESC LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![pattern, limit], map_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?
    }

    /// Entries with id strictly greater than `after_id`, ascending. This is
    /// the change-detection pipeline's incremental read.
    pub async fn entries_after(&self, after_id: i64) -> Result<Vec<RunEntry>> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM Logs WHERE Id > ?1 ORDER BY Id ASC"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![after_id], map_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?
    }

    /// Largest assigned id, or 0 on an empty store.
    pub async fn max_id(&self) -> Result<i64> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let id: Option<i64> =
                conn.query_row("SELECT MAX(Id) FROM Logs", [], |row| row.get(0))?;
            Ok(id.unwrap_or(0))
        })
        .await?
    }

    /// Toggle the one mutable bit on an entry.
    pub async fn set_favorite(&self, id: i64, favorite: bool) -> Result<()> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "UPDATE Logs SET IsFavorite = ?1 WHERE Id = ?2",
                rusqlite::params![favorite as i64, id],
            )?;
            Ok(())
        })
        .await?
    }

    pub async fn delete_by_id(&self, id: i64) -> Result<()> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute("DELETE FROM Logs WHERE Id = ?1", rusqlite::params![id])?;
            Ok(())
        })
        .await?
    }

    pub async fn delete_by_path(&self, log_file_path: &str) -> Result<()> {
        let conn = self.conn.clone();
        let path = log_file_path.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "DELETE FROM Logs WHERE LogFilePath = ?1",
                rusqlite::params![path],
            )?;
            Ok(())
        })
        .await?
    }

    /// Delete every entry belonging to one job.
    pub async fn clear_job(&self, job_name: &str) -> Result<()> {
        let conn = self.conn.clone();
        let job_name = job_name.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "DELETE FROM Logs WHERE JobName = ?1",
                rusqlite::params![job_name],
            )?;
            Ok(())
        })
        .await?
    }

    pub async fn clear_all(&self) -> Result<()> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute("DELETE FROM Logs", [])?;
            Ok(())
        })
        .await?
    }

    /// Delete entries older than the retention window. Returns rows removed.
    pub async fn purge_older_than(&self, retention_days: u32) -> Result<usize> {
        let conn = self.conn.clone();
        let cutoff = (Local::now() - chrono::Duration::days(retention_days as i64)).to_rfc3339();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let removed = conn.execute(
                "DELETE FROM Logs WHERE StartTime < ?1",
                rusqlite::params![cutoff],
            )?;
            Ok(removed)
        })
        .await?
    }

    pub async fn count_for_job(&self, job_name: &str) -> Result<i64> {
        let conn = self.conn.clone();
        let job_name = job_name.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let count = conn.query_row(
                "SELECT COUNT(*) FROM Logs WHERE JobName = ?1",
                rusqlite::params![job_name],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await?
    }

    pub async fn count_all(&self) -> Result<i64> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let count = conn.query_row("SELECT COUNT(*) FROM Logs", [], |row| row.get(0))?;
            Ok(count)
        })
        .await?
    }
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunEntry> {
    Ok(RunEntry {
        id: row.get(0)?,
        job_name: row.get(1)?,
        start_time: parse_time(row.get::<_, String>(2)?),
        end_time: row
            .get::<_, Option<String>>(3)?
            .map(parse_time)
            .unwrap_or_else(Local::now),
        exit_code: row.get::<_, Option<i32>>(4)?.unwrap_or(-1),
        status: RunStatus::from_i64(row.get::<_, Option<i64>>(5)?.unwrap_or(1)),
        prompt: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        command: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
        stdout: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        stderr: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
        duration_seconds: row.get::<_, Option<f64>>(10)?.unwrap_or(0.0),
        agent_name: row.get::<_, Option<String>>(11)?.unwrap_or_default(),
        log_file_path: row.get::<_, Option<String>>(12)?.unwrap_or_default(),
        favorite: row.get::<_, Option<i64>>(13)?.unwrap_or(0) != 0,
    })
}

fn parse_time(s: String) -> DateTime<Local> {
    s.parse().unwrap_or_else(|_| Local::now())
}

/// Render an entry the way the log viewer shows it.
pub fn format_entry(entry: &RunEntry) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    let _ = writeln!(
        out,
        "=== Job Run Started: {} ===",
        entry.start_time.format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(out, "Job: {}", entry.job_name);
    let _ = writeln!(out, "Prompt: {}", entry.prompt);
    let _ = writeln!(out, "Command: {}", entry.command);
    out.push('\n');
    out.push_str("--- STDOUT ---\n");
    let _ = writeln!(out, "{}", entry.stdout);
    out.push('\n');
    out.push_str("--- STDERR ---\n");
    let _ = writeln!(out, "{}", entry.stderr);
    out.push('\n');
    let _ = writeln!(
        out,
        "=== Job Run Completed: {} ===",
        entry.end_time.format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(out, "Exit Code: {}", entry.exit_code);
    let _ = writeln!(out, "Duration: {:.1}s", entry.duration_seconds);
    let _ = writeln!(out, "Status: {}", entry.status);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(job: &str, prompt: &str) -> RunEntry {
        RunEntry {
            id: 0,
            job_name: job.into(),
            start_time: Local::now(),
            end_time: Local::now(),
            exit_code: 0,
            status: RunStatus::Success,
            prompt: prompt.into(),
            command: "claude -p test".into(),
            stdout: "done".into(),
            stderr: String::new(),
            duration_seconds: 1.5,
            agent_name: "Claude".into(),
            log_file_path: String::new(),
            favorite: false,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let store = LogStore::open_in_memory().unwrap();
        let first = store.insert(&entry("a", "p")).await.unwrap();
        let second = store.insert(&entry("a", "p")).await.unwrap();
        assert!(second > first);
        assert_eq!(store.max_id().await.unwrap(), second);
    }

    #[tokio::test]
    async fn test_max_id_empty_store() {
        let store = LogStore::open_in_memory().unwrap();
        assert_eq!(store.max_id().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_by_job_filters() {
        let store = LogStore::open_in_memory().unwrap();
        for _ in 0..3 {
            store.insert(&entry("A", "p")).await.unwrap();
        }
        for _ in 0..2 {
            store.insert(&entry("B", "p")).await.unwrap();
        }

        let logs = store.by_job("A").await.unwrap();
        assert_eq!(logs.len(), 3);
        assert!(logs.iter().all(|e| e.job_name == "A"));
        assert_eq!(store.count_for_job("B").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_by_job_tiebreaks_on_id() {
        let store = LogStore::open_in_memory().unwrap();
        // Same start timestamp for every row: ordering must fall back to id
        let fixed = Local::now();
        for _ in 0..3 {
            let mut e = entry("A", "p");
            e.start_time = fixed;
            store.insert(&e).await.unwrap();
        }
        let logs = store.by_job("A").await.unwrap();
        assert!(logs[0].id > logs[1].id && logs[1].id > logs[2].id);
    }

    #[tokio::test]
    async fn test_search_matches_prompt_only() {
        let store = LogStore::open_in_memory().unwrap();
        store
            .insert(&entry("job-a", "Searching for needle"))
            .await
            .unwrap();
        store.insert(&entry("job-b", "Just a haystack")).await.unwrap();

        let hits = store.search("needle", 20).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].prompt, "Searching for needle");
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let store = LogStore::open_in_memory().unwrap();
        store.insert(&entry("Nightly-Report", "p")).await.unwrap();
        let hits = store.search("nightly", 20).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_purge_keeps_recent() {
        let store = LogStore::open_in_memory().unwrap();
        let mut old = entry("a", "old");
        old.start_time = Local::now() - chrono::Duration::days(10);
        store.insert(&old).await.unwrap();
        store.insert(&entry("a", "new")).await.unwrap();

        let removed = store.purge_older_than(5).await.unwrap();
        assert_eq!(removed, 1);
        let remaining = store.by_job("a").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].prompt, "new");
    }

    #[tokio::test]
    async fn test_entries_after_ascending() {
        let store = LogStore::open_in_memory().unwrap();
        let mut ids = Vec::new();
        for _ in 0..4 {
            ids.push(store.insert(&entry("a", "p")).await.unwrap());
        }
        let newer = store.entries_after(ids[1]).await.unwrap();
        assert_eq!(newer.len(), 2);
        assert_eq!(newer[0].id, ids[2]);
        assert_eq!(newer[1].id, ids[3]);
    }

    #[tokio::test]
    async fn test_favorite_toggle() {
        let store = LogStore::open_in_memory().unwrap();
        let id = store.insert(&entry("a", "p")).await.unwrap();
        store.set_favorite(id, true).await.unwrap();
        assert!(store.by_id(id).await.unwrap().unwrap().favorite);
        store.set_favorite(id, false).await.unwrap();
        assert!(!store.by_id(id).await.unwrap().unwrap().favorite);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let store = LogStore::open_in_memory().unwrap();
        let id = store.insert(&entry("a", "p")).await.unwrap();
        store.insert(&entry("b", "p")).await.unwrap();

        store.delete_by_id(id).await.unwrap();
        assert!(store.by_id(id).await.unwrap().is_none());

        store.clear_all().await.unwrap();
        assert_eq!(store.count_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_by_path_lookup() {
        let store = LogStore::open_in_memory().unwrap();
        let mut e = entry("a", "p");
        e.log_file_path = "/tmp/a_20260101.log".into();
        store.insert(&e).await.unwrap();

        let found = store.by_path("/tmp/a_20260101.log").await.unwrap();
        assert!(found.is_some());
        assert!(store.by_path("/tmp/missing.log").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wal_database_on_disk_visible_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LogStore::open(dir.path()).unwrap();
        writer.insert(&entry("a", "p")).await.unwrap();

        // A second handle, as the watcher process would open it
        let reader = LogStore::open(dir.path()).unwrap();
        assert_eq!(reader.max_id().await.unwrap(), 1);
    }

    #[test]
    fn test_format_entry_block() {
        let e = entry("report", "summarize");
        let text = format_entry(&e);
        assert!(text.contains("=== Job Run Started:"));
        assert!(text.contains("Job: report"));
        assert!(text.contains("--- STDOUT ---"));
        assert!(text.contains("Status: Success"));
    }
}
