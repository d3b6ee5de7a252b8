//! jobloop-types: core data model shared by every jobloop crate.
//!
//! Jobs, recurrence schedules, and run-history entries. Pure data plus
//! validation; no I/O lives here.

pub mod agent;
pub mod schedule;

pub use agent::{AgentOption, PREDEFINED_AGENTS, agent_name_from_command};
pub use schedule::{LAST_DAY, Restriction, Schedule, Weekday};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// A scheduled agent-prompt job.
///
/// Identity is the name, unique case-insensitively within the task directory.
/// `last_run`/`next_run`/`is_running` are reported by the scheduler backend
/// and are read-only from the registry's point of view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    /// Prompt template; `{date}`, `{time}` and `{datetime}` are substituted
    /// at run time, `{prompt}` threads it into the agent command.
    pub prompt: String,
    pub schedule: Schedule,
    /// Suppress notifications for this job.
    #[serde(default)]
    pub silent: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Per-job agent command override; the global command is used when None.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_override: Option<String>,
    /// Display color (hex) for notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Display icon for notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Local>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Local>>,
    #[serde(default)]
    pub is_running: bool,
}

fn default_true() -> bool {
    true
}

impl Job {
    /// A job with the given name and prompt, daily 09:00 schedule, enabled.
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
            schedule: Schedule::default(),
            silent: false,
            enabled: true,
            agent_override: None,
            color: None,
            icon: None,
            last_run: None,
            next_run: None,
            is_running: false,
        }
    }
}

/// Outcome classification of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failure,
    /// The run was cancelled before the agent finished. Distinct from
    /// `Failure`: the agent did not report an exit of its own.
    Cancelled,
}

impl RunStatus {
    /// Derive from an exit code: zero is success.
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            RunStatus::Success
        } else {
            RunStatus::Failure
        }
    }

    /// Integer form stored in the Logs table.
    pub fn as_i64(self) -> i64 {
        match self {
            RunStatus::Success => 0,
            RunStatus::Failure => 1,
            RunStatus::Cancelled => 2,
        }
    }

    pub fn from_i64(v: i64) -> Self {
        match v {
            0 => RunStatus::Success,
            2 => RunStatus::Cancelled,
            _ => RunStatus::Failure,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Success => "Success",
            RunStatus::Failure => "Failure",
            RunStatus::Cancelled => "Cancelled",
        };
        f.write_str(s)
    }
}

/// One immutable record of a single job execution.
///
/// Rows reference jobs by name only; an entry whose job no longer exists is
/// valid, just unnotifiable. The auto-assigned id is the only safe cursor for
/// incremental consumption (start times can tie at clock resolution).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEntry {
    /// Assigned by the store on insert; 0 before insertion.
    #[serde(default)]
    pub id: i64,
    pub job_name: String,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    pub exit_code: i32,
    pub status: RunStatus,
    pub prompt: String,
    /// The fully resolved command line that was executed.
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub duration_seconds: f64,
    /// Display name of the agent that ran, derived from the command.
    pub agent_name: String,
    /// Legacy per-run file path reference; kept for lookups, may be empty.
    #[serde(default)]
    pub log_file_path: String,
    /// The only mutable bit after insertion.
    #[serde(default)]
    pub favorite: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_exit_code() {
        assert_eq!(RunStatus::from_exit_code(0), RunStatus::Success);
        assert_eq!(RunStatus::from_exit_code(1), RunStatus::Failure);
        assert_eq!(RunStatus::from_exit_code(-1), RunStatus::Failure);
    }

    #[test]
    fn test_status_i64_round_trip() {
        for status in [
            RunStatus::Success,
            RunStatus::Failure,
            RunStatus::Cancelled,
        ] {
            assert_eq!(RunStatus::from_i64(status.as_i64()), status);
        }
    }

    #[test]
    fn test_job_serde_defaults() {
        let json = r#"{"name":"daily-report","prompt":"Summarize {date}","schedule":{"type":"daily","run_time":"09:00:00"}}"#;
        let job: Job = serde_json::from_str(json).unwrap();
        assert!(job.enabled);
        assert!(!job.silent);
        assert!(job.agent_override.is_none());
        assert!(!job.is_running);
    }

    #[test]
    fn test_job_serde_round_trip() {
        let mut job = Job::new("nightly", "Check the backlog");
        job.silent = true;
        job.color = Some("#FF8800".into());
        let json = serde_json::to_string(&job).unwrap();
        let parsed: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.name, "nightly");
        assert!(parsed.silent);
        assert_eq!(parsed.color.as_deref(), Some("#FF8800"));
    }
}
