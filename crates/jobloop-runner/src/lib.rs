//! jobloop-runner: the detached job execution process.
//!
//! The host scheduler fires our own executable with the job's identity and
//! agent command; this crate decodes those arguments, runs the agent, and
//! writes exactly one run entry to the store before the process exits. The
//! runner and the interactive session never share in-process state — they
//! rendezvous only through the store.

pub mod args;
pub mod exec;

pub use args::{RunRequest, parse_run_args};
pub use exec::{ExecOutcome, RUN_TIMEOUT, TIMEOUT_MESSAGE, execute_command};

use chrono::{DateTime, Local};
use tokio_util::sync::CancellationToken;

use jobloop_store::LogStore;
use jobloop_types::{RunEntry, RunStatus, agent_name_from_command};

/// Resolve `{date}`, `{time}` and `{datetime}` placeholders in a prompt.
pub fn substitute_placeholders(prompt: &str, now: DateTime<Local>) -> String {
    prompt
        .replace("{date}", &now.format("%Y-%m-%d").to_string())
        .replace("{time}", &now.format("%H:%M:%S").to_string())
        .replace("{datetime}", &now.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Execute one job run end to end and record it.
///
/// Cancellation through the token is recorded as [`RunStatus::Cancelled`],
/// distinct from a failing agent. Returns the stored entry; the caller exits
/// with its exit code.
pub async fn run_job(req: &RunRequest, cancel: CancellationToken) -> anyhow::Result<RunEntry> {
    let start = Local::now();
    std::fs::create_dir_all(&req.logs_dir)?;

    let processed_prompt = substitute_placeholders(&req.prompt, start);
    let command = req.agent_command.replace("{prompt}", &processed_prompt);

    tracing::info!(job = %req.job_name, "Running scheduled job");
    let outcome = execute_command(&command, RUN_TIMEOUT, cancel).await;
    let end = Local::now();

    let status = if outcome.cancelled {
        RunStatus::Cancelled
    } else {
        RunStatus::from_exit_code(outcome.exit_code)
    };

    // Legacy per-run file reference; the database is the source of truth
    let log_file = req
        .logs_dir
        .join(format!(
            "{}_{}.log",
            sanitize_file_name(&req.job_name),
            start.format("%Y%m%d_%H%M%S")
        ))
        .to_string_lossy()
        .into_owned();

    let mut entry = RunEntry {
        id: 0,
        job_name: req.job_name.clone(),
        start_time: start,
        end_time: end,
        exit_code: outcome.exit_code,
        status,
        prompt: req.prompt.clone(),
        command: command.clone(),
        stdout: outcome.stdout,
        stderr: outcome.stderr,
        duration_seconds: (end - start).num_milliseconds() as f64 / 1000.0,
        agent_name: agent_name_from_command(&command),
        log_file_path: log_file,
        favorite: false,
    };

    let store = LogStore::open(&req.logs_dir)?;
    entry.id = store.insert(&entry).await?;
    tracing::info!(
        job = %req.job_name,
        id = entry.id,
        exit_code = entry.exit_code,
        "Run recorded"
    );
    Ok(entry)
}

/// Smoke-test an agent command with the prompt "Hello".
///
/// A zero exit code is not trusted blindly: agent CLIs routinely print
/// auth errors and still exit 0, so the combined output is sniffed for
/// common failure markers.
pub async fn validate_command(agent_command: &str) -> (bool, String, String) {
    const VALIDATION_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

    let test_command = agent_command.replace("{prompt}", "Hello");
    let outcome =
        execute_command(&test_command, VALIDATION_TIMEOUT, CancellationToken::new()).await;

    if outcome.timed_out {
        return (
            false,
            String::new(),
            "Validation timed out after 30 seconds.".to_string(),
        );
    }

    let mut success = outcome.exit_code == 0;
    if success {
        let combined = format!("{} {}", outcome.stdout, outcome.stderr).to_lowercase();
        let indicators = [
            "error:",
            "failed:",
            "authentication failed",
            "api key not found",
            "command not found",
        ];
        if indicators.iter().any(|needle| combined.contains(needle)) {
            success = false;
        }
    }

    (success, outcome.stdout, outcome.stderr)
}

fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
