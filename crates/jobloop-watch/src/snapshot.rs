//! Plain-text result snapshots, one file per reported run.

use std::fs;
use std::path::{Path, PathBuf};

use jobloop_types::{RunEntry, RunStatus};

/// Write a run's output under `<results_dir>/<job>/<timestamp>_<status>.txt`.
/// Returns the file written; callers treat failure as non-fatal.
pub fn write_snapshot(results_dir: &Path, entry: &RunEntry) -> std::io::Result<PathBuf> {
    let dir = results_dir.join(sanitize_dir_name(&entry.job_name));
    fs::create_dir_all(&dir)?;

    let status = if entry.status == RunStatus::Success {
        "SUCCESS"
    } else {
        "FAILED"
    };
    let file_name = format!("{}_{}.txt", entry.start_time.format("%Y%m%d_%H%M%S"), status);

    let mut body = entry.stdout.trim().to_string();
    if entry.status != RunStatus::Success && !entry.stderr.trim().is_empty() {
        if !body.is_empty() {
            body.push_str("\n\n");
        }
        body.push_str("--- ERROR ---\n");
        body.push_str(entry.stderr.trim());
    }
    if body.is_empty() {
        body.push_str("*No output captured.*");
    }

    let path = dir.join(file_name);
    fs::write(&path, body)?;
    Ok(path)
}

fn sanitize_dir_name(name: &str) -> String {
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
