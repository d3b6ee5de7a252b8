use std::path::PathBuf;

use anyhow::{Context, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

/// Everything a detached run needs, decoded from its command line.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub job_name: String,
    pub agent_command: String,
    pub prompt: String,
    pub logs_dir: PathBuf,
}

/// Parse the arguments the scheduler action passes after the job name.
///
/// Two forms are accepted. The flag form (`--command`, `--prompt`, `--logs`)
/// carries plain text; the positional form carries three tokens where the
/// command and prompt are base64 encoded so shell metacharacters survive the
/// scheduler's argument handling.
pub fn parse_run_args(job_name: String, rest: &[String]) -> anyhow::Result<RunRequest> {
    let mut command = String::new();
    let mut prompt = String::new();
    let mut logs_dir = PathBuf::new();

    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--command" if i + 1 < rest.len() => {
                command = rest[i + 1].clone();
                i += 2;
            }
            "--prompt" if i + 1 < rest.len() => {
                prompt = rest[i + 1].clone();
                i += 2;
            }
            "--logs" if i + 1 < rest.len() => {
                logs_dir = PathBuf::from(&rest[i + 1]);
                i += 2;
            }
            _ => i += 1,
        }
    }

    if command.is_empty() && rest.len() >= 3 {
        command = decode_b64(&rest[0]).context("invalid base64 agent command")?;
        prompt = decode_b64(&rest[1]).context("invalid base64 prompt")?;
        logs_dir = PathBuf::from(&rest[2]);
    }

    if command.is_empty() {
        bail!("no agent command provided for job '{job_name}'");
    }

    Ok(RunRequest {
        job_name,
        agent_command: command,
        prompt,
        logs_dir,
    })
}

fn decode_b64(token: &str) -> anyhow::Result<String> {
    let bytes = BASE64.decode(token)?;
    Ok(String::from_utf8(bytes)?)
}
