//! Metadata envelope: job identity smuggled through the host task's
//! free-text description field.
//!
//! Versioned header line, then `KEY:VALUE` lines. The prompt (and agent
//! override, when present) are base64-encoded so multi-line prompts survive
//! the single text field. A description that does not start with the header
//! belongs to someone else and is ignored.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;

use jobloop_types::Job;

pub const HEADER_LINE: &str = "jobloop job v1";

/// Decoded job metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub prompt: String,
    pub silent: bool,
    pub agent_override: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

/// Encode a job's metadata into the description blob.
///
/// Header, `SILENT` and `PROMPT` are always present; `AGENT`, `COLOR` and
/// `ICON` only when non-blank.
pub fn encode(job: &Job) -> String {
    let prompt_b64 = B64.encode(job.prompt.as_bytes());
    let mut out = format!("{HEADER_LINE}\nSILENT:{}\nPROMPT:{prompt_b64}", job.silent);

    if let Some(agent) = job.agent_override.as_deref().filter(|s| !s.trim().is_empty()) {
        let agent_b64 = B64.encode(agent.as_bytes());
        out.push_str(&format!("\nAGENT:{agent_b64}"));
    }
    if let Some(color) = job.color.as_deref().filter(|s| !s.trim().is_empty()) {
        out.push_str(&format!("\nCOLOR:{color}"));
    }
    if let Some(icon) = job.icon.as_deref().filter(|s| !s.trim().is_empty()) {
        out.push_str(&format!("\nICON:{icon}"));
    }
    out
}

/// Decode a description blob. Returns None for anything that is not one of
/// ours: wrong header, fewer than three lines, or a prompt that does not
/// base64-decode to non-empty UTF-8. A malformed agent override is dropped
/// without invalidating the envelope.
pub fn decode(description: &str) -> Option<Envelope> {
    if description.trim().is_empty() {
        return None;
    }

    let lines: Vec<&str> = description.split('\n').map(str::trim).collect();
    if lines.len() < 3 || lines[0] != HEADER_LINE {
        return None;
    }

    let mut silent = false;
    let mut prompt = String::new();
    let mut agent_override = None;
    let mut color = None;
    let mut icon = None;

    for line in &lines[1..] {
        if let Some(value) = strip_key(line, "SILENT:") {
            silent = value.trim().eq_ignore_ascii_case("true");
        } else if let Some(value) = strip_key(line, "PROMPT:") {
            match decode_b64(value.trim()) {
                Some(p) => prompt = p,
                None => return None,
            }
        } else if let Some(value) = strip_key(line, "AGENT:") {
            // Malformed override is ignored, not fatal
            agent_override = decode_b64(value.trim());
        } else if let Some(value) = strip_key(line, "COLOR:") {
            color = Some(value.trim().to_string());
        } else if let Some(value) = strip_key(line, "ICON:") {
            icon = Some(value.trim().to_string());
        }
    }

    if prompt.is_empty() {
        return None;
    }

    Some(Envelope {
        prompt,
        silent,
        agent_override,
        color,
        icon,
    })
}

/// Cheap ownership check: does this description carry our header?
pub fn is_ours(description: &str) -> bool {
    description.trim_start().starts_with(HEADER_LINE)
}

fn strip_key<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    // get() keeps a multibyte character straddling the key boundary from
    // slicing mid-char
    let prefix = line.get(..key.len())?;
    if prefix.eq_ignore_ascii_case(key) {
        line.get(key.len()..)
    } else {
        None
    }
}

fn decode_b64(value: &str) -> Option<String> {
    let bytes = B64.decode(value).ok()?;
    String::from_utf8(bytes).ok()
}
