//! Known command-line agents and display-name resolution.

/// A predefined agent choice: display name plus its command template.
#[derive(Debug, Clone, Copy)]
pub struct AgentOption {
    pub name: &'static str,
    /// Command template; `{prompt}` is replaced with the resolved prompt.
    pub command: &'static str,
}

pub const PREDEFINED_AGENTS: &[AgentOption] = &[
    AgentOption {
        name: "Claude",
        command: "claude -p \"{prompt}\" --dangerously-skip-permissions",
    },
    AgentOption {
        name: "Codex",
        command: "codex exec \"{prompt}\" --yolo",
    },
    AgentOption {
        name: "Gemini CLI",
        command: "gemini -p \"{prompt}\" --approval-mode=yolo",
    },
    AgentOption {
        name: "OpenCode",
        command: "opencode run \"{prompt}\"",
    },
    AgentOption {
        name: "Qwen Code",
        command: "qwen -p \"{prompt}\" --approval-mode yolo",
    },
];

/// Resolve a display name for the agent behind a command line.
///
/// Matches the executable (first token) against the predefined agents; falls
/// back to the capitalized executable stem for custom commands.
pub fn agent_name_from_command(command: &str) -> String {
    let trimmed = command.trim();
    if trimmed.is_empty() {
        return "Unknown".to_string();
    }

    // A quoted head is a single token even when the path contains spaces
    let first = if let Some(rest) = trimmed.strip_prefix('"') {
        rest.split('"').next().unwrap_or(rest)
    } else {
        trimmed.split_whitespace().next().unwrap_or(trimmed)
    };
    let exe = first.to_lowercase();
    let stem = std::path::Path::new(first)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();

    for agent in PREDEFINED_AGENTS {
        let agent_exe = agent
            .command
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_lowercase();
        if exe == agent_exe || stem == agent_exe {
            return agent.name.to_string();
        }
    }

    if stem.is_empty() {
        return "Custom".to_string();
    }

    let mut chars = stem.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => "Custom".to_string(),
    }
}
