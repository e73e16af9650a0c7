//! Fail-closed validation pipeline for candidate commands.
//!
//! Validation only ever inspects `command`; `args` are passed as a discrete
//! argv vector and are never interpolated into a shell string, so there is
//! nothing in `args` for a shell metacharacter to do. Preserving that
//! asymmetry is deliberate (see spec §4.4) — scanning `args` too would be
//! both unnecessary and would reject legitimate arguments like `"a;b"` as a
//! literal string.

use std::path::Path;

/// Substrings that always reject, regardless of `whitelist`/`allowed_paths`.
/// Fixed by design, not configurable.
pub const BLACKLIST_PATTERNS: &[&str] = &[
    "rm -rf",
    "mkfs",
    "dd ",
    "fdisk",
    "parted",
    "shutdown",
    "reboot",
    "halt",
    "poweroff",
    ":(){:|:&};:",
];

/// Single characters/substrings that indicate shell metacharacter injection.
/// Fixed by design, not configurable.
pub const INJECTION_PATTERNS: &[&str] = &[";", "|", "&", "$(", "`", "\n", "\r", "\t"];

#[derive(Debug, Clone)]
pub enum Whitelist {
    /// Development-only sentinel: every command passes the whitelist check.
    AllowAll,
    Entries(Vec<String>),
}

impl Whitelist {
    fn permits(&self, command: &str) -> bool {
        match self {
            Whitelist::AllowAll => true,
            Whitelist::Entries(entries) => entries.iter().any(|entry| {
                command == entry || command.starts_with(&format!("{entry} "))
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub whitelist: Whitelist,
    pub allowed_paths: Vec<String>,
}

/// Runs the four-step validation pipeline from spec §4.4 in order, failing
/// closed on the first violation. Returns the human-readable rejection
/// reason to embed in `CommandResponse.error`.
pub fn validate_command(command: &str, config: &ValidationConfig) -> Result<(), String> {
    if let Some(pattern) = BLACKLIST_PATTERNS.iter().find(|p| command.contains(*p)) {
        return Err(format!("dangerous pattern detected: {pattern:?}"));
    }

    if let Some(pattern) = INJECTION_PATTERNS.iter().find(|p| command.contains(*p)) {
        return Err(format!("injection pattern detected: {pattern:?}"));
    }

    if let Some(parent) = Path::new(command).parent().filter(|_| command.starts_with('/')) {
        let parent = parent.to_string_lossy();
        let allowed = config
            .allowed_paths
            .iter()
            .any(|prefix| parent.starts_with(prefix.as_str()));
        if !allowed {
            return Err(format!("{parent} is not an allowed path"));
        }
    }

    if !config.whitelist.permits(command) {
        return Err(format!("{command} is not in the command whitelist"));
    }

    Ok(())
}

/// Environment entries must not contain CR/LF; see spec §4.4 "Environment
/// validation". Rejection is part of the same "never reached the OS
/// process-creation primitive" family as the four-step pipeline above, but
/// is checked later in the pipeline (after rate limiting and concurrency
/// acquisition) per spec's component ordering.
pub fn validate_env(env: &std::collections::HashMap<String, String>) -> Result<(), String> {
    for (k, v) in env {
        if k.contains('\r') || k.contains('\n') || v.contains('\r') || v.contains('\n') {
            return Err(format!("environment entry {k:?} contains CR or LF"));
        }
    }
    Ok(())
}
