//! Bash input rewriting
//!
//! PreToolUse handlers that return `Allow` with a new `command` instead of
//! blocking: one strips dangerous flags, one prefixes environment variables.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::core::GuardResult;
use crate::hooks::{CallEvent, Handler, Phase, ToolCall, Verdict};

/// Fragments removed from Bash commands, in order
pub const DANGEROUS_FLAGS: &[&str] = &["--no-preserve-root", "--force", "-rf /", "-rf ~"];

fn bash_command(event: &CallEvent) -> Option<&str> {
    if event.is_cancelled() || event.phase() != Phase::Pre {
        return None;
    }
    match event.call() {
        ToolCall::Bash { command } => Some(command),
        _ => None,
    }
}

/// Removes [`DANGEROUS_FLAGS`] from Bash commands
#[derive(Debug, Clone, Copy, Default)]
pub struct StripDangerousFlagsHook;

impl StripDangerousFlagsHook {
    /// Command with every dangerous fragment removed, if any was present
    pub fn strip(command: &str) -> Option<String> {
        let mut stripped = command.to_string();
        let mut modified = false;

        for flag in DANGEROUS_FLAGS {
            if stripped.contains(flag) {
                stripped = stripped.replace(flag, "");
                modified = true;
            }
        }

        modified.then(|| stripped.trim().to_string())
    }
}

#[async_trait]
impl Handler for StripDangerousFlagsHook {
    fn name(&self) -> &str {
        "strip-dangerous-flags"
    }

    async fn evaluate(&self, event: &CallEvent) -> GuardResult<Verdict> {
        let Some(stripped) = bash_command(event).and_then(Self::strip) else {
            return Ok(Verdict::Continue);
        };

        tracing::info!("[Rewrite] Stripped dangerous flags: {}", stripped);
        Ok(Verdict::allow_with_input(event.input_with("command", stripped)))
    }
}

/// Prefixes Bash commands with `KEY="value"` assignments
///
/// The prefix is built once at construction; keys are sorted so the same
/// command always produces the same rewrite.
#[derive(Debug, Clone)]
pub struct EnvInjectorHook {
    prefix: String,
}

impl EnvInjectorHook {
    pub fn new(vars: BTreeMap<String, String>) -> Self {
        let prefix = vars
            .iter()
            .map(|(key, value)| format!("{}=\"{}\"", key, value.replace('"', "\\\"")))
            .collect::<Vec<_>>()
            .join(" ");
        Self { prefix }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

#[async_trait]
impl Handler for EnvInjectorHook {
    fn name(&self) -> &str {
        "env-injector"
    }

    async fn evaluate(&self, event: &CallEvent) -> GuardResult<Verdict> {
        let command = match bash_command(event) {
            Some(command) if !command.trim().is_empty() && !self.prefix.is_empty() => command,
            _ => return Ok(Verdict::Continue),
        };

        Ok(Verdict::allow_with_input(
            event.input_with("command", format!("{} {}", self.prefix, command)),
        ))
    }
}
