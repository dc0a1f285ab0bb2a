//! Env protection
//!
//! PreToolUse handler that keeps `.env*` files from being read back into
//! the conversation.

use async_trait::async_trait;

use crate::core::{paths, GuardResult};
use crate::hooks::{CallEvent, Handler, Phase, ToolCall, Verdict};

/// Denies any Read of a file whose name starts with `.env`
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvProtectionHook;

#[async_trait]
impl Handler for EnvProtectionHook {
    fn name(&self) -> &str {
        "env-protection"
    }

    async fn evaluate(&self, event: &CallEvent) -> GuardResult<Verdict> {
        if event.is_cancelled() || event.phase() != Phase::Pre {
            return Ok(Verdict::Continue);
        }

        let ToolCall::Read { file_path } = event.call() else {
            return Ok(Verdict::Continue);
        };

        match paths::base_name(file_path) {
            Some(name) if name.starts_with(".env") => Ok(Verdict::deny(
                "Reading .env files is not allowed: they may contain secrets",
            )),
            _ => Ok(Verdict::Continue),
        }
    }
}
