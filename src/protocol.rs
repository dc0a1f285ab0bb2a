//! Command-hook wire protocol
//!
//! The agent runtime runs a hook executable once per tool call, writes a
//! `HookInput` as JSON to its stdin, and reads a `HookOutput` back from
//! stdout. This module converts between those documents and
//! [`CallEvent`] / [`Verdict`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::core::{GuardError, GuardResult};
use crate::hooks::{CallEvent, Phase, Verdict};

/// Document received on stdin
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookInput {
    /// `PreToolUse` or `PostToolUse`
    pub hook_event_name: String,

    pub tool_name: String,

    #[serde(default)]
    pub tool_input: Value,

    /// Tool result (PostToolUse only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_response: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Working directory of the agent session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
}

impl HookInput {
    /// Phase named by `hook_event_name`
    pub fn phase(&self) -> GuardResult<Phase> {
        match self.hook_event_name.as_str() {
            "PreToolUse" => Ok(Phase::Pre),
            "PostToolUse" => Ok(Phase::Post),
            other => Err(GuardError::UnsupportedEvent(other.to_string())),
        }
    }

    /// Build the call event, sharing `cancel` with the rest of the run
    pub fn into_event(self, cancel: CancellationToken) -> GuardResult<CallEvent> {
        let phase = self.phase()?;
        let event = CallEvent::new(phase, self.tool_name, self.tool_input, cancel);
        Ok(match self.tool_use_id {
            Some(id) => event.with_tool_use_id(id),
            None => event,
        })
    }
}

/// Permission decision for PreToolUse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionDecision {
    Allow,
    Deny,
}

/// Event-specific part of the output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookSpecificOutput {
    pub hook_event_name: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_decision: Option<PermissionDecision>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_decision_reason: Option<String>,

    /// Replacement tool arguments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_input: Option<Value>,

    /// Text shown to the agent on its next turn
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}

impl HookSpecificOutput {
    fn new(phase: Phase) -> Self {
        Self {
            hook_event_name: phase.hook_event_name(),
            permission_decision: None,
            permission_decision_reason: None,
            updated_input: None,
            additional_context: None,
        }
    }
}

/// Document written to stdout
///
/// `Continue` serializes to `{}`, which the runtime reads as "no opinion".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookOutput {
    /// `"block"` for a PostToolUse denial
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<&'static str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_specific_output: Option<HookSpecificOutput>,
}

impl HookOutput {
    /// Render a verdict for the given phase
    pub fn from_verdict(verdict: &Verdict, phase: Phase) -> Self {
        let mut specific = HookSpecificOutput::new(phase);

        match (phase, verdict) {
            (_, Verdict::Continue) => return Self::default(),
            (Phase::Pre, Verdict::Deny { reason }) => {
                specific.permission_decision = Some(PermissionDecision::Deny);
                specific.permission_decision_reason = Some(reason.clone());
            }
            (Phase::Pre, Verdict::Allow { updated_input }) => {
                specific.permission_decision = Some(PermissionDecision::Allow);
                specific.updated_input = updated_input.clone();
            }
            (Phase::Post, Verdict::Deny { reason }) => {
                return Self {
                    decision: Some("block"),
                    reason: Some(reason.clone()),
                    hook_specific_output: None,
                };
            }
            // The tool already ran; there is nothing left to allow
            (Phase::Post, Verdict::Allow { .. }) => return Self::default(),
            (_, Verdict::Annotate { context }) => {
                specific.additional_context = Some(context.clone());
            }
        }

        Self {
            hook_specific_output: Some(specific),
            ..Self::default()
        }
    }

    pub fn to_json(&self) -> GuardResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(verdict: Verdict, phase: Phase) -> Value {
        serde_json::to_value(HookOutput::from_verdict(&verdict, phase)).unwrap()
    }

    #[test]
    fn test_parse_pre_tool_use() {
        let input: HookInput = serde_json::from_value(json!({
            "session_id": "abc",
            "hook_event_name": "PreToolUse",
            "tool_name": "Bash",
            "tool_input": {"command": "ls"},
            "tool_use_id": "toolu_1",
            "cwd": "/project"
        }))
        .unwrap();

        assert_eq!(input.cwd.as_deref(), Some("/project"));
        let event = input.into_event(CancellationToken::new()).unwrap();
        assert_eq!(event.phase(), Phase::Pre);
        assert_eq!(event.tool_use_id(), Some("toolu_1"));
        assert_eq!(event.tool_input(), &json!({"command": "ls"}));
    }

    #[test]
    fn test_unsupported_event() {
        let input = HookInput {
            hook_event_name: "SessionStart".into(),
            ..HookInput::default()
        };
        let err = input.into_event(CancellationToken::new()).unwrap_err();
        assert!(matches!(err, GuardError::UnsupportedEvent(name) if name == "SessionStart"));
    }

    #[test]
    fn test_continue_is_empty_object() {
        assert_eq!(render(Verdict::Continue, Phase::Pre), json!({}));
        assert_eq!(render(Verdict::Continue, Phase::Post), json!({}));
        assert_eq!(render(Verdict::allow(), Phase::Post), json!({}));
    }

    #[test]
    fn test_pre_deny() {
        assert_eq!(
            render(Verdict::deny("Security: nope"), Phase::Pre),
            json!({
                "hookSpecificOutput": {
                    "hookEventName": "PreToolUse",
                    "permissionDecision": "deny",
                    "permissionDecisionReason": "Security: nope"
                }
            })
        );
    }

    #[test]
    fn test_pre_allow_with_input() {
        assert_eq!(
            render(
                Verdict::allow_with_input(json!({"file_path": "/sandbox/a.ts"})),
                Phase::Pre
            ),
            json!({
                "hookSpecificOutput": {
                    "hookEventName": "PreToolUse",
                    "permissionDecision": "allow",
                    "updatedInput": {"file_path": "/sandbox/a.ts"}
                }
            })
        );
    }

    #[test]
    fn test_post_deny_blocks() {
        assert_eq!(
            render(Verdict::deny("type errors"), Phase::Post),
            json!({"decision": "block", "reason": "type errors"})
        );
    }

    #[test]
    fn test_post_annotate() {
        let output = HookOutput::from_verdict(&Verdict::annotate("TS2322"), Phase::Post);
        assert_eq!(
            output.to_json().unwrap(),
            r#"{"hookSpecificOutput":{"hookEventName":"PostToolUse","additionalContext":"TS2322"}}"#
        );
    }
}
