//! Hook Types
//!
//! Core types for the hooks system:
//! - `Phase` - Whether the tool call is about to run or has run
//! - `ToolCall` - Typed view over the arguments of known tools
//! - `CallEvent` - Immutable description of one tool call
//! - `Verdict` - Decision returned by handlers and by the pipeline

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::core::paths;

/// When a call event is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Before the tool executes - can block, allow, or rewrite input
    Pre,
    /// After the tool executed - advisory only
    Post,
}

impl Phase {
    /// Hook event name used on the wire
    pub fn hook_event_name(&self) -> &'static str {
        match self {
            Phase::Pre => "PreToolUse",
            Phase::Post => "PostToolUse",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.hook_event_name())
    }
}

/// Typed view over the arguments of the tools policies know about
///
/// Anything else (unknown tools, or known tools with malformed arguments)
/// is `Other`; handlers treat it as "no opinion".
///
/// Only Write, Edit and Read expose a path. A `file_path` argument on any
/// other tool (`MultiEdit`, `NotebookEdit`, ...) is not read, so extension
/// and path-glob matchers never fire for those tools. Inspect
/// [`CallEvent::tool_input`] directly to handle them.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    /// Shell command
    Bash {
        /// Command line as given to the shell
        command: String,
    },
    /// Whole-file write
    Write {
        /// Target file
        file_path: PathBuf,
    },
    /// In-place edit
    Edit {
        /// Target file
        file_path: PathBuf,
    },
    /// File read
    Read {
        /// File being read
        file_path: PathBuf,
    },
    /// Unknown tool or argument shape
    Other,
}

#[derive(Deserialize)]
struct CommandInput {
    command: String,
}

#[derive(Deserialize)]
struct FileInput {
    file_path: PathBuf,
}

impl ToolCall {
    /// Parse the arguments of `tool_name`
    pub fn parse(tool_name: &str, input: &Value) -> Self {
        let file_path = || FileInput::deserialize(input).ok().map(|i| i.file_path);

        let parsed = match tool_name {
            "Bash" => CommandInput::deserialize(input)
                .ok()
                .map(|i| ToolCall::Bash { command: i.command }),
            "Write" => file_path().map(|file_path| ToolCall::Write { file_path }),
            "Edit" => file_path().map(|file_path| ToolCall::Edit { file_path }),
            "Read" => file_path().map(|file_path| ToolCall::Read { file_path }),
            _ => None,
        };

        parsed.unwrap_or(ToolCall::Other)
    }

    /// Path argument, for the tools that carry one
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            ToolCall::Write { file_path }
            | ToolCall::Edit { file_path }
            | ToolCall::Read { file_path } => Some(file_path),
            ToolCall::Bash { .. } | ToolCall::Other => None,
        }
    }

    /// Whether this call modifies a file (Write or Edit)
    pub fn is_file_write(&self) -> bool {
        matches!(self, ToolCall::Write { .. } | ToolCall::Edit { .. })
    }
}

/// One proposed (Pre) or completed (Post) tool invocation
///
/// Immutable once built. Handlers that want different arguments return
/// [`Verdict::Allow`] with a fresh copy (see [`CallEvent::input_with`]).
#[derive(Debug, Clone)]
pub struct CallEvent {
    phase: Phase,
    tool_name: String,
    tool_input: Value,
    call: ToolCall,
    tool_use_id: Option<String>,
    cancel: CancellationToken,
}

impl CallEvent {
    /// Create an event; the token is the one shared by the whole agent run
    pub fn new(
        phase: Phase,
        tool_name: impl Into<String>,
        tool_input: Value,
        cancel: CancellationToken,
    ) -> Self {
        let tool_name = tool_name.into();
        let call = ToolCall::parse(&tool_name, &tool_input);
        Self {
            phase,
            tool_name,
            tool_input,
            call,
            tool_use_id: None,
            cancel,
        }
    }

    /// Create event for a PreToolUse evaluation
    pub fn pre_tool_use(
        tool_name: impl Into<String>,
        tool_input: Value,
        cancel: CancellationToken,
    ) -> Self {
        Self::new(Phase::Pre, tool_name, tool_input, cancel)
    }

    /// Create event for a PostToolUse evaluation
    pub fn post_tool_use(
        tool_name: impl Into<String>,
        tool_input: Value,
        cancel: CancellationToken,
    ) -> Self {
        Self::new(Phase::Post, tool_name, tool_input, cancel)
    }

    /// Attach the runtime's tool use ID
    pub fn with_tool_use_id(mut self, id: impl Into<String>) -> Self {
        self.tool_use_id = Some(id.into());
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Raw arguments as received
    pub fn tool_input(&self) -> &Value {
        &self.tool_input
    }

    pub fn call(&self) -> &ToolCall {
        &self.call
    }

    pub fn tool_use_id(&self) -> Option<&str> {
        self.tool_use_id.as_deref()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether the agent run has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Path argument, if this tool carries one
    pub fn file_path(&self) -> Option<&Path> {
        self.call.file_path()
    }

    /// Lowercase extension (with dot) of the path argument
    pub fn extension(&self) -> Option<String> {
        self.file_path().and_then(paths::extension)
    }

    /// Copy of the arguments with `key` replaced
    ///
    /// The original arguments are left untouched; the copy is meant for
    /// `Verdict::allow_with_input`.
    pub fn input_with(&self, key: &str, value: impl Into<Value>) -> Value {
        let mut map = match &self.tool_input {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        map.insert(key.to_string(), value.into());
        Value::Object(map)
    }
}

/// Decision for one call event
///
/// Exactly one case is active. `Continue` is the neutral value: it means the
/// same as not having matched at all.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Verdict {
    /// No opinion - the call proceeds unchanged
    #[default]
    Continue,
    /// Proceed; `updated_input` replaces the arguments wholesale when present
    Allow {
        /// Replacement arguments
        updated_input: Option<Value>,
    },
    /// Refuse the call (Pre) or report it negatively (Post)
    Deny {
        /// Human-readable, actionable reason
        reason: String,
    },
    /// Non-blocking text for the agent's next turn
    Annotate {
        /// Text to surface
        context: String,
    },
}

impl Verdict {
    /// Allow unchanged
    pub fn allow() -> Self {
        Verdict::Allow {
            updated_input: None,
        }
    }

    /// Allow with replacement arguments
    pub fn allow_with_input(updated_input: Value) -> Self {
        Verdict::Allow {
            updated_input: Some(updated_input),
        }
    }

    /// Deny with a reason
    pub fn deny(reason: impl Into<String>) -> Self {
        Verdict::Deny {
            reason: reason.into(),
        }
    }

    /// Attach context for the agent
    pub fn annotate(context: impl Into<String>) -> Self {
        Verdict::Annotate {
            context: context.into(),
        }
    }

    pub fn is_continue(&self) -> bool {
        matches!(self, Verdict::Continue)
    }

    pub fn is_deny(&self) -> bool {
        matches!(self, Verdict::Deny { .. })
    }

    /// Deny reason, if this is a denial
    pub fn reason(&self) -> Option<&str> {
        match self {
            Verdict::Deny { reason } => Some(reason),
            _ => None,
        }
    }

    /// Replacement arguments, if any
    pub fn updated_input(&self) -> Option<&Value> {
        match self {
            Verdict::Allow { updated_input } => updated_input.as_ref(),
            _ => None,
        }
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Verdict::Continue => "continue",
            Verdict::Allow { .. } => "allow",
            Verdict::Deny { .. } => "deny",
            Verdict::Annotate { .. } => "annotate",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_known_tools() {
        assert_eq!(
            ToolCall::parse("Bash", &json!({"command": "ls -la"})),
            ToolCall::Bash {
                command: "ls -la".into()
            }
        );
        assert_eq!(
            ToolCall::parse("Edit", &json!({"file_path": "/p/a.rs", "old_string": "x"})),
            ToolCall::Edit {
                file_path: PathBuf::from("/p/a.rs")
            }
        );
    }

    #[test]
    fn test_parse_unknown_or_malformed_is_other() {
        assert_eq!(ToolCall::parse("Grep", &json!({"pattern": "x"})), ToolCall::Other);
        assert_eq!(ToolCall::parse("Write", &json!({"content": "x"})), ToolCall::Other);
        assert_eq!(ToolCall::parse("Bash", &json!({"command": 42})), ToolCall::Other);
        assert_eq!(ToolCall::parse("Read", &Value::Null), ToolCall::Other);
    }

    #[test]
    fn test_path_only_for_known_file_tools() {
        let event = CallEvent::post_tool_use(
            "MultiEdit",
            json!({"file_path": "/p/a.ts", "edits": []}),
            CancellationToken::new(),
        );
        assert_eq!(event.call(), &ToolCall::Other);
        assert!(event.file_path().is_none());
        assert_eq!(event.tool_input()["file_path"], "/p/a.ts");
    }

    #[test]
    fn test_bash_has_no_path() {
        let event = CallEvent::pre_tool_use(
            "Bash",
            json!({"command": "cat notes.md"}),
            CancellationToken::new(),
        );
        assert!(event.file_path().is_none());
        assert!(event.extension().is_none());
    }

    #[test]
    fn test_event_extension() {
        let event = CallEvent::pre_tool_use(
            "Write",
            json!({"file_path": "/project/src/App.TSX", "content": ""}),
            CancellationToken::new(),
        );
        assert_eq!(event.extension().as_deref(), Some(".tsx"));
    }

    #[test]
    fn test_input_with_copies_arguments() {
        let event = CallEvent::pre_tool_use(
            "Write",
            json!({"file_path": "/a.ts", "content": "hello"}),
            CancellationToken::new(),
        );
        let updated = event.input_with("file_path", "/sandbox/a.ts");

        assert_eq!(updated["file_path"], "/sandbox/a.ts");
        assert_eq!(updated["content"], "hello");
        assert_eq!(event.tool_input()["file_path"], "/a.ts");
    }

    #[test]
    fn test_cancellation_is_observed_live() {
        let token = CancellationToken::new();
        let event = CallEvent::pre_tool_use("Read", json!({}), token.clone());
        assert!(!event.is_cancelled());
        token.cancel();
        assert!(event.is_cancelled());
    }

    #[test]
    fn test_verdict_accessors() {
        assert!(Verdict::default().is_continue());
        assert_eq!(Verdict::deny("nope").reason(), Some("nope"));
        assert_eq!(
            Verdict::allow_with_input(json!({"command": "ls"})).updated_input(),
            Some(&json!({"command": "ls"}))
        );
        assert!(Verdict::allow().updated_input().is_none());
        assert_eq!(Verdict::annotate("ctx").kind(), "annotate");
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Pre.to_string(), "PreToolUse");
        assert_eq!(Phase::Post.to_string(), "PostToolUse");
    }
}
