//! Hooks Module
//!
//! Intercept tool calls before and after they execute.
//!
//! # Overview
//!
//! Handlers let you:
//! - Block dangerous operations before they execute
//! - Rewrite tool arguments (e.g., redirect writes into a sandbox)
//! - Attach context for the agent's next turn (e.g., type-check errors)
//!
//! **Important:** ALL matching handlers run to completion, concurrently, and
//! their verdicts are reduced only after the last one finishes. Security
//! handlers can't be bypassed by a faster convenience handler.
//!
//! # Example
//!
//! ```
//! use agent_guard::hooks::{CallEvent, HookRegistry, Phase, Pipeline, ToolCall, Verdict};
//! use serde_json::json;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> agent_guard::core::GuardResult<()> {
//! let mut hooks = HookRegistry::new();
//!
//! // Block dangerous commands
//! hooks.add_with_pattern(Phase::Pre, "Bash", |event: &CallEvent| match event.call() {
//!     ToolCall::Bash { command } if command.contains("rm -rf") => {
//!         Verdict::deny("Dangerous command blocked")
//!     }
//!     _ => Verdict::Continue,
//! })?;
//!
//! let pipeline = Pipeline::new(hooks);
//! let cancel = CancellationToken::new();
//! let event = CallEvent::pre_tool_use("Bash", json!({"command": "rm -rf build"}), cancel);
//!
//! assert!(pipeline.evaluate(&event).await.is_deny());
//! # Ok(())
//! # }
//! ```
//!
//! # Verdicts
//!
//! | Verdict | Effect |
//! |---------|--------|
//! | `Verdict::Continue` | No opinion, call proceeds unchanged |
//! | `Verdict::allow()` | Proceed |
//! | `Verdict::allow_with_input(v)` | Proceed with `v` replacing the arguments |
//! | `Verdict::deny("reason")` | Block the call, reason goes back to the agent |
//! | `Verdict::annotate("text")` | Proceed, text is shown to the agent |
//!
//! # Result Combination
//!
//! Priority: **Deny > Allow > Annotate > Continue**. Within a class the
//! earliest-registered handler wins; reasons, inputs and contexts are never
//! merged.

mod compose;
mod pipeline;
mod registry;
mod types;

pub use compose::{evaluate_all, reduce, run_all};
pub use pipeline::Pipeline;
pub use registry::{ArcHandler, Handler, HandlerTable, HookMatcher, HookRegistration, HookRegistry};
pub use types::{CallEvent, Phase, ToolCall, Verdict};
