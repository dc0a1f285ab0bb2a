//! Dispatch aggregator
//!
//! A single catch-all handler that routes to its own sub-handlers by file
//! extension and by tool name, and reduces their verdicts with the same rules
//! as the pipeline. Registering one `DispatchHook` keeps the outer table short
//! when many checks hang off file types.

use async_trait::async_trait;

use crate::core::GuardResult;
use crate::hooks::{self, CallEvent, Handler, HandlerTable, HookMatcher, Verdict};

/// Routes events to file-type handlers first, then to tool handlers
#[derive(Debug, Clone, Default)]
pub struct DispatchHook {
    file_types: HandlerTable,
    tools: HandlerTable,
}

impl DispatchHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route events whose path argument has one of `extensions`
    pub fn on_extensions<I, S, H>(mut self, extensions: I, handler: H) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        H: Handler + 'static,
    {
        self.file_types
            .add(HookMatcher::extensions(extensions), handler);
        self
    }

    /// Route events whose tool name matches `pattern` (same syntax as
    /// [`HookMatcher::tool`])
    pub fn on_tool<H: Handler + 'static>(mut self, pattern: &str, handler: H) -> GuardResult<Self> {
        self.tools.add(HookMatcher::tool(pattern)?, handler);
        Ok(self)
    }

    pub fn handler_count(&self) -> usize {
        self.file_types.handler_count() + self.tools.handler_count()
    }

    pub fn is_empty(&self) -> bool {
        self.handler_count() == 0
    }
}

#[async_trait]
impl Handler for DispatchHook {
    fn name(&self) -> &str {
        "dispatch"
    }

    async fn evaluate(&self, event: &CallEvent) -> GuardResult<Verdict> {
        if event.is_cancelled() {
            return Ok(Verdict::Continue);
        }

        let mut handlers = self.file_types.matching(event);
        handlers.extend(self.tools.matching(event));

        if handlers.is_empty() {
            return Ok(Verdict::Continue);
        }

        tracing::debug!(
            "[Dispatch] {} {}: {} sub-handler(s)",
            event.phase(),
            event.tool_name(),
            handlers.len()
        );

        Ok(hooks::evaluate_all(&handlers, event).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    fn post(tool: &str, input: serde_json::Value) -> CallEvent {
        CallEvent::post_tool_use(tool, input, CancellationToken::new())
    }

    fn note(text: &'static str) -> impl Fn(&CallEvent) -> Verdict + Send + Sync {
        move |_event: &CallEvent| Verdict::annotate(text)
    }

    #[tokio::test]
    async fn test_unmatched_tool_continues() {
        let hook = DispatchHook::new()
            .on_tool("Bash", |_e: &CallEvent| Verdict::deny("no shell"))
            .unwrap();

        let verdict = hook.evaluate(&post("Grep", json!({"pattern": "x"}))).await.unwrap();
        assert_eq!(verdict, Verdict::Continue);
    }

    #[tokio::test]
    async fn test_file_types_before_tools() {
        let hook = DispatchHook::new()
            .on_tool("Write", note("tool"))
            .unwrap()
            .on_extensions([".ts"], note("typescript"));

        let verdict = hook
            .evaluate(&post("Write", json!({"file_path": "/p/a.ts"})))
            .await
            .unwrap();
        assert_eq!(verdict, Verdict::annotate("typescript"));

        let verdict = hook
            .evaluate(&post("Write", json!({"file_path": "/p/a.py"})))
            .await
            .unwrap();
        assert_eq!(verdict, Verdict::annotate("tool"));
    }

    #[tokio::test]
    async fn test_deny_from_any_sub_handler_wins() {
        let hook = DispatchHook::new()
            .on_extensions(["rs"], note("cargo check"))
            .on_tool("Edit", |_e: &CallEvent| Verdict::deny("edits frozen"))
            .unwrap();

        let verdict = hook
            .evaluate(&post("Edit", json!({"file_path": "/p/lib.rs"})))
            .await
            .unwrap();
        assert_eq!(verdict, Verdict::deny("edits frozen"));
    }

    #[tokio::test]
    async fn test_cancelled_dispatch_continues() {
        let hook = DispatchHook::new().on_extensions([".ts"], note("typescript"));
        let token = CancellationToken::new();
        token.cancel();

        let event = CallEvent::post_tool_use("Write", json!({"file_path": "/p/a.ts"}), token);
        assert_eq!(hook.evaluate(&event).await.unwrap(), Verdict::Continue);
    }

    #[test]
    fn test_counts() {
        let hook = DispatchHook::new()
            .on_extensions([".ts", ".tsx"], note("a"))
            .on_extensions([".md"], note("b"));
        assert_eq!(hook.handler_count(), 2);
        assert!(DispatchHook::new().is_empty());
        assert!(DispatchHook::new().on_tool("Bash(", note("x")).is_err());
    }
}
