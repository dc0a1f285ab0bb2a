//! Pipeline
//!
//! The entry point the agent runtime calls once per phase per tool call.

use super::compose;
use super::registry::HookRegistry;
use super::types::{CallEvent, Verdict};

/// Routes an event through the registry and composes one verdict
///
/// The registry is fixed once the pipeline is built. `evaluate` never fails:
/// in the worst case it returns `Verdict::Continue`.
#[derive(Debug, Default)]
pub struct Pipeline {
    registry: HookRegistry,
}

impl Pipeline {
    /// Create a pipeline over a finished registry
    pub fn new(registry: HookRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    /// Evaluate one event
    pub async fn evaluate(&self, event: &CallEvent) -> Verdict {
        if event.is_cancelled() {
            tracing::debug!("[Pipeline] Run cancelled, skipping {} {}", event.phase(), event.tool_name());
            return Verdict::Continue;
        }

        let handlers = self.registry.matching(event);
        if handlers.is_empty() {
            return Verdict::Continue;
        }

        tracing::debug!(
            "[Pipeline] {} {}: {} handler(s) matched",
            event.phase(),
            event.tool_name(),
            handlers.len()
        );

        let verdict = compose::evaluate_all(&handlers, event).await;

        match &verdict {
            Verdict::Deny { reason } => {
                tracing::info!("[Pipeline] Denied {}: {}", event.tool_name(), reason)
            }
            Verdict::Allow {
                updated_input: Some(_),
            } => tracing::info!("[Pipeline] Rewrote input for {}", event.tool_name()),
            other => tracing::debug!("[Pipeline] {} -> {}", event.tool_name(), other.kind()),
        }

        verdict
    }
}
