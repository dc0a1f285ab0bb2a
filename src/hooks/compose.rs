//! Verdict composition
//!
//! Matched handlers run concurrently on the current task and the pipeline
//! waits for all of them. Only then are their verdicts reduced, so the result
//! never depends on which handler finished first.
//!
//! Precedence: **Deny > Allow > Annotate > Continue**, first by registration
//! order within each class.
//!
//! Allow and Annotate are first-wins, not merged: a later handler's updated
//! input or context is dropped. Handlers that need to accumulate context
//! should do it inside one handler (see `DispatchHook`).

use std::panic::AssertUnwindSafe;

use futures::future::join_all;
use futures::FutureExt;

use super::registry::{ArcHandler, Handler};
use super::types::{CallEvent, Verdict};

/// Run every handler against `event` and reduce the results
pub async fn evaluate_all(handlers: &[ArcHandler], event: &CallEvent) -> Verdict {
    reduce(run_all(handlers, event).await)
}

/// Run every handler concurrently and return verdicts in registration order
///
/// Faults (errors and panics) are contained here and become `Continue`.
pub async fn run_all(handlers: &[ArcHandler], event: &CallEvent) -> Vec<Verdict> {
    join_all(
        handlers
            .iter()
            .map(|handler| run_contained(handler.as_ref(), event)),
    )
    .await
}

async fn run_contained(handler: &dyn Handler, event: &CallEvent) -> Verdict {
    if event.is_cancelled() {
        return Verdict::Continue;
    }

    match AssertUnwindSafe(handler.evaluate(event)).catch_unwind().await {
        Ok(Ok(verdict)) => verdict,
        Ok(Err(err)) => {
            tracing::warn!(
                "[Composer] Handler '{}' faulted on {} {}: {}",
                handler.name(),
                event.phase(),
                event.tool_name(),
                err
            );
            Verdict::Continue
        }
        Err(_) => {
            tracing::warn!(
                "[Composer] Handler '{}' panicked on {} {}",
                handler.name(),
                event.phase(),
                event.tool_name()
            );
            Verdict::Continue
        }
    }
}

/// Reduce verdicts (in registration order) to the effective one
pub fn reduce<I>(verdicts: I) -> Verdict
where
    I: IntoIterator<Item = Verdict>,
{
    let mut first_allow = None;
    let mut first_annotate = None;

    for verdict in verdicts {
        match verdict {
            // Deny always wins; the earliest one is reported as-is
            Verdict::Deny { .. } => return verdict,
            Verdict::Allow { .. } => {
                if first_allow.is_none() {
                    first_allow = Some(verdict);
                }
            }
            Verdict::Annotate { ref context } if !context.is_empty() => {
                if first_annotate.is_none() {
                    first_annotate = Some(verdict);
                }
            }
            Verdict::Annotate { .. } | Verdict::Continue => {}
        }
    }

    first_allow.or(first_annotate).unwrap_or_default()
}
