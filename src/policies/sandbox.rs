//! Sandbox redirect
//!
//! PreToolUse handler that rewrites Write/Edit targets into a sandbox
//! directory instead of blocking them.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::core::{paths, GuardResult};
use crate::hooks::{CallEvent, Handler, Phase, Verdict};

/// Redirects writes outside `root` to `<root>/<basename>`
///
/// Relative targets, and a relative `root`, are resolved against `base_dir`.
#[derive(Debug, Clone)]
pub struct SandboxRedirectHook {
    root: PathBuf,
    base_dir: PathBuf,
}

impl SandboxRedirectHook {
    /// Create the handler; `root` is resolved once here
    pub fn new(root: impl AsRef<Path>, base_dir: impl AsRef<Path>) -> Self {
        let base_dir = paths::normalize(base_dir.as_ref());
        Self {
            root: paths::resolve(&base_dir, root.as_ref()),
            base_dir,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl Handler for SandboxRedirectHook {
    fn name(&self) -> &str {
        "sandbox-redirect"
    }

    async fn evaluate(&self, event: &CallEvent) -> GuardResult<Verdict> {
        if event.is_cancelled() || event.phase() != Phase::Pre || !event.call().is_file_write() {
            return Ok(Verdict::Continue);
        }

        let Some(file_path) = event.file_path() else {
            return Ok(Verdict::Continue);
        };

        if paths::resolve(&self.base_dir, file_path).starts_with(&self.root) {
            return Ok(Verdict::Continue);
        }

        let Some(name) = file_path.file_name() else {
            return Ok(Verdict::Continue);
        };

        let redirected = self.root.join(name);
        tracing::debug!(
            "[Sandbox] Redirecting {} -> {}",
            file_path.display(),
            redirected.display()
        );

        Ok(Verdict::allow_with_input(event.input_with(
            "file_path",
            Value::String(redirected.to_string_lossy().into_owned()),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_redirects_outside_write() {
        let hook = SandboxRedirectHook::new("/tmp/agent-sandbox", "/project");
        let event = CallEvent::pre_tool_use(
            "Write",
            json!({"file_path": "/tmp/x.ts", "content": "export {}"}),
            CancellationToken::new(),
        );

        let verdict = hook.evaluate(&event).await.unwrap();
        assert_eq!(
            verdict,
            Verdict::allow_with_input(json!({
                "file_path": "/tmp/agent-sandbox/x.ts",
                "content": "export {}"
            }))
        );
        assert_eq!(event.tool_input()["file_path"], "/tmp/x.ts");
    }

    #[tokio::test]
    async fn test_inside_root_continues() {
        let hook = SandboxRedirectHook::new("/tmp/agent-sandbox/", "/project");
        let event = CallEvent::pre_tool_use(
            "Edit",
            json!({"file_path": "/tmp/agent-sandbox/nested/a.ts"}),
            CancellationToken::new(),
        );
        assert_eq!(hook.evaluate(&event).await.unwrap(), Verdict::Continue);
    }

    #[tokio::test]
    async fn test_relative_target_inside_root_continues() {
        let hook = SandboxRedirectHook::new("sandbox", "/project");
        assert_eq!(hook.root(), Path::new("/project/sandbox"));

        let inside = CallEvent::pre_tool_use(
            "Write",
            json!({"file_path": "sandbox/sub/a.ts"}),
            CancellationToken::new(),
        );
        assert_eq!(hook.evaluate(&inside).await.unwrap(), Verdict::Continue);

        let outside = CallEvent::pre_tool_use(
            "Write",
            json!({"file_path": "src/a.ts"}),
            CancellationToken::new(),
        );
        assert_eq!(
            hook.evaluate(&outside).await.unwrap().updated_input().unwrap()["file_path"],
            "/project/sandbox/a.ts"
        );
    }

    #[tokio::test]
    async fn test_prefix_sibling_is_redirected() {
        let hook = SandboxRedirectHook::new("/tmp/agent-sandbox", "/project");
        let event = CallEvent::pre_tool_use(
            "Write",
            json!({"file_path": "/tmp/agent-sandbox-evil/a.ts"}),
            CancellationToken::new(),
        );
        let verdict = hook.evaluate(&event).await.unwrap();
        assert_eq!(
            verdict.updated_input().unwrap()["file_path"],
            "/tmp/agent-sandbox/a.ts"
        );
    }

    #[tokio::test]
    async fn test_bash_untouched() {
        let hook = SandboxRedirectHook::new("/tmp/agent-sandbox", "/project");
        let event = CallEvent::pre_tool_use(
            "Bash",
            json!({"command": "touch /x"}),
            CancellationToken::new(),
        );
        assert_eq!(hook.evaluate(&event).await.unwrap(), Verdict::Continue);
    }
}
