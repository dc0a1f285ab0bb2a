use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use agent_guard::config::GuardConfig;
use agent_guard::hooks::{CallEvent, HookRegistry, Phase, Pipeline, Verdict};
use agent_guard::policies::{DispatchHook, SecurityBlockerHook};
use agent_guard::protocol::{HookInput, HookOutput};

fn project_pipeline() -> Pipeline {
    GuardConfig::for_project("/project")
        .with_auto_format(false)
        .with_sandbox_root("/tmp/agent-sandbox")
        .build_pipeline()
        .unwrap()
}

fn pre(tool: &str, input: serde_json::Value) -> CallEvent {
    CallEvent::pre_tool_use(tool, input, CancellationToken::new())
}

#[tokio::test]
async fn test_env_file_write_denied() {
    let verdict = project_pipeline()
        .evaluate(&pre("Write", json!({"file_path": "/project/src/.env", "content": "A=1"})))
        .await;

    assert!(verdict.is_deny());
    assert!(verdict.reason().unwrap().contains(".env"));
}

#[tokio::test]
async fn test_force_push_denied() {
    let verdict = project_pipeline()
        .evaluate(&pre("Bash", json!({"command": "git push --force origin main"})))
        .await;

    let reason = verdict.reason().unwrap();
    assert!(reason.starts_with("Security: Dangerous pattern"));
    assert!(reason.contains("--force"));
}

#[tokio::test]
async fn test_single_allowed_file() {
    let pipeline = GuardConfig::for_project("/project")
        .with_auto_format(false)
        .with_allowed_file("/project/out.ts")
        .build_pipeline()
        .unwrap();

    let same = pre("Write", json!({"file_path": "/project/out.ts"}));
    assert_eq!(pipeline.evaluate(&same).await, Verdict::Continue);

    let other = pre("Write", json!({"file_path": "/project/other.ts"}));
    let verdict = pipeline.evaluate(&other).await;
    let reason = verdict.reason().unwrap();
    assert!(reason.contains("/project/out.ts"));
    assert!(reason.contains("/project/other.ts"));
}

#[tokio::test]
async fn test_scratch_write_redirected_to_sandbox() {
    let verdict = project_pipeline()
        .evaluate(&pre("Write", json!({"file_path": "/tmp/x.ts", "content": "export {}"})))
        .await;

    assert_eq!(
        verdict,
        Verdict::allow_with_input(json!({
            "file_path": "/tmp/agent-sandbox/x.ts",
            "content": "export {}"
        }))
    );
}

#[tokio::test]
async fn test_dispatch_ignores_unrouted_tool() {
    let mut registry = HookRegistry::new();
    registry.add(
        Phase::Post,
        DispatchHook::new()
            .on_tool("Bash", |_e: &CallEvent| Verdict::annotate("shell ran"))
            .unwrap(),
    );
    let pipeline = Pipeline::new(registry);

    let grep = CallEvent::post_tool_use("Grep", json!({"pattern": "TODO"}), CancellationToken::new());
    assert_eq!(pipeline.evaluate(&grep).await, Verdict::Continue);
}

#[tokio::test]
async fn test_security_reason_wins_over_later_denials() {
    let mut registry = HookRegistry::new();
    registry
        .add_with_pattern(Phase::Pre, "Bash", SecurityBlockerHook::new("/project").unwrap())
        .unwrap()
        .add_with_pattern(Phase::Pre, "Bash", |_e: &CallEvent| Verdict::deny("shell disabled"))
        .unwrap();
    let pipeline = Pipeline::new(registry);

    let verdict = pipeline.evaluate(&pre("Bash", json!({"command": "rm -rf /"}))).await;
    assert!(verdict.reason().unwrap().starts_with("Security:"));

    let verdict = pipeline.evaluate(&pre("Bash", json!({"command": "ls"}))).await;
    assert_eq!(verdict, Verdict::deny("shell disabled"));
}

#[tokio::test]
async fn test_first_allow_update_wins() {
    let mut registry = HookRegistry::new();
    registry
        .add(Phase::Pre, |e: &CallEvent| {
            Verdict::allow_with_input(e.input_with("command", "first"))
        })
        .add(Phase::Pre, |e: &CallEvent| {
            Verdict::allow_with_input(e.input_with("timeout", 1))
        });
    let pipeline = Pipeline::new(registry);

    let verdict = pipeline
        .evaluate(&pre("Bash", json!({"command": "ls"})))
        .await;
    let updated = verdict.updated_input().unwrap();

    assert_eq!(updated["command"], "first");
    assert!(updated.get("timeout").is_none());
}

#[tokio::test]
async fn test_evaluation_is_idempotent() {
    let pipeline = project_pipeline();
    let event = pre("Write", json!({"file_path": "/elsewhere/a.ts"}));

    let first = pipeline.evaluate(&event).await;
    let second = pipeline.evaluate(&event).await;
    assert_eq!(first, second);
    assert!(first.is_deny());
}

#[tokio::test]
async fn test_cancelled_run_skips_every_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let mut registry = HookRegistry::new();
    registry.add(Phase::Pre, move |_e: &CallEvent| {
        counter.fetch_add(1, Ordering::SeqCst);
        Verdict::deny("always")
    });
    let pipeline = Pipeline::new(registry);

    let token = CancellationToken::new();
    token.cancel();
    let event = CallEvent::pre_tool_use("Bash", json!({"command": "ls"}), token);

    assert_eq!(pipeline.evaluate(&event).await, Verdict::Continue);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_hook_protocol_round() {
    let input: HookInput = serde_json::from_value(json!({
        "hook_event_name": "PreToolUse",
        "tool_name": "Read",
        "tool_input": {"file_path": "/project/.env.local"},
        "cwd": "/project"
    }))
    .unwrap();

    let phase = input.phase().unwrap();
    let event = input.into_event(CancellationToken::new()).unwrap();
    let verdict = project_pipeline().evaluate(&event).await;
    let output = serde_json::to_value(HookOutput::from_verdict(&verdict, phase)).unwrap();

    assert_eq!(output["hookSpecificOutput"]["permissionDecision"], "deny");
    assert!(output["hookSpecificOutput"]["permissionDecisionReason"]
        .as_str()
        .unwrap()
        .contains(".env"));
}
