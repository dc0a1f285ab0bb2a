use std::env;
use std::path::PathBuf;

use anyhow::Context;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use agent_guard::config::GuardConfig;
use agent_guard::core::GuardError;
use agent_guard::logging;
use agent_guard::protocol::{HookInput, HookOutput};

/// Hook executable: one HookInput on stdin, one HookOutput on stdout
///
/// Usage: `agent-guard [config.json]` (or set `AGENT_GUARD_CONFIG`).
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_dir = env::var_os("AGENT_GUARD_LOG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| env::temp_dir().join("agent-guard"));
    if let Err(err) = logging::init_logging(&log_dir) {
        eprintln!("agent-guard: logging disabled: {}", err);
    }

    let mut raw = String::new();
    tokio::io::stdin().read_to_string(&mut raw).await?;
    let input: HookInput = serde_json::from_str(&raw).context("invalid hook input")?;

    let phase = match input.phase() {
        Ok(phase) => phase,
        Err(GuardError::UnsupportedEvent(name)) => {
            tracing::debug!("[Main] Ignoring {} event", name);
            println!("{{}}");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let config = match env::args().nth(1).or_else(|| env::var("AGENT_GUARD_CONFIG").ok()) {
        Some(path) => GuardConfig::load(&path).with_context(|| format!("loading {}", path))?,
        None => {
            let root = match &input.cwd {
                Some(cwd) => PathBuf::from(cwd),
                None => env::current_dir()?,
            };
            GuardConfig::for_project(root)
        }
    };
    let pipeline = config.build_pipeline()?;

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("[Main] Interrupted, cancelling");
                cancel.cancel();
            }
        })
    };

    let event = input.into_event(cancel)?;
    let verdict = pipeline.evaluate(&event).await;
    interrupt.abort();

    println!("{}", HookOutput::from_verdict(&verdict, phase).to_json()?);
    Ok(())
}
