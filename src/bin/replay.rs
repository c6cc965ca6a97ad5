//! Replay a recorded event script through the session coordinator.
//!
//! Usage: `session-replay <events.jsonl> [calibration|training|unified]`
//!
//! Each line is `{"event": "<name>", "data": {...}}`. Frame lines carry
//! `"bytes": [...]` instead of `data`, and any line may add `"waitMs"` to
//! pause before it is delivered. Prints the final snapshot as JSON.

use anyhow::{anyhow, Context, Result};
use form_coach_client::config::ClientConfig;
use form_coach_client::presenter::MemorySurface;
use form_coach_client::session::state::CameraPair;
use form_coach_client::session::{ChannelEvent, MemoryChannel, SessionConfig, SessionMode};
use form_coach_client::SessionService;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScriptLine {
    event: String,
    #[serde(default)]
    data: Value,
    bytes: Option<Vec<u8>>,
    wait_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    form_coach_client::init_tracing();

    let mut args = std::env::args().skip(1);
    let script = args
        .next()
        .context("usage: session-replay <events.jsonl> [calibration|training|unified]")?;
    let mode: SessionMode = match args.next() {
        Some(mode) => serde_json::from_value(Value::String(mode.clone()))
            .with_context(|| format!("unknown mode '{}'", mode))?,
        None => SessionMode::Unified,
    };

    let config = ClientConfig::from_env()?;
    tracing::info!(
        "Replaying {} for service {} in {:?} mode",
        script,
        config.server_url,
        mode
    );
    let channel = Arc::new(MemoryChannel::new("replay"));
    let surface = Arc::new(MemorySurface::new());
    let service = SessionService::new(channel.clone(), surface, &config);

    service
        .start_session(SessionConfig {
            cameras: CameraPair::default(),
            mode,
            plan: None,
        })
        .await
        .map_err(|e| anyhow!("{}: {}", e.code, e.message))?;

    let content = tokio::fs::read_to_string(&script)
        .await
        .with_context(|| format!("failed to read {}", script))?;

    let injector = channel.injector();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let entry: ScriptLine = serde_json::from_str(line)
            .with_context(|| format!("invalid script line {}", index + 1))?;

        if let Some(ms) = entry.wait_ms {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }

        let event = match entry.bytes {
            Some(bytes) => ChannelEvent::decode_binary(&entry.event, bytes),
            None => match ChannelEvent::decode(&entry.event, entry.data) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("Skipping line {}: {}", index + 1, e);
                    continue;
                }
            },
        };
        injector.push(event);
    }

    // Let the pump apply the tail of the script
    tokio::time::sleep(Duration::from_millis(100)).await;

    let snapshot = service.get_snapshot().await;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    service.shutdown().await;
    Ok(())
}
