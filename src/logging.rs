//! Logger setup and structured event lines for load lifecycles.

use crate::filter::{LoadOutcome, LoadRequest, RequestId};
use crate::screen::ScreenEvent;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde_json::{Value, json};
use std::fs::OpenOptions;
use std::path::Path;
use std::time::Duration;

pub const LOG_FILE: &str = "pharmatrack-feedback.log";

/// Route `log` output to a truncated file; the terminal belongs to the TUI.
pub fn init(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let log_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {:?}", path))?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .try_init()
        .context("Logger already initialised")?;
    Ok(())
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub fn load_issued(request: &LoadRequest) -> Value {
    let log_data = json!({
        "event": "load_issued",
        "request_id": request.id.to_string(),
        "mode": request.mode,
        "changed": request.changed,
        "filter": request.filter.to_pairs(),
        "timestamp": timestamp()
    });
    info!("Load Issued: {}", log_data);
    log_data
}

pub fn load_resolved(id: RequestId, outcome: LoadOutcome, elapsed: Duration, accepted: bool) -> Value {
    let (status, items) = match outcome {
        LoadOutcome::Success { items } => ("success", Some(items)),
        LoadOutcome::Failure => ("failure", None),
    };
    let log_data = json!({
        "event": "load_resolved",
        "request_id": id.to_string(),
        "status": status,
        "items": items,
        "accepted": accepted,
        "duration_ms": elapsed.as_millis() as u64,
        "timestamp": timestamp()
    });
    if !accepted {
        debug!("Load Superseded: {}", log_data);
    } else if outcome == LoadOutcome::Failure {
        warn!("Load Failed: {}", log_data);
    } else {
        info!("Load Resolved: {}", log_data);
    }
    log_data
}

pub fn screen_event(event: &ScreenEvent) {
    match event {
        ScreenEvent::Load(request) => {
            load_issued(request);
        }
        other => debug!(
            "Screen Event: {}",
            json!({ "event": other, "timestamp": timestamp() })
        ),
    }
}
