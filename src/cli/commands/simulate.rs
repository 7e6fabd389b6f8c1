use crate::clock::Scheduler;
use crate::config::EngineConfig;
use crate::progress::{ProgressConfig, ProgressController, ProgressSignal, ProgressTimer};
use anyhow::Result;
use clap::Args;
use log::info;
use serde_json::{Value, json};
use std::time::Duration;

/// Upper bound on simulated time after `complete()`.
const DRAIN_LIMIT: Duration = Duration::from_secs(10);

#[derive(Args)]
pub struct SimulateCommands {
    /// Milliseconds after start at which the operation resolves
    #[arg(long, default_value_t = 1050)]
    pub resolve_after: u64,
    /// Ignore the config file and use built-in defaults
    #[arg(long)]
    pub defaults: bool,
}

pub async fn simulate_command(args: SimulateCommands) -> Result<()> {
    let config = if args.defaults {
        EngineConfig::default()
    } else {
        EngineConfig::load()?
    };
    info!("Simulating progress lifecycle, resolving after {}ms", args.resolve_after);

    for line in run_scenario(config.progress, Duration::from_millis(args.resolve_after)) {
        println!("{}", line);
    }
    Ok(())
}

fn sample(at: Duration, progress: &ProgressController, event: &str) -> Value {
    json!({
        "t_ms": at.as_millis() as u64,
        "event": event,
        "value": progress.value(),
        "percent": progress.percent(),
        "phase": progress.phase(),
    })
}

/// Start, resolve at `resolve_after`, and run until the value resets.
/// One line per observable change.
pub fn run_scenario(config: ProgressConfig, resolve_after: Duration) -> Vec<Value> {
    let mut sched: Scheduler<ProgressTimer> = Scheduler::new();
    let mut progress = ProgressController::new(config);
    let mut lines = Vec::new();

    progress.start(&mut sched);
    lines.push(sample(sched.now(), &progress, "start"));

    while let Some(fired) = sched.pop_due(resolve_after) {
        progress.on_timer(fired.id, fired.payload, &mut sched);
        lines.push(sample(fired.at, &progress, "tick"));
    }
    sched.advance_to(resolve_after);
    progress.complete(&mut sched);
    lines.push(sample(sched.now(), &progress, "complete"));

    let limit = resolve_after + DRAIN_LIMIT;
    while let Some(fired) = sched.pop_due(limit) {
        let event = match progress.on_timer(fired.id, fired.payload, &mut sched) {
            Some(ProgressSignal::Settled) => "settled",
            Some(ProgressSignal::Reset) => "reset",
            None => "tick",
        };
        lines.push(sample(fired.at, &progress, event));
        if event == "reset" {
            break;
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scenario_lifecycle() {
        let lines = run_scenario(ProgressConfig::default(), Duration::from_millis(1050));

        let complete = lines.iter().find(|l| l["event"] == "complete").unwrap();
        assert_eq!(complete["percent"], 42);
        assert_eq!(complete["phase"], "finishing");

        let settled = lines.iter().find(|l| l["event"] == "settled").unwrap();
        assert_eq!(settled["t_ms"], 1270);
        assert_eq!(settled["value"], 1.0);

        let last = lines.last().unwrap();
        assert_eq!(last["event"], "reset");
        assert_eq!(last["t_ms"], 1770);
        assert_eq!(last["value"], 0.0);
    }

    #[test]
    fn test_values_never_decrease_before_reset() {
        let lines = run_scenario(ProgressConfig::default(), Duration::from_millis(3000));
        let values: Vec<f64> = lines
            .iter()
            .take_while(|l| l["event"] != "reset")
            .map(|l| l["value"].as_f64().unwrap())
            .collect();
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert!(values.iter().all(|v| *v <= 1.0));
    }
}
