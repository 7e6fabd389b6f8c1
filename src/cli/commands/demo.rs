use crate::catalog::{InMemorySource, Shipment, sample_shipments};
use crate::config::EngineConfig;
use crate::driver::DataSource;
use crate::tui::{self, DemoApp, app::PAGE_SIZE};
use anyhow::Result;
use clap::Args;
use log::info;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args)]
pub struct DemoCommands {
    /// Base backend latency in milliseconds
    #[arg(long, default_value_t = 400)]
    pub latency: u64,
    /// Random extra latency in milliseconds
    #[arg(long, default_value_t = 800)]
    pub jitter: u64,
    /// Ignore the config file and use built-in defaults
    #[arg(long)]
    pub defaults: bool,
}

pub async fn demo_command(args: DemoCommands) -> Result<()> {
    let config = if args.defaults {
        EngineConfig::default()
    } else {
        EngineConfig::load()?
    };
    info!(
        "Launching demo with {}ms (+{}ms) backend latency",
        args.latency, args.jitter
    );

    let source = InMemorySource::new(sample_shipments())
        .with_page_size(PAGE_SIZE)
        .with_latency(Duration::from_millis(args.latency), Duration::from_millis(args.jitter));
    let source: Arc<dyn DataSource<Shipment>> = Arc::new(source);

    let mut app = DemoApp::new(&config, source, sample_shipments());
    tui::launch(&mut app).await
}
