pub mod config;
pub mod demo;
pub mod simulate;

pub use config::{ConfigCommands, config_command};
pub use demo::{DemoCommands, demo_command};
pub use simulate::{SimulateCommands, simulate_command};
