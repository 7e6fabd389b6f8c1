//! Client-side feedback engine for list screens of the supply-chain console:
//! simulated progress, filter/navigation reconciliation, type-ahead
//! suggestions and a damped motion follower, all driven by one scheduler.

pub mod catalog;
pub mod cli;
pub mod clock;
pub mod config;
pub mod debounce;
pub mod driver;
pub mod filter;
pub mod logging;
pub mod motion;
pub mod progress;
pub mod screen;
pub mod suggest;
pub mod tui;
pub mod ui;

pub use clock::{Scheduler, TimerId};
pub use config::EngineConfig;
pub use screen::{ListScreen, ScreenEvent, ScreenTimer, SuggestKey};
