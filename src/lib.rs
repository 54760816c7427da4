//! Corral library — re-exports modules for the binary and integration tests.

pub mod bot;
pub mod config;
pub mod history;
pub mod logs;
pub mod metrics;
pub mod monitor;
pub mod runtime;
pub mod scheduler;
pub mod session;
pub mod transport;
