//! Command implementations for shopvox

mod config;
mod predict;
mod stdio;

pub use config::run_config;
pub use predict::run_predict;
pub use stdio::run_stdio;
