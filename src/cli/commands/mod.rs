//! CLI command implementations.

mod ask;
mod config;
mod serve;
mod tool;

pub use ask::run_ask;
pub use config::run_config;
pub use serve::run_serve;
pub use tool::run_tool;
