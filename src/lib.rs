// Library interface for repo2cwl
// The binary and the integration tests both build on these modules.

pub mod batch;
pub mod cli;
pub mod cli_utils;
pub mod commands;
pub mod config;
pub mod config_discovery;
pub mod engine;
pub mod image;
pub mod logging;
pub mod notebook;
pub mod repo;

// Re-export commonly used types
pub use batch::{run_batch, BatchError, BatchOptions, BatchSummary};
pub use config::Repo2CwlConfig;
pub use engine::{convert_cells, Conversion, ConvertError, EngineOptions, SkipReason};
