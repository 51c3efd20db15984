pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::{CliConfig, LocalStorage};

pub use adapters::SqliteConnector;
pub use config::ReportConfig;
pub use core::{etl::ReportEngine, pipeline::ReportPipeline};
pub use utils::error::{ReportError, Result};
