#[cfg(feature = "cli")]
pub mod cli;
pub mod lookups;
pub mod toml_config;

pub use lookups::{Company, LookupTable, Lookups};
pub use toml_config::ReportConfig;
