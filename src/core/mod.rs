pub mod currency;
pub mod delivery;
pub mod enrich;
pub mod etl;
pub mod formula;
pub mod pipeline;
pub mod queries;
pub mod summary;
pub mod workbook;

pub use crate::domain::model::{ReportData, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Connector, Pipeline, Storage};
pub use crate::utils::error::Result;
