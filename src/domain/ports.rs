use crate::config::lookups::Lookups;
use crate::domain::model::{DateRange, QueryResult, ReportData, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Where the finished file goes. The CLI writes to a local directory.
pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn date_range(&self) -> Result<DateRange>;
    fn database_path(&self) -> &str;
    fn access_user_id(&self) -> i64;
    fn output_path(&self) -> &str;
    fn lookups(&self) -> &Lookups;
    fn summary_formulas(&self) -> bool;
    fn outflow_label(&self) -> &str;
}

/// Values bound into every report query.
#[derive(Debug, Clone, Copy)]
pub struct QueryParams {
    pub range: DateRange,
    pub access_user_id: i64,
}

/// One open session with the store. Dropping it releases the connection.
pub trait QuerySession {
    fn query(&mut self, sql: &str, params: &QueryParams) -> Result<QueryResult>;
}

pub trait Connector: Send + Sync {
    type Session: QuerySession + Send;

    fn describe(&self) -> String;
    fn connect(&self) -> Result<Self::Session>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn connect(&self) -> Result<()>;
    async fn extract(&self) -> Result<ReportData>;
    async fn transform(&self, data: ReportData) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
