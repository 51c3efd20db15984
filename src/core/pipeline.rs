use crate::core::delivery::deliver;
use crate::core::enrich::enrich_report;
use crate::core::queries::{execute_all, open_session, report_queries};
use crate::core::workbook::{synthesize, SynthesisOptions};
use crate::core::{ConfigProvider, Pipeline, ReportData, Storage, TransformResult};
use crate::domain::model::DateRange;
use crate::domain::ports::{Connector, QueryParams};
use crate::utils::error::Result;
use std::sync::{Mutex, OnceLock};

/// Store → enrich → workbook → storage.
pub struct ReportPipeline<S: Storage, C: ConfigProvider, D: Connector> {
    storage: S,
    config: C,
    connector: D,
    /// Fixed on first use so the queries and the filename share one period.
    period: OnceLock<DateRange>,
    /// Opened by `connect`, consumed by `extract`.
    session: Mutex<Option<D::Session>>,
}

impl<S: Storage, C: ConfigProvider, D: Connector> ReportPipeline<S, C, D> {
    pub fn new(storage: S, config: C, connector: D) -> Self {
        Self {
            storage,
            config,
            connector,
            period: OnceLock::new(),
            session: Mutex::new(None),
        }
    }

    fn period(&self) -> Result<DateRange> {
        if let Some(range) = self.period.get() {
            return Ok(*range);
        }
        let range = self.config.date_range()?;
        Ok(*self.period.get_or_init(|| range))
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, D: Connector> Pipeline for ReportPipeline<S, C, D> {
    async fn connect(&self) -> Result<()> {
        // refuse the period before touching the store
        let range = self.period()?;
        tracing::debug!(
            "Opening {} for {} (user {})",
            self.config.database_path(),
            range.label(),
            self.config.access_user_id()
        );
        let session = open_session(&self.connector)?;
        if let Ok(mut slot) = self.session.lock() {
            *slot = Some(session);
        }
        Ok(())
    }

    async fn extract(&self) -> Result<ReportData> {
        let range = self.period()?;
        let params = QueryParams {
            range,
            access_user_id: self.config.access_user_id(),
        };
        let queries = report_queries(&self.config.lookups().company_ids());

        let opened = self.session.lock().ok().and_then(|mut slot| slot.take());
        let session = match opened {
            Some(session) => session,
            None => open_session(&self.connector)?,
        };
        execute_all(session, &queries, &params)
    }

    async fn transform(&self, data: ReportData) -> Result<TransformResult> {
        Ok(enrich_report(data, self.config.lookups()))
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let range = self.period()?;
        let options = SynthesisOptions {
            range,
            formulas: self.config.summary_formulas(),
            outflow_label: self.config.outflow_label(),
        };
        let workbook = synthesize(&result, self.config.lookups(), &options);
        let deliverable = deliver(&workbook, &range)?;

        tracing::debug!(
            "Writing {} ({} bytes) to storage",
            deliverable.filename,
            deliverable.bytes.len()
        );
        self.storage
            .write_file(&deliverable.filename, &deliverable.bytes)
            .await?;

        Ok(format!("{}/{}", self.config.output_path(), deliverable.filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::lookups::Lookups;
    use crate::config::ReportConfig;
    use crate::domain::model::{CellValue, QueryResult};
    use crate::domain::ports::QuerySession;
    use crate::utils::error::ReportError;
    use calamine::{DataType, Reader, Xlsx};
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }

        async fn file_count(&self) -> usize {
            self.files.lock().await.len()
        }
    }

    impl Storage for MockStorage {
        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    /// Answers each query from a canned result keyed by the view it reads.
    struct CannedConnector {
        results: Vec<(&'static str, QueryResult)>,
        connects: Arc<AtomicUsize>,
    }

    struct CannedSession {
        results: Vec<(&'static str, QueryResult)>,
    }

    impl QuerySession for CannedSession {
        fn query(&mut self, sql: &str, _params: &QueryParams) -> Result<QueryResult> {
            Ok(self
                .results
                .iter()
                .find(|(view, _)| sql.contains(view))
                .map(|(_, result)| result.clone())
                .unwrap_or_default())
        }
    }

    impl Connector for CannedConnector {
        type Session = CannedSession;

        fn describe(&self) -> String {
            "canned".to_string()
        }

        fn connect(&self) -> Result<CannedSession> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(CannedSession {
                results: self.results.clone(),
            })
        }
    }

    fn result(columns: &[&str], rows: Vec<Vec<CellValue>>) -> QueryResult {
        let mut result = QueryResult::new(columns.iter().map(|s| s.to_string()).collect());
        for row in rows {
            result.push_row(row);
        }
        result
    }

    fn january_config() -> ReportConfig {
        let mut config = ReportConfig::default();
        config.report.start = NaiveDate::from_ymd_opt(2025, 1, 1);
        config.report.end = NaiveDate::from_ymd_opt(2025, 1, 31);
        config.output.path = "test_output".to_string();
        config
    }

    fn connector() -> CannedConnector {
        let payables = result(
            &["ID_Empresa", "Conta", "emissao", "Valor"],
            vec![vec![
                CellValue::Int(66),
                CellValue::text("  47 - CAIXA TESOURARIA | BALSAS  "),
                CellValue::DateTime(
                    NaiveDate::from_ymd_opt(2025, 1, 10)
                        .unwrap()
                        .and_hms_opt(14, 30, 0)
                        .unwrap(),
                ),
                CellValue::text("R$ 1.000,00"),
            ]],
        );
        CannedConnector {
            results: vec![("view_Contas_a_Pagar", payables)],
            connects: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[tokio::test]
    async fn test_extract_runs_four_queries() {
        let pipeline = ReportPipeline::new(MockStorage::new(), january_config(), connector());

        let data = pipeline.extract().await.unwrap();

        assert_eq!(data.payables.len(), 1);
        assert!(data.transfers.is_empty());
        assert_eq!(pipeline.connector.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_extract_reuses_the_connected_session() {
        let pipeline = ReportPipeline::new(MockStorage::new(), january_config(), connector());

        pipeline.connect().await.unwrap();
        assert_eq!(pipeline.connector.connects.load(Ordering::SeqCst), 1);
        let data = pipeline.extract().await.unwrap();

        assert_eq!(data.payables.len(), 1);
        assert_eq!(pipeline.connector.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_inverted_period_never_connects() {
        let mut config = january_config();
        config.report.start = NaiveDate::from_ymd_opt(2025, 2, 1);
        let pipeline = ReportPipeline::new(MockStorage::new(), config, connector());

        let err = pipeline.connect().await.unwrap_err();
        assert!(matches!(err, ReportError::ValidationError { .. }));
        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, ReportError::ValidationError { .. }));

        assert_eq!(pipeline.connector.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transform_enriches_payables() {
        let pipeline = ReportPipeline::new(MockStorage::new(), january_config(), connector());
        let data = pipeline.extract().await.unwrap();

        let result = pipeline.transform(data).await.unwrap();
        let payables = &result.data.payables;

        assert_eq!(
            payables.value(0, "Conta"),
            Some(&CellValue::text("47 - CAIXA TESOURARIA | BALSAS"))
        );
        assert_eq!(payables.value(0, "De Para"), Some(&CellValue::text("Saídas")));
        assert_eq!(payables.value(0, "Valor"), Some(&CellValue::Float(1000.0)));
        assert_eq!(
            payables.value(0, "emissao"),
            Some(&CellValue::Date(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()))
        );
    }

    #[tokio::test]
    async fn test_load_writes_single_workbook() {
        let storage = MockStorage::new();
        let pipeline = ReportPipeline::new(storage.clone(), january_config(), connector());
        let data = pipeline.extract().await.unwrap();
        let result = pipeline.transform(data).await.unwrap();

        let output_path = pipeline.load(result).await.unwrap();

        let filename = "Relatorio_Consolidado_2025-01-01_a_2025-01-31.xlsx";
        assert_eq!(output_path, format!("test_output/{}", filename));
        assert_eq!(storage.file_count().await, 1);

        let bytes = storage.get_file(filename).await.unwrap();
        let mut xlsx: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).unwrap();
        assert_eq!(
            xlsx.sheet_names(),
            vec![
                "Relatorio",
                "Contas a Pagar",
                "Fechamento Caixa",
                "Vendas Trocadas",
                "De Para",
                "Resumo"
            ]
        );
        let summary = xlsx.worksheet_range("Resumo").unwrap();
        // header + one row per configured company
        assert_eq!(summary.height(), 4);
        // Balsas II (66) is the second company; Saídas is column G
        assert_eq!(summary.get_value((2, 6)).and_then(|v| v.as_f64()), Some(1000.0));
    }

    /// Reports a later end date on every call after the first, like a run
    /// whose open end crosses midnight.
    struct MidnightConfig {
        inner: ReportConfig,
        calls: AtomicUsize,
    }

    impl ConfigProvider for MidnightConfig {
        fn date_range(&self) -> Result<DateRange> {
            let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
            let end = match self.calls.fetch_add(1, Ordering::SeqCst) {
                0 => NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
                _ => NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            };
            DateRange::new(start, end)
        }

        fn database_path(&self) -> &str {
            self.inner.database_path()
        }

        fn access_user_id(&self) -> i64 {
            self.inner.access_user_id()
        }

        fn output_path(&self) -> &str {
            self.inner.output_path()
        }

        fn lookups(&self) -> &Lookups {
            self.inner.lookups()
        }

        fn summary_formulas(&self) -> bool {
            self.inner.summary_formulas()
        }

        fn outflow_label(&self) -> &str {
            self.inner.outflow_label()
        }
    }

    #[tokio::test]
    async fn test_filename_uses_the_queried_period() {
        let storage = MockStorage::new();
        let config = MidnightConfig {
            inner: january_config(),
            calls: AtomicUsize::new(0),
        };
        let pipeline = ReportPipeline::new(storage.clone(), config, connector());

        pipeline.connect().await.unwrap();
        let data = pipeline.extract().await.unwrap();
        let result = pipeline.transform(data).await.unwrap();
        let output_path = pipeline.load(result).await.unwrap();

        assert_eq!(
            output_path,
            "test_output/Relatorio_Consolidado_2025-01-01_a_2025-01-31.xlsx"
        );
        assert_eq!(pipeline.config.calls.load(Ordering::SeqCst), 1);
        assert_eq!(storage.file_count().await, 1);
    }
}
