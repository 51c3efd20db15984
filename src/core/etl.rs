use crate::core::Pipeline;
use crate::domain::model::ReportStage;
use crate::utils::error::Result;
use std::sync::Mutex;

/// Drives one report run and tracks which stage it reached.
pub struct ReportEngine<P: Pipeline> {
    pipeline: P,
    stage: Mutex<ReportStage>,
    failed_during: Mutex<Option<ReportStage>>,
}

impl<P: Pipeline> ReportEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            stage: Mutex::new(ReportStage::Idle),
            failed_during: Mutex::new(None),
        }
    }

    pub fn stage(&self) -> ReportStage {
        self.stage
            .lock()
            .map(|s| *s)
            .unwrap_or(ReportStage::Failed)
    }

    /// The stage that was running when the last run failed.
    pub fn failed_during(&self) -> Option<ReportStage> {
        self.failed_during.lock().ok().and_then(|s| *s)
    }

    fn enter(&self, stage: ReportStage) {
        if let Ok(mut current) = self.stage.lock() {
            tracing::debug!("Stage {} → {}", *current, stage);
            *current = stage;
        }
    }

    pub async fn run(&self) -> Result<String> {
        let outcome = self.run_stages().await;
        match &outcome {
            Ok(_) => self.enter(ReportStage::Done),
            Err(e) => {
                let during = self.stage();
                tracing::error!("❌ Report failed during {}: {}", during, e);
                if let Ok(mut slot) = self.failed_during.lock() {
                    *slot = Some(during);
                }
                self.enter(ReportStage::Failed);
            }
        }
        outcome
    }

    async fn run_stages(&self) -> Result<String> {
        tracing::info!("🚀 Starting report generation");

        self.enter(ReportStage::Connecting);
        self.pipeline.connect().await?;

        self.enter(ReportStage::Querying);
        let data = self.pipeline.extract().await?;
        tracing::info!("📥 Fetched {} rows in total", data.total_rows());

        self.enter(ReportStage::Enriching);
        let result = self.pipeline.transform(data).await?;
        tracing::info!(
            "🔄 Enriched payables ({} unmapped accounts, {} unparsed amounts)",
            result.stats.unmapped_accounts,
            result.stats.unparsed_amounts
        );

        self.enter(ReportStage::Rendering);
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("💾 Report saved to: {}", output_path);

        Ok(output_path)
    }
}
