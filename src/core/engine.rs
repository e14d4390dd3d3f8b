use crate::core::Pipeline;
use crate::domain::model::ProcessReport;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct PdfEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> PdfEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<ProcessReport> {
        tracing::info!("Preparing input...");
        let document = self.pipeline.prepare().await?;
        tracing::info!(
            "Prepared {} ({} pages, scanned: {})",
            document.source,
            document.total_pages_in,
            document.is_scan
        );
        self.monitor.log_stats("prepare");

        tracing::info!("Transforming document...");
        let document = self.pipeline.transform(document).await?;
        if document.rotated {
            tracing::debug!("Pages were rotated during transform");
        }
        self.monitor.log_stats("transform");

        tracing::info!("Writing outputs...");
        let report = self.pipeline.load(document).await?;
        tracing::info!(
            "Output saved to: {} ({} pages)",
            report.output_pdf.display(),
            report.metadata.pages_out
        );
        self.monitor.log_stats("load");
        self.monitor.log_final_stats();

        Ok(report)
    }
}
