// src/report.rs
// Assembles the final combined report and hands it off for display.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use crate::error::AnalysisError;

pub const REPORT_TITLE: &str = "# Complete Relationship Analysis";
pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Joins accepted per-chunk analyses, in chunk order, under the fixed title.
pub fn combine(analyses: &[String]) -> String {
    format!("{}\n\n{}", REPORT_TITLE, analyses.join(SECTION_SEPARATOR))
}

/// Destination for the finished report. Stands in for whatever the
/// surrounding application uses as its "last analysis result" slot.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn store(&self, report: &str) -> Result<(), AnalysisError>;
}

#[async_trait]
impl<T: ReportSink + ?Sized> ReportSink for std::sync::Arc<T> {
    async fn store(&self, report: &str) -> Result<(), AnalysisError> {
        (**self).store(report).await
    }
}

/// Writes the report to a single well-known file, overwriting any
/// previous run's result.
pub struct FileReportSink {
    path: PathBuf,
}

impl FileReportSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ReportSink for FileReportSink {
    async fn store(&self, report: &str) -> Result<(), AnalysisError> {
        tokio::fs::write(&self.path, report).await?;
        info!(path = %self.path.display(), "Analysis result stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_single_analysis() {
        let analyses = vec!["only section".to_string()];
        assert_eq!(
            combine(&analyses),
            "# Complete Relationship Analysis\n\nonly section"
        );
    }

    #[test]
    fn test_combine_preserves_order() {
        let analyses = vec!["first".to_string(), "second".to_string(), "third".to_string()];
        assert_eq!(
            combine(&analyses),
            "# Complete Relationship Analysis\n\nfirst\n\n---\n\nsecond\n\n---\n\nthird"
        );
    }

    #[tokio::test]
    async fn test_file_sink_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis_result.md");
        let sink = FileReportSink::new(&path);

        sink.store("first report").await.unwrap();
        sink.store("second report").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second report");
    }
}
