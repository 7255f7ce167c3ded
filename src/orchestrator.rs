// src/orchestrator.rs
// Drives the planned chunks through the client, strictly sequentially,
// pacing each dispatch against the shared token budget.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::chunker;
use crate::client::{AnalysisClient, MIN_ANALYSIS_LENGTH};
use crate::config::Config;
use crate::error::AnalysisError;
use crate::rate;
use crate::report::{self, FileReportSink, ReportSink};

/// Run-scoped mutable state, observable from outside while a run is in
/// flight. Progress is a 0-100 percentage, non-decreasing during a run
/// and reset to 0 at run start and at completion or failure.
#[derive(Debug, Default)]
pub struct RunContext {
    progress: AtomicU8,
    active: AtomicBool,
}

impl RunContext {
    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::SeqCst)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Claims the context for a new run. At most one run may hold it.
    fn begin(&self) -> Result<(), AnalysisError> {
        if self.active.swap(true, Ordering::SeqCst) {
            return Err(AnalysisError::RunActive);
        }
        self.progress.store(0, Ordering::SeqCst);
        Ok(())
    }

    fn set_progress(&self, pct: u8) {
        self.progress.store(pct, Ordering::SeqCst);
    }

    fn finish(&self) {
        self.progress.store(0, Ordering::SeqCst);
        self.active.store(false, Ordering::SeqCst);
    }
}

/// Runs a whole analysis: plan, dispatch each chunk in order, pace
/// between dispatches, combine, store.
pub struct AnalysisOrchestrator {
    client: AnalysisClient,
    sink: Box<dyn ReportSink>,
    context: Arc<RunContext>,
}

impl AnalysisOrchestrator {
    pub fn new(client: AnalysisClient, sink: Box<dyn ReportSink>) -> Self {
        Self {
            client,
            sink,
            context: Arc::new(RunContext::default()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            AnalysisClient::new(config),
            Box::new(FileReportSink::new(config.result_path.clone())),
        )
    }

    /// Handle for observing progress between suspension points.
    pub fn context(&self) -> Arc<RunContext> {
        Arc::clone(&self.context)
    }

    /// Analyzes the whole document and returns the combined report.
    ///
    /// Fail-fast: the first unrecovered error from any chunk aborts the
    /// run with no partial report. Progress is reset to 0 on every exit
    /// path.
    pub async fn run(&self, source_text: &str) -> Result<String, AnalysisError> {
        self.context.begin()?;
        let result = self.run_inner(source_text).await;
        if let Err(e) = &result {
            error!("Analysis run failed: {e}");
        }
        self.context.finish();
        result
    }

    async fn run_inner(&self, source_text: &str) -> Result<String, AnalysisError> {
        let chunks = chunker::plan(source_text);
        if chunks.is_empty() {
            return Err(AnalysisError::EmptyInput);
        }
        let total = chunks.len();
        info!(chunk_count = total, source_len = source_text.len(), "Starting analysis run");

        let mut analyses: Vec<String> = Vec::with_capacity(total);
        for (i, chunk) in chunks.iter().enumerate() {
            let analysis = self.client.analyze(chunk).await?;

            // Defense in depth: the client already validated, but nothing
            // short of this ever enters the report.
            if analysis.len() < MIN_ANALYSIS_LENGTH {
                return Err(AnalysisError::InvalidAnalysis {
                    reason: format!("analysis for chunk {} is too short", i + 1),
                });
            }
            analyses.push(analysis);

            let pct = (((i + 1) as f64 / total as f64) * 100.0).round() as u8;
            self.context.set_progress(pct);
            info!(progress = pct, chunk = i + 1, total, "Chunk accepted");

            if i + 1 < total {
                let next_tokens = rate::estimate_tokens(chunks[i + 1].text.len());
                let wait_ms = rate::required_delay_ms(next_tokens);
                debug!(next_tokens, wait_ms, "Waiting before next chunk");
                tokio::time::sleep(Duration::from_millis(wait_ms)).await;
            }
        }

        if analyses.is_empty() {
            // Unreachable given the fail-fast loop above, kept as a guard.
            return Err(AnalysisError::NoAnalyses);
        }

        let combined = report::combine(&analyses);
        self.sink.store(&combined).await?;
        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ApiResponse, CompletionApi, CompletionRequest};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedApi {
        content: String,
    }

    #[async_trait]
    impl CompletionApi for FixedApi {
        async fn send(&self, _request: &CompletionRequest) -> Result<ApiResponse, AnalysisError> {
            let body = serde_json::json!({
                "choices": [{ "message": { "content": self.content } }]
            });
            Ok(ApiResponse {
                status: 200,
                status_text: "OK".to_string(),
                body: body.to_string(),
            })
        }
    }

    struct MemorySink {
        stored: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ReportSink for MemorySink {
        async fn store(&self, report: &str) -> Result<(), AnalysisError> {
            self.stored.lock().unwrap().push(report.to_string());
            Ok(())
        }
    }

    fn fixed_orchestrator(content: &str) -> AnalysisOrchestrator {
        AnalysisOrchestrator::new(
            AnalysisClient::with_api(
                Box::new(FixedApi {
                    content: content.to_string(),
                }),
                "test-model".to_string(),
            ),
            Box::new(MemorySink {
                stored: Mutex::new(Vec::new()),
            }),
        )
    }

    #[tokio::test]
    async fn test_empty_input_fails() {
        let orchestrator = fixed_orchestrator("unused");
        let err = orchestrator.run("   \n\n  ").await.unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyInput));
        assert_eq!(orchestrator.context().progress(), 0);
        assert!(!orchestrator.context().is_active());
    }

    #[tokio::test]
    async fn test_single_chunk_report() {
        let analysis = "m".repeat(150);
        let orchestrator = fixed_orchestrator(&analysis);
        let report = orchestrator.run("Hello\nWorld").await.unwrap();
        assert_eq!(
            report,
            format!("# Complete Relationship Analysis\n\n{analysis}")
        );
        assert_eq!(orchestrator.context().progress(), 0);
    }

    #[tokio::test]
    async fn test_short_analysis_rejected_by_orchestrator_guard() {
        // 100+ chars would pass the client validator; shrink the guard's
        // input by feeding a client whose validator was relaxed.
        let analysis = "n".repeat(60);
        let client = AnalysisClient::with_api(
            Box::new(FixedApi {
                content: analysis.clone(),
            }),
            "test-model".to_string(),
        )
        .with_validator(crate::client::ResponseValidator {
            min_length: 1,
            refusal_markers: vec![],
        });
        let orchestrator = AnalysisOrchestrator::new(
            client,
            Box::new(MemorySink {
                stored: Mutex::new(Vec::new()),
            }),
        );
        let err = orchestrator.run("Hello\nWorld").await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidAnalysis { .. }));
        assert_eq!(orchestrator.context().progress(), 0);
    }

    #[tokio::test]
    async fn test_second_concurrent_run_is_rejected() {
        let orchestrator = fixed_orchestrator(&"p".repeat(150));
        orchestrator.context().begin().unwrap();
        let err = orchestrator.run("Hello\nWorld").await.unwrap_err();
        assert!(matches!(err, AnalysisError::RunActive));
        orchestrator.context().finish();
        assert!(orchestrator.run("Hello\nWorld").await.is_ok());
    }
}
