// src/error.rs
use thiserror::Error;

/// Result type for analysis operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Error types for a chat analysis run.
///
/// Every variant aborts the run it occurred in; throttling that is
/// recovered within the retry budget never surfaces here.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Nothing to analyze: the document contains no non-empty lines")]
    EmptyInput,

    #[error("An analysis run is already in progress")]
    RunActive,

    #[error("Rate limited by the API after {attempts} attempts: {status_text} - {body}")]
    RetriesExhausted {
        attempts: u32,
        status_text: String,
        body: String,
    },

    #[error("API Error: {status_text} - {body}")]
    RemoteApi {
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("Received invalid analysis from the model: {reason}")]
    InvalidAnalysis { reason: String },

    #[error("No valid analyses were generated")]
    NoAnalyses,

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
