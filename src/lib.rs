pub mod config;
pub mod error;
pub mod chunker;
pub mod rate;
pub mod prompt;
pub mod client;
pub mod report;
pub mod orchestrator;
pub use error::{AnalysisError, AnalysisResult};
pub use orchestrator::AnalysisOrchestrator;
