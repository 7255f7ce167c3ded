// src/config.rs
use std::env;

use crate::error::AnalysisError;

pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "deepseek-r1-distill-llama-70b";

/// Deployment configuration for the remote completion endpoint.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    /// Where the finished report is stored ("last analysis result" slot).
    pub result_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AnalysisError> {
        dotenvy::dotenv().ok();
        let api_key = env::var("GROQ_API_KEY")
            .map_err(|_| AnalysisError::Config("GROQ_API_KEY is not set".to_string()))?;
        let api_url =
            env::var("GROQ_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let model = env::var("GROQ_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let result_path = env::var("ANALYSIS_RESULT_PATH")
            .unwrap_or_else(|_| "analysis_result.md".to_string());
        Ok(Self {
            api_url,
            api_key,
            model,
            result_path,
        })
    }
}
