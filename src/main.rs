// src/main.rs
use std::process::ExitCode;

use chatlens::config::Config;
use chatlens::orchestrator::AnalysisOrchestrator;
use tracing_subscriber;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("Usage: chatlens <chat-export.txt>");
        return ExitCode::from(2);
    };

    let source = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Failed to read {path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let orchestrator = AnalysisOrchestrator::from_config(&config);
    match orchestrator.run(&source).await {
        Ok(report) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Analysis error: {e}");
            ExitCode::FAILURE
        }
    }
}
