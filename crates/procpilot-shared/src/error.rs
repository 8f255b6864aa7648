//! Error types for procpilot.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PilotError {
    #[error("Process manager error: {0}")]
    ProcessManager(String),

    #[error("Process '{0}' not found")]
    ProcessNotFound(String),

    #[error("AI provider is not configured")]
    AiNotConfigured,

    #[error("AI provider error: {0}")]
    Ai(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PilotError {
    /// Short machine-readable code, used in `--json` output.
    pub fn code(&self) -> &'static str {
        match self {
            PilotError::ProcessManager(_) => "process_manager",
            PilotError::ProcessNotFound(_) => "process_not_found",
            PilotError::AiNotConfigured => "ai_not_configured",
            PilotError::Ai(_) => "ai",
            PilotError::Config(_) => "config",
            PilotError::Io(_) => "io",
            PilotError::Json(_) => "json",
        }
    }
}

pub type Result<T> = std::result::Result<T, PilotError>;
