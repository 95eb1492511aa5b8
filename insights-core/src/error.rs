use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::llm::ModelError;

#[derive(Error, Debug)]
pub enum InsightsError {
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("file must be a zip file: {}", path.display())]
    NotZipFile { path: PathBuf },

    #[error("conversations.json not found in archive {}", path.display())]
    MissingConversations { path: PathBuf },

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("{stage} timed out after {elapsed:?}")]
    Timeout { stage: String, elapsed: Duration },

    #[error("Render error: {0}")]
    Render(String),
}

pub type Result<T, E = InsightsError> = std::result::Result<T, E>;
