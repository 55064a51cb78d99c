use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the RAG engine
#[derive(Error, Debug)]
pub enum RagError {
    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Knowledge artifact missing; the offline build has not been run
    #[error("Knowledge base not found at {}. Build it first.", .0.display())]
    KnowledgeNotFound(PathBuf),

    /// Malformed knowledge or embedding artifact
    #[error("Parse error: {0}")]
    Parse(String),

    /// Upstream embedding or completion call failed
    #[error("Provider error{}: {message}", .status.map(|s| format!(" {}", s)).unwrap_or_default())]
    Provider {
        status: Option<u16>,
        message: String,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RagError {
    /// Provider failure that never produced an HTTP status (network, timeout, decode)
    pub fn provider(message: impl Into<String>) -> Self {
        RagError::Provider {
            status: None,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for RagError {
    fn from(e: serde_json::Error) -> Self {
        RagError::Parse(e.to_string())
    }
}

/// Convenient Result type using RagError
pub type Result<T> = std::result::Result<T, RagError>;
