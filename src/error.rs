use std::path::PathBuf;
use thiserror::Error;

use crate::backend::BackendError;
use crate::chunking::ChunkError;
use crate::embedding::EmbeddingError;
use crate::ingest::IngestError;
use crate::retrieval::SearchError;

/// Main error type for the Querylab library
#[derive(Error, Debug)]
pub enum QuerylabError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Chunking errors
    #[error(transparent)]
    Chunking(#[from] ChunkError),

    /// Embedding gateway errors
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    /// Search backend errors
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Query planning and execution errors
    #[error(transparent)]
    Search(#[from] SearchError),

    /// Ingestion pipeline errors
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for Querylab operations
pub type Result<T> = std::result::Result<T, QuerylabError>;
