//! Embedding gateway
//!
//! A thin capability interface over an external embedding back end: given a
//! text, return a fixed-length numeric vector. Consumed by chunk ingestion
//! and by query planning for the vector search modes. Implementations live
//! outside this crate (the tests use a deterministic stand-in).

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// The back end throttled the call; retryable by the caller.
    #[error("Embedding request was rate limited: {0}")]
    RateLimited(String),

    /// The call did not complete in time; retryable by the caller.
    #[error("Embedding request timed out: {0}")]
    Timeout(String),

    /// The input was rejected; retrying the same call cannot succeed.
    #[error("Invalid embedding input: {0}")]
    InvalidInput(String),

    /// The back end returned a vector of the wrong size.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Any other back-end failure.
    #[error("Embedding generation failed: {0}")]
    Generation(String),
}

impl EmbeddingError {
    /// Whether the caller may retry the same call.
    ///
    /// The core itself never retries; it only surfaces the distinction
    /// (see the error handling design).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EmbeddingError::RateLimited(_) | EmbeddingError::Timeout(_)
        )
    }
}

/// Capability trait for embedding back ends
///
/// Single text in, single vector out. Implementations may batch internally as
/// long as result ordering matches input ordering.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// The fixed length of every vector this provider returns
    fn dimension(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(EmbeddingError::RateLimited("429".into()).is_transient());
        assert!(EmbeddingError::Timeout("deadline".into()).is_transient());
        assert!(!EmbeddingError::InvalidInput("empty".into()).is_transient());
        assert!(!EmbeddingError::Generation("boom".into()).is_transient());
        assert!(!EmbeddingError::DimensionMismatch {
            expected: 1536,
            actual: 3
        }
        .is_transient());
    }
}
