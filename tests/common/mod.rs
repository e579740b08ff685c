//! Shared helpers for the integration tests

use async_trait::async_trait;
use querylab::embedding::{EmbeddingError, EmbeddingProvider};

/// Deterministic embedding stand-in: the text's bytes hash into a fixed-size
/// vector, so identical text always embeds identically and similar text lands
/// nearby. Replaces the real gateway so tests need no model or network.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput("empty text".to_string()));
        }
        let mut vector = vec![0.0f32; self.dimension];
        for (position, byte) in text.bytes().enumerate() {
            vector[(byte as usize + position) % self.dimension] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
