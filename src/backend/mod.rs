//! Search backend capability
//!
//! The narrow interface the retrieval planner and the ingestion pipeline use
//! to talk to the search service. Result rows are schema-shaped JSON maps so
//! both index shapes (whole documents and chunks) travel through the same
//! surface; the reconciler gives them structure again.

mod memory;
pub mod schema;

pub use memory::InMemorySearchBackend;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    /// The named index does not exist; a configuration error, never retried.
    #[error("Search index \"{0}\" does not exist")]
    UnknownIndex(String),

    /// The back end throttled the call; retryable by the caller.
    #[error("Search request was rate limited: {0}")]
    RateLimited(String),

    /// The call did not complete in time; retryable by the caller.
    #[error("Search request timed out: {0}")]
    Timeout(String),

    /// The request was malformed; retrying the same call cannot succeed.
    #[error("Invalid search request: {0}")]
    InvalidRequest(String),

    /// Any other back-end failure.
    #[error("Search service error: {0}")]
    Service(String),
}

impl BackendError {
    /// Whether the caller may retry the same call. The core itself never
    /// retries.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BackendError::RateLimited(_) | BackendError::Timeout(_)
        )
    }
}

/// Text query parsing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryKind {
    /// Plain keyword matching with simple syntax
    #[default]
    Simple,
    /// Full Lucene-like query syntax
    Full,
    /// Keyword matching followed by semantic re-ranking
    Semantic,
}

/// Vector component of a query
#[derive(Debug, Clone, PartialEq)]
pub enum VectorQuery {
    /// A pre-computed embedding for the query text
    Embedded {
        vector: Vec<f32>,
        nearest_neighbors: usize,
        fields: Vec<String>,
    },
    /// Raw text the back end vectorizes itself (integrated vectorization)
    Text {
        text: String,
        nearest_neighbors: usize,
        fields: Vec<String>,
    },
}

/// Options accompanying one search call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub kind: QueryKind,
    /// Semantic ranking configuration name; required when `kind` is semantic
    pub semantic_configuration: Option<String>,
    /// Request extractive answers (semantic mode only)
    pub extractive_answers: bool,
    /// Request extractive captions (semantic mode only)
    pub extractive_captions: bool,
    /// Fields to return on each row; empty means all
    pub select_fields: Vec<String>,
    /// Fields to compute hit highlights for
    pub highlight_fields: Vec<String>,
    pub highlight_pre_tag: Option<String>,
    pub highlight_post_tag: Option<String>,
    /// Vector component, present for the vector and hybrid modes
    pub vector: Option<VectorQuery>,
    /// Backend filter expression (`Field eq 'value'`)
    pub filter: Option<String>,
    /// Page size
    pub size: Option<usize>,
    /// Ask the back end for the total match count alongside the page
    pub include_total_count: bool,
}

/// One raw result row
#[derive(Debug, Clone, Default)]
pub struct BackendRow {
    pub score: Option<f64>,
    /// Field name to ordered highlighted fragments
    pub highlights: HashMap<String, Vec<String>>,
    /// Extractive captions attached to this row
    pub captions: Vec<RawCaption>,
    /// The selected fields of the row, keyed by schema field name
    pub document: Map<String, Value>,
}

/// A caption as returned by the back end: plain text plus an optional
/// highlighted rendition
#[derive(Debug, Clone, Default)]
pub struct RawCaption {
    pub text: Option<String>,
    pub highlights: Option<String>,
}

/// An extractive answer as returned by the back end, keyed to the index row
/// it was lifted from
#[derive(Debug, Clone)]
pub struct RawAnswer {
    pub key: String,
    pub text: Option<String>,
    pub highlights: Option<String>,
    pub score: Option<f64>,
}

/// Everything one search call produced
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub rows: Vec<BackendRow>,
    pub answers: Vec<RawAnswer>,
    pub captions: Vec<RawCaption>,
    pub total_count: Option<u64>,
}

/// Capability trait for search back ends
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Execute a query against an index. `query_text` is `None` for
    /// vector-only queries; an empty string matches every row (used by the
    /// ingestion drain loop together with a filter).
    async fn search(
        &self,
        index: &str,
        query_text: Option<&str>,
        options: &QueryOptions,
    ) -> Result<SearchOutcome, BackendError>;

    /// Delete the rows whose `key_field` value is in `keys`
    async fn delete(
        &self,
        index: &str,
        key_field: &str,
        keys: &[String],
    ) -> Result<(), BackendError>;

    /// Upsert rows into an index
    async fn upload(&self, index: &str, rows: &[Value]) -> Result<(), BackendError>;
}
