//! Retrieval orchestration
//!
//! This module implements the query side of the engine: the request/response
//! models shared by every query mode, the planner that translates one
//! abstract request into concrete backend parameters, the reconciler that
//! normalizes heterogeneous result shapes, the never-throws entry point, and
//! the comparator that runs labeled scenarios side by side.

mod comparator;
mod handler;
mod planner;
mod reconcile;

pub use comparator::{builtin_scenarios, ScenarioComparator, SearchScenario};
pub use handler::{QueryEngine, SearchHandler};
pub use planner::{
    PlannedVector, QueryPlan, RetrievalPlanner, VectorizationMode, DEFAULT_VECTOR_NEIGHBORS,
};
pub use reconcile::{reconcile, ReconciledResults};

use crate::backend::BackendError;
use crate::embedding::EmbeddingError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    /// The request named an index this deployment does not know; the result
    /// shape cannot be inferred, so the planner refuses to guess.
    #[error("Search index \"{0}\" is not supported")]
    UnsupportedIndex(String),

    #[error("Query text must not be empty")]
    EmptyQuery,

    /// The request targets an engine no implementation was registered for.
    #[error("No engine is registered for {0:?}")]
    EngineUnavailable(EngineType),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl SearchError {
    /// Whether the caller may retry the same call
    pub fn is_transient(&self) -> bool {
        match self {
            SearchError::Embedding(e) => e.is_transient(),
            SearchError::Backend(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Which engine answers the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EngineType {
    /// The built-in planner/reconciler pipeline
    #[default]
    PrimarySearch,
    /// Chat completion over the corpus (external engine)
    GenerativeChat,
    /// Search-then-prompt orchestration (external engine)
    CustomOrchestration,
}

/// Which index shape the query runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SearchIndexKind {
    /// Whole documents
    #[default]
    Documents,
    /// Chunk-level rows
    Chunks,
}

/// The five query modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QueryType {
    /// Plain keyword query
    #[default]
    TextStandard,
    /// Keyword query with semantic re-ranking and extractive answers
    TextSemantic,
    /// Vector-only query; no text is sent to the back end
    Vector,
    /// Keyword and vector scoring blended by the back end
    HybridStandard,
    /// Hybrid scoring plus semantic re-ranking
    HybridSemantic,
}

/// Text query syntax; only consulted for the non-semantic modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QuerySyntax {
    #[default]
    Simple,
    Lucene,
}

/// Generation parameters forwarded to chat-style engines
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParameters {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
    pub stop_sequences: Vec<String>,
    pub strictness: Option<u32>,
    pub document_count: Option<u32>,
}

/// One abstract search request, covering every engine and query mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub id: String,
    pub query: String,
    /// Prior conversation turns, oldest first
    pub history: Vec<String>,
    pub engine: EngineType,
    pub search_index: SearchIndexKind,
    /// Explicit index name; must match a configured index when set
    pub search_index_name: Option<String>,
    pub query_type: QueryType,
    pub query_syntax: QuerySyntax,
    /// Let the back end vectorize the query text itself instead of calling
    /// the embedding gateway
    pub use_integrated_vectorization: bool,
    /// Neighbor count for the vector component; defaults to 50 at the
    /// planner boundary
    pub vector_nearest_neighbors_count: Option<usize>,
    /// Restrict chat-style engines to the corpus
    pub limit_to_data_source: bool,
    pub system_role_information: Option<String>,
    pub custom_orchestration_prompt: Option<String>,
    pub generation: GenerationParameters,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            query: String::new(),
            history: Vec::new(),
            engine: EngineType::default(),
            search_index: SearchIndexKind::default(),
            search_index_name: None,
            query_type: QueryType::default(),
            query_syntax: QuerySyntax::default(),
            use_integrated_vectorization: false,
            vector_nearest_neighbors_count: None,
            limit_to_data_source: false,
            system_role_information: None,
            custom_orchestration_prompt: None,
            generation: GenerationParameters::default(),
        }
    }
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// True for the modes that send a vector component to the back end
    pub fn is_vector_search(&self) -> bool {
        matches!(
            self.query_type,
            QueryType::Vector | QueryType::HybridStandard | QueryType::HybridSemantic
        )
    }

    /// True for the modes with semantic re-ranking
    pub fn is_semantic_search(&self) -> bool {
        matches!(
            self.query_type,
            QueryType::TextSemantic | QueryType::HybridSemantic
        )
    }
}

/// One normalized result row, regardless of index shape or query mode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub search_index_name: String,
    /// Row id in whichever index was queried
    pub search_index_key: Option<String>,
    pub document_id: Option<String>,
    pub document_title: Option<String>,
    /// Position of the chunk within its document (chunks index only)
    pub chunk_index: Option<i64>,
    pub score: Option<f64>,
    /// Field name to ordered highlighted fragments
    pub highlights: HashMap<String, Vec<String>>,
    pub captions: Vec<String>,
}

/// An extractive answer, re-associated with its owning document during
/// reconciliation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchAnswer {
    pub search_index_name: String,
    pub search_index_key: String,
    /// Filled in during reconciliation when a returned row matches the key;
    /// stays `None` otherwise
    pub document_id: Option<String>,
    pub document_title: Option<String>,
    pub score: Option<f64>,
    pub text: Option<String>,
}

/// The unified response shape every engine produces
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub request_id: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub error: Option<String>,
    pub answers: Vec<SearchAnswer>,
    pub captions: Vec<String>,
    pub search_results: Vec<SearchResult>,
}

impl SearchResponse {
    pub fn new(request: &SearchRequest) -> Self {
        Self {
            request_id: request.id.clone(),
            ..Self::default()
        }
    }

    /// An error-bearing response for the same request
    pub fn for_error(request: &SearchRequest, error: impl Into<String>) -> Self {
        Self {
            request_id: request.id.clone(),
            error: Some(error.into()),
            ..Self::default()
        }
    }
}
