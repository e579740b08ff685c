//! Query entry point
//!
//! One invocation boundary for every engine. Failures never cross it: every
//! error, including a missed deadline, becomes an error-bearing response
//! for the same request.

use super::{EngineType, RetrievalPlanner, SearchError, SearchRequest, SearchResponse};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

/// A pluggable engine that answers a search request end to end.
///
/// The primary planner/reconciler pipeline is built in; chat-completion and
/// custom-orchestration engines consume the same unified response shape and
/// plug in here.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    async fn run(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError>;
}

pub struct SearchHandler {
    planner: Arc<RetrievalPlanner>,
    chat_engine: Option<Arc<dyn QueryEngine>>,
    orchestration_engine: Option<Arc<dyn QueryEngine>>,
}

impl SearchHandler {
    pub fn new(planner: Arc<RetrievalPlanner>) -> Self {
        Self {
            planner,
            chat_engine: None,
            orchestration_engine: None,
        }
    }

    /// Register the engine answering `EngineType::GenerativeChat` requests
    pub fn with_chat_engine(mut self, engine: Arc<dyn QueryEngine>) -> Self {
        self.chat_engine = Some(engine);
        self
    }

    /// Register the engine answering `EngineType::CustomOrchestration`
    /// requests
    pub fn with_orchestration_engine(mut self, engine: Arc<dyn QueryEngine>) -> Self {
        self.orchestration_engine = Some(engine);
        self
    }

    /// Handle one request within a deadline.
    ///
    /// Never fails: a planner, embedding or backend error, or running past
    /// the deadline, yields a response carrying the error message instead.
    pub async fn handle(&self, request: &SearchRequest, deadline: Duration) -> SearchResponse {
        match timeout(deadline, self.dispatch(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(error)) => {
                warn!(request_id = %request.id, "Search request failed: {error}");
                SearchResponse::for_error(request, error.to_string())
            }
            Err(_) => {
                warn!(
                    request_id = %request.id,
                    "Search request timed out after {deadline:?}"
                );
                SearchResponse::for_error(
                    request,
                    format!("Search timed out after {} seconds", deadline.as_secs()),
                )
            }
        }
    }

    async fn dispatch(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        if request.query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        match request.engine {
            EngineType::PrimarySearch => self.planner.search(request).await,
            EngineType::GenerativeChat => match &self.chat_engine {
                Some(engine) => engine.run(request).await,
                None => Err(SearchError::EngineUnavailable(EngineType::GenerativeChat)),
            },
            EngineType::CustomOrchestration => match &self.orchestration_engine {
                Some(engine) => engine.run(request).await,
                None => Err(SearchError::EngineUnavailable(
                    EngineType::CustomOrchestration,
                )),
            },
        }
    }
}
