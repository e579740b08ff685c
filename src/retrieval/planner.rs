//! Retrieval planner
//!
//! Translates one abstract search request into concrete backend parameters.
//! Planning is split from execution: `plan` is a pure decision over the two
//! axes (index shape, query mode) plus the defaulting rules, and `execute`
//! performs the I/O. The embedding call for vector modes always completes
//! before the backend query it feeds.

use super::reconcile::reconcile;
use super::{
    QuerySyntax, QueryType, SearchError, SearchIndexKind, SearchRequest, SearchResponse,
};
use crate::backend::schema::{chunk_fields, document_fields};
use crate::backend::{QueryKind, QueryOptions, SearchBackend, SearchOutcome, VectorQuery};
use crate::config::SearchSettings;
use crate::embedding::EmbeddingProvider;
use std::sync::Arc;
use tracing::debug;

/// Neighbor count used when the request does not specify one
pub const DEFAULT_VECTOR_NEIGHBORS: usize = 50;

/// How the query text becomes a vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorizationMode {
    /// Call the embedding gateway, then send the vector
    Gateway,
    /// Forward the raw text for the back end to vectorize
    Integrated,
}

/// The vector component of a plan, before any embedding has happened
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedVector {
    pub mode: VectorizationMode,
    pub nearest_neighbors: usize,
    pub fields: Vec<String>,
    /// The text to vectorize
    pub text: String,
}

/// Everything `execute` needs, decided up front
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub index_name: String,
    pub index_kind: SearchIndexKind,
    pub query_type: QueryType,
    /// Text sent to the back end; `None` for vector-only queries
    pub search_text: Option<String>,
    pub options: QueryOptions,
    pub vectorization: Option<PlannedVector>,
}

pub struct RetrievalPlanner {
    backend: Arc<dyn SearchBackend>,
    embedder: Arc<dyn EmbeddingProvider>,
    settings: SearchSettings,
}

impl RetrievalPlanner {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        embedder: Arc<dyn EmbeddingProvider>,
        settings: SearchSettings,
    ) -> Self {
        Self {
            backend,
            embedder,
            settings,
        }
    }

    /// Decide index, query kind, field lists and vectorization for a request.
    ///
    /// An explicit index name that matches neither configured index is a
    /// fatal configuration error: the result shape could not be inferred, so
    /// the planner refuses to continue.
    pub fn plan(&self, request: &SearchRequest) -> Result<QueryPlan, SearchError> {
        let (index_name, index_kind) = self.resolve_index(request)?;

        let semantic = request.is_semantic_search();
        let vector_only = request.query_type == QueryType::Vector;

        let mut options = QueryOptions {
            // The syntax choice only exists below semantic mode.
            kind: if semantic {
                QueryKind::Semantic
            } else {
                match request.query_syntax {
                    QuerySyntax::Simple => QueryKind::Simple,
                    QuerySyntax::Lucene => QueryKind::Full,
                }
            },
            highlight_pre_tag: Some(self.settings.highlight_pre_tag.clone()),
            highlight_post_tag: Some(self.settings.highlight_post_tag.clone()),
            ..QueryOptions::default()
        };

        if semantic {
            options.semantic_configuration = Some(self.settings.semantic_configuration.clone());
            options.extractive_answers = true;
            options.extractive_captions = true;
        }

        match index_kind {
            SearchIndexKind::Documents => {
                options.select_fields = vec![
                    document_fields::ID.to_string(),
                    document_fields::TITLE.to_string(),
                    document_fields::FILE_PATH.to_string(),
                ];
            }
            SearchIndexKind::Chunks => {
                options.select_fields = vec![
                    chunk_fields::ID.to_string(),
                    chunk_fields::SOURCE_DOCUMENT_ID.to_string(),
                    chunk_fields::SOURCE_DOCUMENT_TITLE.to_string(),
                    chunk_fields::CONTENT.to_string(),
                    chunk_fields::CHUNK_INDEX.to_string(),
                ];
            }
        }
        // A pure vector query returns no meaningful text-match highlights and
        // the back end rejects the request outright; the reconciler
        // substitutes chunk content as a caption instead.
        if !vector_only {
            options.highlight_fields = match index_kind {
                SearchIndexKind::Documents => vec![document_fields::CONTENT.to_string()],
                SearchIndexKind::Chunks => vec![chunk_fields::CONTENT.to_string()],
            };
        }

        let vectorization = if request.is_vector_search() {
            Some(PlannedVector {
                mode: if request.use_integrated_vectorization {
                    VectorizationMode::Integrated
                } else {
                    VectorizationMode::Gateway
                },
                nearest_neighbors: request
                    .vector_nearest_neighbors_count
                    .unwrap_or(DEFAULT_VECTOR_NEIGHBORS),
                fields: vec![chunk_fields::CONTENT_VECTOR.to_string()],
                text: request.query.clone(),
            })
        } else {
            None
        };

        let search_text = if vector_only {
            None
        } else {
            Some(request.query.clone())
        };

        Ok(QueryPlan {
            index_name,
            index_kind,
            query_type: request.query_type,
            search_text,
            options,
            vectorization,
        })
    }

    /// Run a plan against the back end, vectorizing first when planned.
    pub async fn execute(&self, plan: &QueryPlan) -> Result<SearchOutcome, SearchError> {
        let mut options = plan.options.clone();
        if let Some(planned) = &plan.vectorization {
            options.vector = Some(match planned.mode {
                VectorizationMode::Integrated => VectorQuery::Text {
                    text: planned.text.clone(),
                    nearest_neighbors: planned.nearest_neighbors,
                    fields: planned.fields.clone(),
                },
                VectorizationMode::Gateway => {
                    debug!("Generating query embedding");
                    let vector = self.embedder.embed(&planned.text).await?;
                    VectorQuery::Embedded {
                        vector,
                        nearest_neighbors: planned.nearest_neighbors,
                        fields: planned.fields.clone(),
                    }
                }
            });
        }

        debug!(
            index = %plan.index_name,
            query_type = ?plan.query_type,
            "Executing search"
        );
        let outcome = self
            .backend
            .search(&plan.index_name, plan.search_text.as_deref(), &options)
            .await?;
        Ok(outcome)
    }

    /// Plan, execute and reconcile one request into a unified response.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        let plan = self.plan(request)?;
        let outcome = self.execute(&plan).await?;

        let mut response = SearchResponse::new(request);
        let reconciled = reconcile(plan.index_kind, plan.query_type, &plan.index_name, outcome);
        response.answers = reconciled.answers;
        response.captions = reconciled.captions;
        response.search_results = reconciled.search_results;
        debug!(
            results = response.search_results.len(),
            answers = response.answers.len(),
            "Search complete"
        );
        Ok(response)
    }

    fn resolve_index(
        &self,
        request: &SearchRequest,
    ) -> Result<(String, SearchIndexKind), SearchError> {
        match &request.search_index_name {
            Some(name) if *name == self.settings.documents_index => {
                Ok((name.clone(), SearchIndexKind::Documents))
            }
            Some(name) if *name == self.settings.chunks_index => {
                Ok((name.clone(), SearchIndexKind::Chunks))
            }
            Some(name) => Err(SearchError::UnsupportedIndex(name.clone())),
            None => match request.search_index {
                SearchIndexKind::Documents => {
                    Ok((self.settings.documents_index.clone(), SearchIndexKind::Documents))
                }
                SearchIndexKind::Chunks => {
                    Ok((self.settings.chunks_index.clone(), SearchIndexKind::Chunks))
                }
            },
        }
    }
}
