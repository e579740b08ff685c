//! Scenario comparison
//!
//! Runs a set of named request variants concurrently against the query entry
//! point and returns one labeled response per scenario. Scenarios are
//! isolated from each other: a failing or timed-out scenario carries its own
//! error while its siblings complete normally.

use super::{
    EngineType, QueryType, SearchHandler, SearchIndexKind, SearchRequest, SearchResponse,
};
use crate::config::Settings;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A named request variant for side-by-side comparison
#[derive(Debug, Clone)]
pub struct SearchScenario {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub request: SearchRequest,
}

pub struct ScenarioComparator {
    handler: Arc<SearchHandler>,
    scenario_timeout: Duration,
}

impl ScenarioComparator {
    pub fn new(handler: Arc<SearchHandler>, scenario_timeout: Duration) -> Self {
        Self {
            handler,
            scenario_timeout,
        }
    }

    /// Run every scenario against the shared query, concurrently, and wait
    /// for all of them. The responses come back in scenario order, each
    /// tagged with its scenario's label and description; a failed scenario
    /// contributes an error-bearing response without affecting the others.
    pub async fn run(&self, scenarios: &[SearchScenario], query: &str) -> Vec<SearchResponse> {
        debug!(
            scenarios = scenarios.len(),
            "Running scenario comparison"
        );
        let executions = scenarios.iter().map(|scenario| async move {
            let mut request = scenario.request.clone();
            request.query = query.to_string();
            let mut response = self.handler.handle(&request, self.scenario_timeout).await;
            response.display_name = Some(scenario.display_name.clone());
            response.description = Some(scenario.description.clone());
            if let Some(error) = &response.error {
                warn!(scenario = %scenario.id, "Scenario failed: {error}");
            }
            response
        });
        join_all(executions).await
    }
}

/// The built-in scenario set: every primary-search strategy plus the
/// chat-based ones, mirroring what the comparison surface offers out of the
/// box.
pub fn builtin_scenarios(settings: &Settings) -> Vec<SearchScenario> {
    let chat_request = |limit_to_data_source: bool| {
        let mut request = SearchRequest {
            engine: EngineType::GenerativeChat,
            system_role_information: Some(settings.generation.system_role_information.clone()),
            ..SearchRequest::default()
        };
        if limit_to_data_source {
            // Grounded chat always reads the chunks index with the strongest
            // retrieval mode.
            request.search_index = SearchIndexKind::Chunks;
            request.query_type = QueryType::HybridSemantic;
            request.limit_to_data_source = true;
        }
        request
    };
    let primary_request = |search_index: SearchIndexKind, query_type: QueryType| SearchRequest {
        search_index,
        query_type,
        ..SearchRequest::default()
    };

    let orchestration_request = SearchRequest {
        engine: EngineType::CustomOrchestration,
        search_index: SearchIndexKind::Chunks,
        query_type: QueryType::HybridSemantic,
        custom_orchestration_prompt: Some(settings.generation.custom_orchestration_prompt.clone()),
        ..SearchRequest::default()
    };

    vec![
        SearchScenario {
            id: "documents-keyword-standard".to_string(),
            display_name: "Documents - Keyword - Standard".to_string(),
            description: "Keyword search across the original documents using the standard \
                ('simple') search mode."
                .to_string(),
            request: primary_request(SearchIndexKind::Documents, QueryType::TextStandard),
        },
        SearchScenario {
            id: "documents-keyword-semantic".to_string(),
            display_name: "Documents - Keyword - Semantic".to_string(),
            description: "Keyword search across the original documents with semantic ranking, \
                which re-ranks an initial result set using language understanding."
                .to_string(),
            request: primary_request(SearchIndexKind::Documents, QueryType::TextSemantic),
        },
        SearchScenario {
            id: "chunks-keyword-standard".to_string(),
            display_name: "Chunks - Keyword - Standard".to_string(),
            description: "Keyword search across the smaller chunks of the original documents \
                using the standard ('simple') search mode."
                .to_string(),
            request: primary_request(SearchIndexKind::Chunks, QueryType::TextStandard),
        },
        SearchScenario {
            id: "chunks-keyword-semantic".to_string(),
            display_name: "Chunks - Keyword - Semantic".to_string(),
            description: "Keyword search across the smaller chunks of the original documents \
                with semantic ranking."
                .to_string(),
            request: primary_request(SearchIndexKind::Chunks, QueryType::TextSemantic),
        },
        SearchScenario {
            id: "chunks-vector".to_string(),
            display_name: "Chunks - Vector".to_string(),
            description: "Pure vector search across the chunks: the query is embedded and the \
                best matches are the chunks whose vectors lie closest to the query vector."
                .to_string(),
            request: primary_request(SearchIndexKind::Chunks, QueryType::Vector),
        },
        SearchScenario {
            id: "chunks-hybrid-semantic".to_string(),
            display_name: "Chunks - Hybrid - Semantic".to_string(),
            description: "Hybrid (keyword + vector) search across the chunks, with the merged \
                results re-ranked semantically."
                .to_string(),
            request: primary_request(SearchIndexKind::Chunks, QueryType::HybridSemantic),
        },
        SearchScenario {
            id: "chat".to_string(),
            display_name: "Generative Chat".to_string(),
            description: "A chat model answering from its training data alone, with no access \
                to the corpus."
                .to_string(),
            request: chat_request(false),
        },
        SearchScenario {
            id: "chat-on-your-data".to_string(),
            display_name: "Generative Chat - On Your Data".to_string(),
            description: "A chat model grounded in the corpus: the query first runs a hybrid \
                semantic search over the chunks and the top results feed the model's answer."
                .to_string(),
            request: chat_request(true),
        },
        SearchScenario {
            id: "custom-orchestration-chunks-hybrid-semantic".to_string(),
            display_name: "Custom Orchestration - Chunks - Hybrid - Semantic".to_string(),
            description: "A hybrid semantic search over the chunks whose results are assembled \
                into a prompt for an AI model to answer with citations."
                .to_string(),
            request: orchestration_request,
        },
    ]
}
