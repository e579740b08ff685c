//! Result reconciliation
//!
//! Normalizes raw backend rows, answers and captions into the unified
//! response shape regardless of which index shape or query mode produced
//! them, and re-associates extractive answers with their owning document.
//! Backend ordering is already score-ranked and is preserved as-is.

use super::{QueryType, SearchAnswer, SearchIndexKind, SearchResult};
use crate::backend::schema::{chunk_fields, document_fields};
use crate::backend::{RawCaption, SearchOutcome};
use serde_json::{Map, Value};

/// The response fragments produced from one backend outcome
#[derive(Debug, Clone, Default)]
pub struct ReconciledResults {
    pub answers: Vec<SearchAnswer>,
    pub captions: Vec<String>,
    pub search_results: Vec<SearchResult>,
}

/// Normalize one backend outcome.
///
/// Answers arrive keyed by the index row they were lifted from; for
/// chunk-level search that row id is not the document id, so once the result
/// rows are built every answer whose key matches a row is stamped with that
/// row's document identity. Answers whose row was not among the returned
/// top-K keep a `None` identity and are never defaulted to an arbitrary
/// row.
pub fn reconcile(
    index_kind: SearchIndexKind,
    query_type: QueryType,
    index_name: &str,
    outcome: SearchOutcome,
) -> ReconciledResults {
    let vector_only = query_type == QueryType::Vector;

    let mut answers: Vec<SearchAnswer> = outcome
        .answers
        .into_iter()
        .map(|answer| SearchAnswer {
            search_index_name: index_name.to_string(),
            search_index_key: answer.key,
            document_id: None,
            document_title: None,
            score: answer.score,
            text: effective_text(&RawCaption {
                text: answer.text,
                highlights: answer.highlights,
            }),
        })
        .collect();

    let captions: Vec<String> = outcome
        .captions
        .iter()
        .filter_map(effective_text)
        .collect();

    let mut search_results = Vec::with_capacity(outcome.rows.len());
    for row in outcome.rows {
        let mut result = SearchResult {
            search_index_name: index_name.to_string(),
            score: row.score,
            highlights: row.highlights,
            captions: row.captions.iter().filter_map(effective_text).collect(),
            ..SearchResult::default()
        };

        match index_kind {
            SearchIndexKind::Documents => {
                let id = get_string(&row.document, document_fields::ID);
                result.search_index_key = id.clone();
                result.document_id = id;
                result.document_title = get_string(&row.document, document_fields::TITLE);
            }
            SearchIndexKind::Chunks => {
                result.search_index_key = get_string(&row.document, chunk_fields::ID);
                result.document_id = get_string(&row.document, chunk_fields::SOURCE_DOCUMENT_ID);
                result.document_title =
                    get_string(&row.document, chunk_fields::SOURCE_DOCUMENT_TITLE);
                result.chunk_index = row
                    .document
                    .get(chunk_fields::CHUNK_INDEX)
                    .and_then(Value::as_i64);

                // No highlights exist for a pure vector query; surface the
                // chunk content itself so the match is still inspectable.
                if vector_only {
                    if let Some(content) =
                        get_string(&row.document, chunk_fields::CONTENT)
                            .filter(|c| !c.trim().is_empty())
                    {
                        result.captions.push(content);
                    }
                }
            }
        }

        // Answers may refer to chunk ids; map them to the owning document.
        if let Some(key) = &result.search_index_key {
            for answer in answers
                .iter_mut()
                .filter(|answer| answer.search_index_key == *key)
            {
                answer.document_id = result.document_id.clone();
                answer.document_title = result.document_title.clone();
            }
        }

        search_results.push(result);
    }

    ReconciledResults {
        answers,
        captions,
        search_results,
    }
}

/// A caption or answer renders its highlighted form when present and
/// non-blank, its plain text otherwise.
fn effective_text(caption: &RawCaption) -> Option<String> {
    match &caption.highlights {
        Some(highlights) if !highlights.trim().is_empty() => Some(highlights.clone()),
        _ => caption.text.clone(),
    }
}

fn get_string(document: &Map<String, Value>, field: &str) -> Option<String> {
    document
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
}
