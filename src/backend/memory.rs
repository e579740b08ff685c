//! In-memory search backend
//!
//! A reference `SearchBackend` used by the integration tests and for local
//! experimentation. Rows live in process memory and are keyed by their `Id`
//! field. Keyword scoring is case-insensitive term matching, vector scoring
//! is cosine similarity, and semantic mode synthesizes extractive answers
//! and captions from the top-ranked rows so the reconciliation path can be
//! exercised without a real service. Integrated vectorization is
//! approximated by term matching on the raw query text.

use super::{
    BackendError, BackendRow, QueryKind, QueryOptions, RawAnswer, RawCaption, SearchBackend,
    SearchOutcome, VectorQuery,
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;

const KEY_FIELD: &str = "Id";
const ANSWER_COUNT: usize = 3;
const CAPTION_CHARS: usize = 160;

pub struct InMemorySearchBackend {
    indexes: RwLock<HashMap<String, Vec<Map<String, Value>>>>,
}

impl InMemorySearchBackend {
    /// Create a backend with the given (empty) indexes. Searching, deleting
    /// from or uploading to any other index name fails with `UnknownIndex`.
    pub fn new<I, S>(index_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let indexes = index_names
            .into_iter()
            .map(|name| (name.into(), Vec::new()))
            .collect();
        Self {
            indexes: RwLock::new(indexes),
        }
    }

    /// Number of rows currently stored in an index
    pub async fn row_count(&self, index: &str) -> usize {
        self.indexes
            .read()
            .await
            .get(index)
            .map(|rows| rows.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl SearchBackend for InMemorySearchBackend {
    async fn search(
        &self,
        index: &str,
        query_text: Option<&str>,
        options: &QueryOptions,
    ) -> Result<SearchOutcome, BackendError> {
        if options.kind == QueryKind::Semantic && options.semantic_configuration.is_none() {
            return Err(BackendError::InvalidRequest(
                "Semantic queries require a semantic configuration".to_string(),
            ));
        }
        if query_text.is_none() && !options.highlight_fields.is_empty() {
            return Err(BackendError::InvalidRequest(
                "Hit highlighting requires a text query".to_string(),
            ));
        }

        let indexes = self.indexes.read().await;
        let rows = indexes
            .get(index)
            .ok_or_else(|| BackendError::UnknownIndex(index.to_string()))?;

        let filter = options.filter.as_deref().map(parse_filter).transpose()?;
        let candidates: Vec<&Map<String, Value>> = rows
            .iter()
            .filter(|row| match &filter {
                Some((field, value)) => get_string(row, field) == Some(value.as_str()),
                None => true,
            })
            .collect();

        // Tokenized text component; `Some("")` (the drain loop) matches all.
        let terms: Option<Vec<String>> = query_text.map(|text| {
            text.split_whitespace()
                .map(|t| t.to_ascii_lowercase())
                .collect()
        });

        let mut scored: Vec<(f64, &Map<String, Value>)> = Vec::new();
        for row in candidates {
            let mut score = 0.0;
            let mut matched = false;

            if let Some(terms) = &terms {
                if terms.is_empty() {
                    score += 1.0;
                    matched = true;
                } else {
                    let text_score = row_term_score(row, terms);
                    if text_score > 0.0 {
                        score += text_score;
                        matched = true;
                    }
                }
            }

            match &options.vector {
                Some(VectorQuery::Embedded { vector, fields, .. }) => {
                    if let Some(row_vector) = fields.first().and_then(|f| get_vector(row, f)) {
                        score += cosine(vector, &row_vector);
                        matched = true;
                    }
                }
                Some(VectorQuery::Text { text, .. }) => {
                    let query_terms: Vec<String> = text
                        .split_whitespace()
                        .map(|t| t.to_ascii_lowercase())
                        .collect();
                    let text_score = row_term_score(row, &query_terms);
                    if text_score > 0.0 {
                        score += text_score;
                        matched = true;
                    }
                }
                None => {}
            }

            if matched {
                scored.push((score, row));
            }
        }

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        // A pure vector query returns at most the requested neighbor count.
        if terms.is_none() {
            if let Some(
                VectorQuery::Embedded {
                    nearest_neighbors, ..
                }
                | VectorQuery::Text {
                    nearest_neighbors, ..
                },
            ) = &options.vector
            {
                scored.truncate(*nearest_neighbors);
            }
        }

        let total_count = scored.len() as u64;
        if let Some(size) = options.size {
            scored.truncate(size);
        }

        let semantic = options.kind == QueryKind::Semantic;
        let mut answers = Vec::new();
        let mut captions = Vec::new();
        if semantic && options.extractive_answers {
            for (score, row) in scored.iter().take(ANSWER_COUNT) {
                let source = get_string(row, "Content").or_else(|| get_string(row, "Title"));
                if let (Some(key), Some(text)) = (get_string(row, KEY_FIELD), source) {
                    let answer_text = snippet(text);
                    answers.push(RawAnswer {
                        key: key.to_string(),
                        text: Some(answer_text.clone()),
                        highlights: None,
                        score: Some(*score),
                    });
                    captions.push(RawCaption {
                        text: Some(answer_text),
                        highlights: None,
                    });
                }
            }
        }

        let pre_tag = options.highlight_pre_tag.as_deref().unwrap_or("");
        let post_tag = options.highlight_post_tag.as_deref().unwrap_or("");
        let out_rows = scored
            .into_iter()
            .map(|(score, row)| {
                let mut highlights = HashMap::new();
                if let Some(terms) = terms.as_deref().filter(|t| !t.is_empty()) {
                    for field in &options.highlight_fields {
                        if let Some(text) = get_string(row, field) {
                            if let Some(fragment) = highlight(text, terms, pre_tag, post_tag) {
                                highlights.insert(field.clone(), vec![fragment]);
                            }
                        }
                    }
                }

                let mut row_captions = Vec::new();
                if semantic && options.extractive_captions {
                    if let Some(content) = get_string(row, "Content") {
                        row_captions.push(RawCaption {
                            text: Some(snippet(content)),
                            highlights: None,
                        });
                    }
                }

                BackendRow {
                    score: Some(score),
                    highlights,
                    captions: row_captions,
                    document: project(row, &options.select_fields),
                }
            })
            .collect();

        Ok(SearchOutcome {
            rows: out_rows,
            answers,
            captions,
            total_count: options.include_total_count.then_some(total_count),
        })
    }

    async fn delete(
        &self,
        index: &str,
        key_field: &str,
        keys: &[String],
    ) -> Result<(), BackendError> {
        let mut indexes = self.indexes.write().await;
        let rows = indexes
            .get_mut(index)
            .ok_or_else(|| BackendError::UnknownIndex(index.to_string()))?;
        rows.retain(|row| {
            get_string(row, key_field).map_or(true, |value| !keys.iter().any(|k| k == value))
        });
        Ok(())
    }

    async fn upload(&self, index: &str, rows: &[Value]) -> Result<(), BackendError> {
        let mut indexes = self.indexes.write().await;
        let stored = indexes
            .get_mut(index)
            .ok_or_else(|| BackendError::UnknownIndex(index.to_string()))?;
        for row in rows {
            let object = row.as_object().ok_or_else(|| {
                BackendError::InvalidRequest("Uploaded rows must be JSON objects".to_string())
            })?;
            let key = get_string(object, KEY_FIELD)
                .ok_or_else(|| {
                    BackendError::InvalidRequest(format!(
                        "Uploaded row is missing the \"{KEY_FIELD}\" key field"
                    ))
                })?
                .to_string();
            match stored
                .iter_mut()
                .find(|existing| get_string(existing, KEY_FIELD) == Some(key.as_str()))
            {
                Some(existing) => *existing = object.clone(),
                None => stored.push(object.clone()),
            }
        }
        Ok(())
    }
}

fn get_string<'a>(row: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    row.get(field).and_then(Value::as_str)
}

fn get_vector(row: &Map<String, Value>, field: &str) -> Option<Vec<f32>> {
    let values = row.get(field)?.as_array()?;
    values
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

fn project(row: &Map<String, Value>, select_fields: &[String]) -> Map<String, Value> {
    if select_fields.is_empty() {
        return row.clone();
    }
    let mut projected = Map::new();
    for field in select_fields {
        if let Some(value) = row.get(field) {
            projected.insert(field.clone(), value.clone());
        }
    }
    projected
}

/// `Field eq 'value'` is the only filter shape the ingestion pipeline emits.
fn parse_filter(filter: &str) -> Result<(String, String), BackendError> {
    let invalid = || BackendError::InvalidRequest(format!("Unsupported filter: {filter}"));
    let (field, value) = filter.split_once(" eq ").ok_or_else(invalid)?;
    let value = value.trim();
    if value.len() < 2 || !value.starts_with('\'') || !value.ends_with('\'') {
        return Err(invalid());
    }
    Ok((
        field.trim().to_string(),
        value[1..value.len() - 1].to_string(),
    ))
}

fn row_term_score(row: &Map<String, Value>, terms: &[String]) -> f64 {
    let mut score = 0.0;
    for value in row.values() {
        if let Some(text) = value.as_str() {
            for term in terms {
                score += find_occurrences(text, term).len() as f64;
            }
        }
    }
    score
}

/// Byte offsets of case-insensitive (ASCII) occurrences of `term` in `text`,
/// restricted to character boundaries.
fn find_occurrences(text: &str, term: &str) -> Vec<usize> {
    if term.is_empty() || term.len() > text.len() {
        return Vec::new();
    }
    let bytes = text.as_bytes();
    let term_bytes = term.as_bytes();
    let mut positions = Vec::new();
    for start in 0..=(bytes.len() - term_bytes.len()) {
        let end = start + term_bytes.len();
        if bytes[start..end].eq_ignore_ascii_case(term_bytes)
            && text.is_char_boundary(start)
            && text.is_char_boundary(end)
        {
            positions.push(start);
        }
    }
    positions
}

fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// First sentence of a text, clipped to a display-friendly length.
fn snippet(text: &str) -> String {
    let sentence = match text.find(". ") {
        Some(position) => &text[..position + 1],
        None => text,
    };
    let mut end = sentence.len().min(CAPTION_CHARS);
    while end < sentence.len() && !sentence.is_char_boundary(end) {
        end += 1;
    }
    sentence[..end].to_string()
}

/// Wrap every term occurrence in the pre/post tags; `None` when no term
/// occurs in the text.
fn highlight(text: &str, terms: &[String], pre_tag: &str, post_tag: &str) -> Option<String> {
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for term in terms {
        for start in find_occurrences(text, term) {
            ranges.push((start, start + term.len()));
        }
    }
    if ranges.is_empty() {
        return None;
    }
    ranges.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::new();
    for (start, end) in ranges {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }

    let mut fragment = String::with_capacity(text.len() + merged.len() * 16);
    let mut cursor = 0;
    for (start, end) in merged {
        fragment.push_str(&text[cursor..start]);
        fragment.push_str(pre_tag);
        fragment.push_str(&text[start..end]);
        fragment.push_str(post_tag);
        cursor = end;
    }
    fragment.push_str(&text[cursor..]);
    Some(fragment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Value {
        let mut map = Map::new();
        for (key, value) in pairs {
            map.insert((*key).to_string(), value.clone());
        }
        Value::Object(map)
    }

    async fn backend_with_rows(rows: Vec<Value>) -> InMemorySearchBackend {
        let backend = InMemorySearchBackend::new(["test-index"]);
        backend.upload("test-index", &rows).await.unwrap();
        backend
    }

    #[tokio::test]
    async fn test_unknown_index_is_rejected() {
        let backend = InMemorySearchBackend::new(["test-index"]);
        let err = backend
            .search("other", Some("query"), &QueryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::UnknownIndex(name) if name == "other"));
    }

    #[tokio::test]
    async fn test_term_search_ranks_by_occurrences() {
        let backend = backend_with_rows(vec![
            row(&[("Id", json!("a")), ("Content", json!("rust rust rust"))]),
            row(&[("Id", json!("b")), ("Content", json!("rust once"))]),
            row(&[("Id", json!("c")), ("Content", json!("nothing relevant"))]),
        ])
        .await;

        let outcome = backend
            .search("test-index", Some("rust"), &QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(get_string(&outcome.rows[0].document, "Id"), Some("a"));
    }

    #[tokio::test]
    async fn test_filter_and_paging_report_total() {
        let rows = (0..25)
            .map(|i| {
                row(&[
                    ("Id", json!(format!("chunk-{i}"))),
                    ("SourceDocumentId", json!("doc")),
                ])
            })
            .collect();
        let backend = backend_with_rows(rows).await;

        let options = QueryOptions {
            filter: Some("SourceDocumentId eq 'doc'".to_string()),
            size: Some(10),
            include_total_count: true,
            ..QueryOptions::default()
        };
        let outcome = backend
            .search("test-index", Some(""), &options)
            .await
            .unwrap();
        assert_eq!(outcome.rows.len(), 10);
        assert_eq!(outcome.total_count, Some(25));
    }

    #[tokio::test]
    async fn test_vector_search_returns_nearest_neighbors() {
        let backend = backend_with_rows(vec![
            row(&[("Id", json!("a")), ("ContentVector", json!([1.0, 0.0]))]),
            row(&[("Id", json!("b")), ("ContentVector", json!([0.9, 0.1]))]),
            row(&[("Id", json!("c")), ("ContentVector", json!([0.0, 1.0]))]),
        ])
        .await;

        let options = QueryOptions {
            vector: Some(VectorQuery::Embedded {
                vector: vec![1.0, 0.0],
                nearest_neighbors: 2,
                fields: vec!["ContentVector".to_string()],
            }),
            ..QueryOptions::default()
        };
        let outcome = backend.search("test-index", None, &options).await.unwrap();
        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(get_string(&outcome.rows[0].document, "Id"), Some("a"));
        assert_eq!(get_string(&outcome.rows[1].document, "Id"), Some("b"));
    }

    #[tokio::test]
    async fn test_highlight_requires_text_query() {
        let backend = backend_with_rows(vec![row(&[("Id", json!("a"))])]).await;
        let options = QueryOptions {
            highlight_fields: vec!["Content".to_string()],
            vector: Some(VectorQuery::Embedded {
                vector: vec![1.0],
                nearest_neighbors: 5,
                fields: vec!["ContentVector".to_string()],
            }),
            ..QueryOptions::default()
        };
        let err = backend
            .search("test-index", None, &options)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_highlights_wrap_matches() {
        let backend = backend_with_rows(vec![row(&[
            ("Id", json!("a")),
            ("Content", json!("Learn Rust today")),
        ])])
        .await;
        let options = QueryOptions {
            highlight_fields: vec!["Content".to_string()],
            highlight_pre_tag: Some("<mark>".to_string()),
            highlight_post_tag: Some("</mark>".to_string()),
            ..QueryOptions::default()
        };
        let outcome = backend
            .search("test-index", Some("rust"), &options)
            .await
            .unwrap();
        let fragments = outcome.rows[0].highlights.get("Content").unwrap();
        assert_eq!(fragments[0], "Learn <mark>Rust</mark> today");
    }

    #[tokio::test]
    async fn test_semantic_mode_synthesizes_answers() {
        let backend = backend_with_rows(vec![row(&[
            ("Id", json!("a")),
            ("Content", json!("Rust is a systems language. It is fast.")),
        ])])
        .await;
        let options = QueryOptions {
            kind: QueryKind::Semantic,
            semantic_configuration: Some("default".to_string()),
            extractive_answers: true,
            extractive_captions: true,
            ..QueryOptions::default()
        };
        let outcome = backend
            .search("test-index", Some("rust"), &options)
            .await
            .unwrap();
        assert_eq!(outcome.answers.len(), 1);
        assert_eq!(outcome.answers[0].key, "a");
        assert_eq!(
            outcome.answers[0].text.as_deref(),
            Some("Rust is a systems language.")
        );
        assert!(!outcome.rows[0].captions.is_empty());
    }

    #[tokio::test]
    async fn test_upload_upserts_by_key() {
        let backend = backend_with_rows(vec![row(&[
            ("Id", json!("a")),
            ("Content", json!("old")),
        ])])
        .await;
        backend
            .upload(
                "test-index",
                &[row(&[("Id", json!("a")), ("Content", json!("new"))])],
            )
            .await
            .unwrap();
        assert_eq!(backend.row_count("test-index").await, 1);

        let outcome = backend
            .search("test-index", Some("new"), &QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome.rows.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_keys() {
        let backend = backend_with_rows(vec![
            row(&[("Id", json!("a"))]),
            row(&[("Id", json!("b"))]),
        ])
        .await;
        backend
            .delete("test-index", "Id", &["a".to_string()])
            .await
            .unwrap();
        assert_eq!(backend.row_count("test-index").await, 1);
    }
}
