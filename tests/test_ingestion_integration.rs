//! Integration tests for the ingestion pipeline: chunk, embed and
//! replace-on-upload against the in-memory backend, including the paginated
//! drain of stale chunks and per-record failure isolation.

mod common;

use common::HashEmbedder;
use querylab::backend::schema::chunk_fields;
use querylab::backend::{InMemorySearchBackend, QueryOptions, SearchBackend};
use querylab::config::Settings;
use querylab::ingest::{IngestRecord, IngestionPipeline};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

const DIMENSION: usize = 16;

fn record(document_id: &str, text: &str) -> IngestRecord {
    IngestRecord {
        record_id: format!("record-{document_id}"),
        document_id: document_id.to_string(),
        text: text.to_string(),
        file_path: format!("{document_id}.txt"),
        title: Some(document_id.to_string()),
        field_name: "content".to_string(),
        num_tokens: Some(40),
        token_overlap: Some(5),
        min_chunk_size: Some(0),
        embedding_deployment_name: None,
    }
}

fn long_text() -> String {
    "Every node publishes a heartbeat to the coordinator once per interval. \
     Missed heartbeats mark the node as suspect and drain its work queue. "
        .repeat(8)
}

struct Harness {
    backend: Arc<InMemorySearchBackend>,
    pipeline: IngestionPipeline,
    chunks_index: String,
}

fn harness() -> Harness {
    common::init_tracing();
    let settings = Settings::default();
    let backend = Arc::new(InMemorySearchBackend::new([
        settings.search.documents_index.as_str(),
        settings.search.chunks_index.as_str(),
    ]));
    let pipeline = IngestionPipeline::new(
        backend.clone(),
        Arc::new(HashEmbedder::new(DIMENSION)),
        &settings,
    );
    Harness {
        backend,
        pipeline,
        chunks_index: settings.search.chunks_index,
    }
}

async fn stored_chunk_ids(harness: &Harness, document_id: &str) -> BTreeSet<String> {
    let options = QueryOptions {
        filter: Some(format!(
            "{} eq '{document_id}'",
            chunk_fields::SOURCE_DOCUMENT_ID
        )),
        ..QueryOptions::default()
    };
    harness
        .backend
        .search(&harness.chunks_index, Some(""), &options)
        .await
        .unwrap()
        .rows
        .iter()
        .filter_map(|row| {
            row.document
                .get(chunk_fields::ID)
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .collect()
}

#[tokio::test]
async fn test_ingest_stores_chunk_rows() {
    let harness = harness();
    let summary = harness
        .pipeline
        .ingest(&record("heartbeat-doc", &long_text()))
        .await
        .unwrap();

    assert!(summary.stored_chunks > 1);
    assert_eq!(summary.error, None);
    assert_eq!(
        harness.backend.row_count(&harness.chunks_index).await,
        summary.stored_chunks
    );

    let ids = stored_chunk_ids(&harness, "heartbeat-doc").await;
    assert_eq!(ids.len(), summary.stored_chunks);
    for id in &ids {
        assert!(id.starts_with("heartbeat-doc-"), "unexpected id {id}");
    }
}

#[tokio::test]
async fn test_reingest_converges_to_same_chunk_set() {
    let harness = harness();
    let text = long_text();

    harness
        .pipeline
        .ingest(&record("stable-doc", &text))
        .await
        .unwrap();
    let first = stored_chunk_ids(&harness, "stable-doc").await;

    harness
        .pipeline
        .ingest(&record("stable-doc", &text))
        .await
        .unwrap();
    let second = stored_chunk_ids(&harness, "stable-doc").await;

    assert_eq!(first, second);
    assert_eq!(
        harness.backend.row_count(&harness.chunks_index).await,
        first.len()
    );
}

#[tokio::test]
async fn test_replace_drains_stale_chunks_across_pages() {
    let harness = harness();

    // A partially completed earlier attempt left more stale rows than one
    // delete page can cover.
    let stale: Vec<Value> = (0..1205)
        .map(|i| {
            json!({
                "Id": format!("stale-{i}"),
                "SourceDocumentId": "big-doc",
                "Content": "stale chunk",
            })
        })
        .collect();
    harness
        .backend
        .upload(&harness.chunks_index, &stale)
        .await
        .unwrap();
    assert_eq!(harness.backend.row_count(&harness.chunks_index).await, 1205);

    let summary = harness
        .pipeline
        .ingest(&record("big-doc", &long_text()))
        .await
        .unwrap();

    let ids = stored_chunk_ids(&harness, "big-doc").await;
    assert_eq!(ids.len(), summary.stored_chunks);
    assert!(ids.iter().all(|id| id.starts_with("big-doc-")));
    assert_eq!(
        harness.backend.row_count(&harness.chunks_index).await,
        summary.stored_chunks
    );
}

#[tokio::test]
async fn test_undersized_chunks_are_skipped_not_stored() {
    let harness = harness();
    let mut tiny = record("tiny-doc", "tiny.");
    tiny.min_chunk_size = Some(10);

    let summary = harness.pipeline.ingest(&tiny).await.unwrap();
    assert_eq!(summary.stored_chunks, 0);
    assert_eq!(summary.skipped_chunks, 1);
    assert_eq!(summary.error, None);
    assert_eq!(harness.backend.row_count(&harness.chunks_index).await, 0);
}

#[tokio::test]
async fn test_empty_text_record_is_a_no_op() {
    let harness = harness();
    let summary = harness
        .pipeline
        .ingest(&record("empty-doc", "   "))
        .await
        .unwrap();
    assert_eq!(summary.stored_chunks, 0);
    assert_eq!(summary.skipped_chunks, 0);
    assert_eq!(harness.backend.row_count(&harness.chunks_index).await, 0);
}

#[tokio::test]
async fn test_batch_isolates_failing_records() {
    let harness = harness();

    let mut invalid_chunking = record("overlap-doc", &long_text());
    invalid_chunking.num_tokens = Some(50);
    invalid_chunking.token_overlap = Some(50);

    let mut missing_deployment = record("no-deployment-doc", &long_text());
    missing_deployment.embedding_deployment_name = Some("  ".to_string());

    let records = vec![
        invalid_chunking,
        record("good-doc", &long_text()),
        missing_deployment,
    ];
    let summary = harness.pipeline.ingest_batch(&records).await;

    assert_eq!(summary.records.len(), 3);
    assert_eq!(summary.failed_records, 2);

    assert_eq!(summary.records[0].record_id, "record-overlap-doc");
    assert!(summary.records[0].error.as_deref().unwrap().contains("overlap"));
    assert_eq!(summary.records[0].stored_chunks, 0);

    assert_eq!(summary.records[1].error, None);
    assert!(summary.records[1].stored_chunks > 0);

    assert!(summary.records[2]
        .error
        .as_deref()
        .unwrap()
        .contains("deployment"));

    // Only the good record's chunks were stored.
    let ids = stored_chunk_ids(&harness, "good-doc").await;
    assert_eq!(
        harness.backend.row_count(&harness.chunks_index).await,
        ids.len()
    );
}

#[tokio::test]
async fn test_chunk_rows_carry_document_metadata() {
    let harness = harness();
    let mut markdown = record("guide", "# Title\n\nSome body text under the heading.");
    markdown.file_path = "guide.md".to_string();
    harness.pipeline.ingest(&markdown).await.unwrap();

    let options = QueryOptions {
        filter: Some(format!("{} eq 'guide'", chunk_fields::SOURCE_DOCUMENT_ID)),
        ..QueryOptions::default()
    };
    let outcome = harness
        .backend
        .search(&harness.chunks_index, Some(""), &options)
        .await
        .unwrap();
    assert!(!outcome.rows.is_empty());
    for row in &outcome.rows {
        let document = &row.document;
        assert_eq!(
            document.get(chunk_fields::SOURCE_DOCUMENT_TITLE),
            Some(&json!("guide"))
        );
        assert_eq!(
            document.get(chunk_fields::SOURCE_DOCUMENT_CONTENT_FIELD),
            Some(&json!("content"))
        );
        assert_eq!(
            document.get(chunk_fields::SOURCE_DOCUMENT_FILE_PATH),
            Some(&json!("guide.md"))
        );
        let vector = document
            .get(chunk_fields::CONTENT_VECTOR)
            .and_then(Value::as_array)
            .unwrap();
        assert_eq!(vector.len(), DIMENSION);
        assert!(document.get(chunk_fields::CHUNK_OFFSET).is_some());
        assert!(document.get(chunk_fields::CHUNK_LENGTH).is_some());
    }
}
