//! Chunk ingestion pipeline
//!
//! Turns a document's text into chunk rows with embeddings and replaces the
//! previously stored chunk set for that document. Records in a batch are
//! isolated: a failing record is reported in its own summary without
//! aborting its siblings. Replacement is delete-then-insert keyed on the
//! source document id, with a paginated drain loop so a partially completed
//! prior attempt cannot leave orphaned chunks: re-running ingestion for the
//! same document converges to the same chunk set.

use crate::backend::schema::{chunk_fields, DocumentChunk};
use crate::backend::{BackendError, QueryOptions, SearchBackend};
use crate::chunking::{self, estimate_token_size, ChunkError};
use crate::config::Settings;
use crate::embedding::{EmbeddingError, EmbeddingProvider};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Page size for the drain-delete loop (the back end's maximum)
const DELETE_PAGE_SIZE: usize = 1000;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("No embedding deployment name specified")]
    MissingDeployment,

    #[error(transparent)]
    Chunking(#[from] ChunkError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Failed to encode chunk row: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One document to ingest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRecord {
    /// Caller-chosen correlation id, echoed in the summary
    pub record_id: String,
    pub document_id: String,
    pub text: String,
    pub file_path: String,
    pub title: Option<String>,
    /// Name of the source field the text was read from
    pub field_name: String,
    /// Overrides for the configured chunking defaults
    pub num_tokens: Option<usize>,
    pub token_overlap: Option<usize>,
    pub min_chunk_size: Option<usize>,
    pub embedding_deployment_name: Option<String>,
}

/// Per-record outcome
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordSummary {
    pub record_id: String,
    /// Chunks embedded and uploaded
    pub stored_chunks: usize,
    /// Chunks excluded for falling below the minimum size
    pub skipped_chunks: usize,
    pub error: Option<String>,
}

/// Batch outcome; `failed_records` counts records whose summary carries an
/// error, separate from the per-chunk counts
#[derive(Debug, Clone, Default)]
pub struct IngestSummary {
    pub records: Vec<RecordSummary>,
    pub failed_records: usize,
}

pub struct IngestionPipeline {
    backend: Arc<dyn SearchBackend>,
    embedder: Arc<dyn EmbeddingProvider>,
    chunks_index: String,
    default_num_tokens: usize,
    default_token_overlap: usize,
    default_min_chunk_size: usize,
    default_deployment: String,
}

impl IngestionPipeline {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        embedder: Arc<dyn EmbeddingProvider>,
        settings: &Settings,
    ) -> Self {
        Self {
            backend,
            embedder,
            chunks_index: settings.search.chunks_index.clone(),
            default_num_tokens: settings.chunking.num_tokens,
            default_token_overlap: settings.chunking.token_overlap,
            default_min_chunk_size: settings.chunking.min_chunk_size,
            default_deployment: settings.embedding.deployment.clone(),
        }
    }

    /// Ingest a batch of records, isolating failures per record.
    pub async fn ingest_batch(&self, records: &[IngestRecord]) -> IngestSummary {
        let mut summary = IngestSummary::default();
        for record in records {
            match self.ingest(record).await {
                Ok(record_summary) => summary.records.push(record_summary),
                Err(error) => {
                    warn!(record = %record.record_id, "Ingestion failed: {error}");
                    summary.failed_records += 1;
                    summary.records.push(RecordSummary {
                        record_id: record.record_id.clone(),
                        error: Some(error.to_string()),
                        ..RecordSummary::default()
                    });
                }
            }
        }
        info!(
            records = summary.records.len(),
            failed = summary.failed_records,
            "Ingestion batch complete"
        );
        summary
    }

    /// Ingest one record: chunk, filter undersized chunks, embed, replace.
    pub async fn ingest(&self, record: &IngestRecord) -> Result<RecordSummary, IngestError> {
        let num_tokens = record.num_tokens.unwrap_or(self.default_num_tokens);
        let token_overlap = record.token_overlap.unwrap_or(self.default_token_overlap);
        let min_chunk_size = record.min_chunk_size.unwrap_or(self.default_min_chunk_size);
        let deployment = record
            .embedding_deployment_name
            .clone()
            .unwrap_or_else(|| self.default_deployment.clone());
        if deployment.trim().is_empty() {
            return Err(IngestError::MissingDeployment);
        }

        let mut summary = RecordSummary {
            record_id: record.record_id.clone(),
            ..RecordSummary::default()
        };
        if record.text.trim().is_empty() {
            return Ok(summary);
        }

        info!(
            document = %record.document_id,
            "Chunking to {num_tokens} tokens (min chunk size is {min_chunk_size}, token overlap is {token_overlap})"
        );
        let structured = is_markdown(&record.file_path);
        let chunks = chunking::chunk(&record.text, num_tokens, token_overlap, structured)?;
        let total_chunks = chunks.len();

        // The chunker never drops chunks; excluding undersized ones is this
        // pipeline's policy.
        let kept: Vec<(usize, chunking::Chunk)> = chunks
            .into_iter()
            .enumerate()
            .filter(|(_, chunk)| estimate_token_size(&chunk.content) >= min_chunk_size)
            .collect();
        summary.skipped_chunks = total_chunks - kept.len();
        if summary.skipped_chunks > 0 {
            info!(
                "Skipping {} chunk(s) with an estimated token size below the minimum chunk size",
                summary.skipped_chunks
            );
        }

        info!(
            "Generating embeddings for {} chunk(s) using deployment \"{}\"",
            kept.len(),
            deployment
        );
        let mut rows = Vec::with_capacity(kept.len());
        for (chunk_index, chunk) in kept {
            let vector = self.embedder.embed(&chunk.content).await?;
            let row = DocumentChunk {
                id: format!("{}-{}", record.document_id, chunk_index),
                chunk_index: chunk_index as i64,
                chunk_offset: chunk.offset as i64,
                chunk_length: chunk.length as i64,
                content: chunk.content,
                content_vector: vector,
                source_document_id: record.document_id.clone(),
                source_document_title: record.title.clone(),
                source_document_content_field: Some(record.field_name.clone()),
                source_document_file_path: Some(record.file_path.clone()),
            };
            rows.push(serde_json::to_value(row)?);
        }

        self.replace_chunks(&record.document_id, &rows).await?;
        summary.stored_chunks = rows.len();
        Ok(summary)
    }

    /// Replace all stored chunks of one document.
    ///
    /// Drains every existing chunk for the document id first, page by page
    /// until the reported total is exhausted, then uploads the new rows.
    async fn replace_chunks(
        &self,
        source_document_id: &str,
        rows: &[Value],
    ) -> Result<(), IngestError> {
        loop {
            let options = QueryOptions {
                size: Some(DELETE_PAGE_SIZE),
                // Only the key field is needed to issue the deletes.
                select_fields: vec![chunk_fields::ID.to_string()],
                include_total_count: true,
                filter: Some(format!(
                    "{} eq '{}'",
                    chunk_fields::SOURCE_DOCUMENT_ID,
                    source_document_id
                )),
                ..QueryOptions::default()
            };
            let existing = self
                .backend
                .search(&self.chunks_index, Some(""), &options)
                .await?;
            let ids: Vec<String> = existing
                .rows
                .iter()
                .filter_map(|row| {
                    row.document
                        .get(chunk_fields::ID)
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .collect();
            if !ids.is_empty() {
                debug!(
                    "Deleting {} existing chunk(s) for document {source_document_id}",
                    ids.len()
                );
                self.backend
                    .delete(&self.chunks_index, chunk_fields::ID, &ids)
                    .await?;
            }
            if existing.total_count.unwrap_or(0) <= ids.len() as u64 {
                break;
            }
        }

        if !rows.is_empty() {
            info!("Uploading {} document chunk(s)", rows.len());
            self.backend.upload(&self.chunks_index, rows).await?;
        }
        Ok(())
    }
}

fn is_markdown(file_path: &str) -> bool {
    Path::new(file_path)
        .extension()
        .map_or(false, |extension| extension.eq_ignore_ascii_case("md"))
}
