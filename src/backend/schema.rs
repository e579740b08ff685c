//! Index row schemas
//!
//! The persisted shape of document and chunk rows is the binary contract with
//! the index schema: field names and types stay stable across chunker
//! configuration changes (only content, vector and offsets vary). The
//! constants below are the single source of the field names used in select
//! lists, highlight lists, filters and row extraction.

use serde::{Deserialize, Serialize};

/// A whole document as stored in the documents index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Document {
    /// Opaque id, derived deterministically from the source location
    pub id: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub file_path: Option<String>,
}

/// One chunk of a document as stored in the chunks index
///
/// All chunks of one document share `source_document_id`; chunk ids are
/// `{document_id}-{chunk_index}` and stable for a given chunking
/// configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocumentChunk {
    pub id: String,
    /// 0-based position in the chunk sequence produced for the document
    pub chunk_index: i64,
    /// Byte offset of the chunk span in the source content
    pub chunk_offset: i64,
    /// Byte length of the chunk span
    pub chunk_length: i64,
    pub content: String,
    pub content_vector: Vec<f32>,
    pub source_document_id: String,
    pub source_document_title: Option<String>,
    pub source_document_content_field: Option<String>,
    pub source_document_file_path: Option<String>,
}

/// Field names of the documents index
pub mod document_fields {
    pub const ID: &str = "Id";
    pub const TITLE: &str = "Title";
    pub const CONTENT: &str = "Content";
    pub const FILE_PATH: &str = "FilePath";
}

/// Field names of the chunks index
pub mod chunk_fields {
    pub const ID: &str = "Id";
    pub const CHUNK_INDEX: &str = "ChunkIndex";
    pub const CHUNK_OFFSET: &str = "ChunkOffset";
    pub const CHUNK_LENGTH: &str = "ChunkLength";
    pub const CONTENT: &str = "Content";
    pub const CONTENT_VECTOR: &str = "ContentVector";
    pub const SOURCE_DOCUMENT_ID: &str = "SourceDocumentId";
    pub const SOURCE_DOCUMENT_TITLE: &str = "SourceDocumentTitle";
    pub const SOURCE_DOCUMENT_CONTENT_FIELD: &str = "SourceDocumentContentField";
    pub const SOURCE_DOCUMENT_FILE_PATH: &str = "SourceDocumentFilePath";
}
