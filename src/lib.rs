//! Querylab - Retrieval Strategy Comparison Engine
//!
//! A library for comparing retrieval strategies (keyword, semantic, vector,
//! hybrid, and LLM-grounded orchestration) against the same corpus and query,
//! and for ingesting documents into a chunk-level searchable form with
//! embeddings. The search and embedding back ends are external collaborators
//! consumed through narrow capability traits.

pub mod backend;
pub mod chunking;
pub mod config;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod retrieval;

pub use error::{QuerylabError, Result};
