//! Document chunking
//!
//! Splits document text into overlapping, size-bounded passages suitable for
//! embedding and indexing. The chunker is a pure splitter: it never drops
//! undersized chunks; filtering against a minimum size is the caller's
//! policy (see the ingestion pipeline). Output is deterministic for a given
//! input and parameter set.
//!
//! The algorithm runs in two phases. Phase one splits the text into "lines"
//! that fit the token budget, cutting at structure-aware boundaries
//! (paragraph breaks for markdown, sentence and whitespace breaks for plain
//! text). Phase two groups consecutive lines into chunks, re-including the
//! trailing `token_overlap` worth of the previous chunk at the start of the
//! next one so neighboring chunks share context.

mod splitter;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Character-to-token heuristic used for all size estimates.
const CHARS_PER_TOKEN: usize = 4;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChunkError {
    #[error("Token budget must be greater than zero")]
    InvalidTokenBudget,

    #[error("Token overlap ({token_overlap}) must be smaller than the token budget ({num_tokens})")]
    OverlapExceedsBudget {
        token_overlap: usize,
        num_tokens: usize,
    },
}

/// A bounded sub-span of a document's text
///
/// `content` is the exact slice of the source covered by
/// `[offset, offset + length)` (byte positions, always on character
/// boundaries). Consecutive chunk spans overlap by roughly the configured
/// token overlap and together cover the full source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub offset: usize,
    pub length: usize,
}

/// Estimate the token size of a text
///
/// A rough estimate assuming an average of four characters per token; used
/// both for chunk-boundary decisions and by callers deciding whether a chunk
/// is large enough to keep.
pub fn estimate_token_size(text: &str) -> usize {
    text.len() / CHARS_PER_TOKEN
}

/// Split `text` into ordered chunks bounded by `num_tokens` (estimated), with
/// `token_overlap` tokens of trailing context from each chunk repeated at the
/// start of the next.
///
/// `structured` selects markdown-aware boundaries (headings and paragraph
/// breaks) over plain-text sentence boundaries. Empty input yields no chunks.
/// Invalid parameter combinations fail fast rather than producing degenerate
/// output.
pub fn chunk(
    text: &str,
    num_tokens: usize,
    token_overlap: usize,
    structured: bool,
) -> Result<Vec<Chunk>, ChunkError> {
    if num_tokens == 0 {
        return Err(ChunkError::InvalidTokenBudget);
    }
    if token_overlap >= num_tokens {
        return Err(ChunkError::OverlapExceedsBudget {
            token_overlap,
            num_tokens,
        });
    }
    if text.is_empty() {
        return Ok(Vec::new());
    }

    // Reserve the overlap inside the budget so a chunk's own content plus the
    // re-included tail of its predecessor never exceeds `num_tokens`.
    let line_budget = num_tokens - token_overlap;
    let levels = if structured {
        splitter::STRUCTURED_LEVELS
    } else {
        splitter::PLAIN_LEVELS
    };
    let lines = splitter::split_spans(text, line_budget, levels);

    // Group consecutive lines while they fit the per-chunk content budget.
    let mut groups: Vec<(usize, usize)> = Vec::new();
    let mut start = 0;
    let mut end = 0;
    for line in &lines {
        if end > start && estimate_token_size(&text[start..line.end]) > line_budget {
            groups.push((start, end));
            start = end;
        }
        end = line.end;
    }
    if end > start {
        groups.push((start, end));
    }

    // Extend every group after the first backwards into its predecessor by
    // the overlap amount, clamped so it never reaches past the predecessor's
    // own content.
    let overlap_bytes = token_overlap * CHARS_PER_TOKEN;
    let mut chunks = Vec::with_capacity(groups.len());
    let mut previous_start = 0;
    for (index, &(group_start, group_end)) in groups.iter().enumerate() {
        let mut extended_start = group_start;
        if index > 0 && overlap_bytes > 0 {
            extended_start = group_start
                .saturating_sub(overlap_bytes)
                .max(previous_start);
            while !text.is_char_boundary(extended_start) {
                extended_start += 1;
            }
        }
        chunks.push(Chunk {
            content: text[extended_start..group_end].to_string(),
            offset: extended_start,
            length: group_end - extended_start,
        });
        previous_start = group_start;
    }

    Ok(chunks)
}
