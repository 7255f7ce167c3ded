// src/chunker.rs
// Splits a chat export into rate-sized chunks on line boundaries.

use tracing::debug;

use crate::rate::TOKENS_PER_MINUTE;

/// Seconds' worth of the token budget a single chunk may consume.
const CHUNK_ALLOWANCE_SECS: u64 = 30;
/// 1 token ≈ 4 characters.
const CHARS_PER_TOKEN: u64 = 4;

/// One bounded, contiguous slice of the source document, submitted as a
/// single unit of analysis. Position flags feed the prompt builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub index: usize,
    pub is_first: bool,
    pub is_last: bool,
}

/// Largest chunk size in characters that stays under the token budget.
/// Documents that already fit yield exactly one chunk.
pub fn optimal_chunk_size(total_len: usize) -> usize {
    let tokens_per_second = TOKENS_PER_MINUTE / 60;
    let max_tokens_per_chunk = tokens_per_second * CHUNK_ALLOWANCE_SECS;
    let max_chars_per_chunk = (max_tokens_per_chunk * CHARS_PER_TOKEN) as usize;

    if total_len <= max_chars_per_chunk {
        total_len
    } else {
        max_chars_per_chunk
    }
}

/// Greedily packs whole lines into chunks of at most the optimal size.
///
/// A single line longer than the optimal size is not split further; it
/// becomes its own oversized chunk, because cutting mid-line would corrupt
/// the conversational structure. Whitespace-only documents yield no chunks.
pub fn plan(text: &str) -> Vec<Chunk> {
    let optimal = optimal_chunk_size(text.len());
    debug!(optimal_chunk_size = optimal, "Planning chunks");

    let mut pieces: Vec<String> = Vec::new();
    let mut current = String::new();

    for line in text.split('\n') {
        if current.len() + line.len() > optimal {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                pieces.push(trimmed.to_string());
            }
            current.clear();
            current.push_str(line);
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        pieces.push(trimmed.to_string());
    }

    let total = pieces.len();
    pieces
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk {
            text,
            index,
            is_first: index == 0,
            is_last: index + 1 == total,
        })
        .collect()
}
