
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::pdf::PageText;

/// Configuration for recursive character splitting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Characters of overlap carried between adjacent chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// A chunk of document text ready for embedding
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    pub text: String,
    /// 1-based PDF page this chunk was extracted from
    pub page_number: u32,
    /// Global index of this chunk within the document, in emission order
    pub chunk_index: u32,
}

/// Recursive character splitter.
///
/// Tries splitting on paragraph breaks first, then line breaks, then spaces,
/// then individual characters, keeping chunks as semantically coherent as
/// possible while respecting the size bound and the overlap between
/// consecutive chunks. Deterministic for a given input and configuration.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    #[inline]
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            separators: vec![
                "\n\n".to_string(),
                "\n".to_string(),
                " ".to_string(),
                String::new(),
            ],
        }
    }

    /// Split one text into chunks of at most `chunk_size` characters
    #[inline]
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.split_with(text, &self.separators)
    }

    /// Split every page of a document, assigning page numbers and a global
    /// chunk index in emission order
    #[inline]
    pub fn split_document(&self, pages: &[PageText]) -> Vec<DocumentChunk> {
        let mut chunks = Vec::new();
        let mut chunk_index = 0u32;

        for page in pages {
            for text in self.split_text(&page.text) {
                chunks.push(DocumentChunk {
                    text,
                    page_number: page.page_number,
                    chunk_index,
                });
                chunk_index += 1;
            }
        }

        debug!("Split {} pages into {} chunks", pages.len(), chunks.len());

        chunks
    }

    fn split_with(&self, text: &str, separators: &[String]) -> Vec<String> {
        // Pick the first separator that occurs in the text; the empty
        // separator always matches and splits into single characters
        let mut separator = separators.last().cloned().unwrap_or_default();
        let mut remaining: &[String] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() || text.contains(candidate.as_str()) {
                separator = candidate.clone();
                remaining = &separators[i + 1..];
                break;
            }
        }

        let splits: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator.as_str()).map(String::from).collect()
        };

        let mut final_chunks = Vec::new();
        let mut good_splits: Vec<String> = Vec::new();

        for split in splits {
            if char_len(&split) < self.chunk_size {
                good_splits.push(split);
                continue;
            }

            if !good_splits.is_empty() {
                final_chunks.extend(self.merge_splits(&good_splits, &separator));
                good_splits.clear();
            }

            if remaining.is_empty() {
                // Nothing left to split on
                final_chunks.push(split);
            } else {
                final_chunks.extend(self.split_with(&split, remaining));
            }
        }

        if !good_splits.is_empty() {
            final_chunks.extend(self.merge_splits(&good_splits, &separator));
        }

        final_chunks.retain(|c| !c.trim().is_empty());
        final_chunks
    }

    /// Accumulate small splits into chunks near `chunk_size`, carrying
    /// `chunk_overlap` characters of trailing context into the next chunk
    fn merge_splits(&self, splits: &[String], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut docs = Vec::new();
        let mut current: VecDeque<String> = VecDeque::new();
        let mut total = 0usize;

        for split in splits {
            let split_len = char_len(split);
            let join_len = if current.is_empty() { 0 } else { sep_len };

            if total + split_len + join_len > self.chunk_size {
                if total > self.chunk_size {
                    warn!(
                        "Produced a chunk of {} characters, above the limit of {}",
                        total, self.chunk_size
                    );
                }
                if !current.is_empty() {
                    if let Some(doc) = join_splits(&current, separator) {
                        docs.push(doc);
                    }
                    // Drop leading splits until only the overlap remains and
                    // the next split fits
                    while total > self.chunk_overlap
                        || (total + split_len + if current.is_empty() { 0 } else { sep_len }
                            > self.chunk_size
                            && total > 0)
                    {
                        let Some(removed) = current.pop_front() else {
                            break;
                        };
                        total -= char_len(&removed) + if current.is_empty() { 0 } else { sep_len };
                    }
                }
            }

            current.push_back(split.clone());
            total += split_len + if current.len() > 1 { sep_len } else { 0 };
        }

        if let Some(doc) = join_splits(&current, separator) {
            docs.push(doc);
        }

        docs
    }
}

fn join_splits(splits: &VecDeque<String>, separator: &str) -> Option<String> {
    let joined = splits
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(separator);
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
