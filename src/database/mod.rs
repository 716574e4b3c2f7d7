// Vector persistence module
// One on-disk store directory is the single source of truth shared by the
// indexer, the inspector, and the query engine

pub mod lancedb;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// A chunk persisted alongside its embedding
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkRecord {
    /// Unique identifier for this record
    pub id: String,
    /// The embedding vector for this chunk's text
    pub vector: Vec<f32>,
    /// The chunk's raw text
    pub content: String,
    /// File name of the originating PDF
    pub source: String,
    /// 1-based page the chunk was extracted from
    pub page_number: u32,
    /// Index of the chunk within the document
    pub chunk_index: u32,
    /// RFC 3339 timestamp of when the record was written
    pub created_at: String,
}

/// A chunk returned from similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub content: String,
    pub source: String,
    pub page_number: u32,
    pub chunk_index: u32,
    pub distance: f32,
    pub similarity: f32,
}

/// Capability seam for vector stores.
///
/// [`lancedb::VectorStore`] is the persistent implementation;
/// [`memory::MemoryStore`] backs tests and programmatic use.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert a batch of chunk records
    async fn add_chunks(&mut self, records: Vec<ChunkRecord>) -> Result<()>;

    /// Nearest-neighbor search, at most `limit` results ranked best-first
    async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<ScoredChunk>>;

    /// Every stored record, in storage order
    async fn all_chunks(&self) -> Result<Vec<ChunkRecord>>;

    /// Number of stored records
    async fn count(&self) -> Result<u64>;
}
