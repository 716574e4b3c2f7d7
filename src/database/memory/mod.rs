// In-memory vector store
// Cosine-distance implementation of the store seam, used by tests and
// available for programmatic pipelines that do not need persistence


use async_trait::async_trait;
use tracing::debug;

use super::{ChunkRecord, ScoredChunk, VectorIndex};
use crate::{RagError, Result};

/// Vector store held entirely in memory, ranked by cosine distance
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Vec<ChunkRecord>,
}

impl MemoryStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    1.0 - dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for MemoryStore {
    #[inline]
    async fn add_chunks(&mut self, records: Vec<ChunkRecord>) -> Result<()> {
        debug!("Storing {} chunks in memory", records.len());
        self.records.extend(records);
        Ok(())
    }

    #[inline]
    async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<ScoredChunk>> {
        for record in &self.records {
            if record.vector.len() != query_vector.len() {
                return Err(RagError::Store(format!(
                    "Vector dimension mismatch: expected {}, got {}",
                    record.vector.len(),
                    query_vector.len()
                )));
            }
        }

        let mut scored: Vec<ScoredChunk> = self
            .records
            .iter()
            .map(|record| {
                let distance = cosine_distance(&record.vector, query_vector);
                ScoredChunk {
                    content: record.content.clone(),
                    source: record.source.clone(),
                    page_number: record.page_number,
                    chunk_index: record.chunk_index,
                    distance,
                    similarity: 1.0 - distance,
                }
            })
            .collect();

        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(limit);

        Ok(scored)
    }

    #[inline]
    async fn all_chunks(&self) -> Result<Vec<ChunkRecord>> {
        Ok(self.records.clone())
    }

    #[inline]
    async fn count(&self) -> Result<u64> {
        Ok(self.records.len() as u64)
    }
}
