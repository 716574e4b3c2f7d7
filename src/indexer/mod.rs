// Indexer module
// Drives the PDF -> chunks -> embeddings -> vector store pipeline


use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};
use uuid::Uuid;

use crate::Result;
use crate::database::{ChunkRecord, VectorIndex};
use crate::embeddings::Embedder;
use crate::embeddings::chunking::{ChunkingConfig, DocumentChunk, TextSplitter};
use crate::pdf;

/// Statistics about a completed indexing run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexingStats {
    pub pages_loaded: usize,
    pub chunks_created: usize,
}

/// Indexes one PDF document into a vector store
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    splitter: TextSplitter,
    batch_size: usize,
}

impl Indexer {
    #[inline]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        chunking_config: &ChunkingConfig,
        batch_size: usize,
    ) -> Self {
        Self {
            embedder,
            splitter: TextSplitter::new(chunking_config),
            batch_size: batch_size.max(1),
        }
    }

    /// Index `pdf_path` into `store`.
    ///
    /// Validates the path, extracts page text, splits it into chunks, embeds
    /// the chunks in batches, and stores the resulting records. No embedding
    /// request is made before the PDF has been read successfully, so a bad
    /// path fails fast without touching the network.
    #[inline]
    pub async fn index_pdf(
        &self,
        pdf_path: &Path,
        store: &mut dyn VectorIndex,
    ) -> Result<IndexingStats> {
        info!("Indexing PDF: {}", pdf_path.display());

        let pages = pdf::load_pages(pdf_path)?;
        println!("Loaded {} pages from PDF", pages.len());

        let chunks = self.splitter.split_document(&pages);
        println!("Split into {} chunks", chunks.len());

        if chunks.is_empty() {
            info!("No text chunks extracted, nothing to store");
            return Ok(IndexingStats {
                pages_loaded: pages.len(),
                chunks_created: 0,
            });
        }

        let source = pdf_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| pdf_path.display().to_string());

        println!("Creating embeddings... (this may take a while)");

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(chunks.len() as u64).with_style(
                ProgressStyle::with_template("{bar:40} [{pos}/{len}] Embedding chunks")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts)?;

            let records: Vec<ChunkRecord> = batch
                .iter()
                .zip(vectors)
                .map(|(chunk, vector)| make_record(chunk, vector, &source))
                .collect();

            store.add_chunks(records).await?;
            bar.inc(batch.len() as u64);
        }

        bar.finish_and_clear();

        debug!(
            "Stored {} chunks from {} pages",
            chunks.len(),
            pages.len()
        );

        Ok(IndexingStats {
            pages_loaded: pages.len(),
            chunks_created: chunks.len(),
        })
    }
}

fn make_record(chunk: &DocumentChunk, vector: Vec<f32>, source: &str) -> ChunkRecord {
    ChunkRecord {
        id: Uuid::new_v4().to_string(),
        vector,
        content: chunk.text.clone(),
        source: source.to_string(),
        page_number: chunk.page_number,
        chunk_index: chunk.chunk_index,
        created_at: Utc::now().to_rfc3339(),
    }
}
