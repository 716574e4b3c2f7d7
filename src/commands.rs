// Command implementations for the CLI

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::{RagError, Result};
use crate::database::VectorIndex;
use crate::database::lancedb::VectorStore;
use crate::embeddings::Embedder;
use crate::embeddings::ollama::OllamaClient;
use crate::indexer::Indexer;
use crate::query::{LanguageModel, QueryEngine};

/// Index a PDF into a fresh vector store at `db_dir`.
///
/// Re-running against the same directory replaces the previous contents.
#[inline]
pub async fn index_document(config: &Config, pdf_path: &Path, db_dir: &Path) -> Result<()> {
    // Validate the input before touching the store; a bad path must leave
    // previously indexed contents intact
    if !pdf_path.is_file() {
        return Err(RagError::PdfNotFound(pdf_path.to_path_buf()));
    }

    println!("Loading PDF: {}", pdf_path.display());

    let client = OllamaClient::new(&config.ollama, &config.query)?;
    client.health_check()?;

    let mut store = VectorStore::create(db_dir).await?;

    let indexer = Indexer::new(
        Arc::new(client),
        &config.chunking,
        config.ollama.batch_size as usize,
    );
    let stats = indexer.index_pdf(pdf_path, &mut store).await?;

    info!(
        "Indexed {} chunks from {} pages",
        stats.chunks_created, stats.pages_loaded
    );
    println!("Vector database created and saved to: {}", db_dir.display());
    println!("Indexing complete!");

    Ok(())
}

/// Print every stored chunk in storage order.
///
/// Reads the store directly; no embedding provider is contacted.
#[inline]
pub async fn inspect_store(db_dir: &Path) -> Result<()> {
    let store = VectorStore::open(db_dir).await?;
    let chunks = store.all_chunks().await?;

    println!("Total chunks: {}", chunks.len());

    for (i, chunk) in chunks.iter().enumerate() {
        println!();
        println!("--- Chunk {} (page {}) ---", i + 1, chunk.page_number);
        println!("{}", chunk.content);
    }

    Ok(())
}

/// Answer questions against an indexed PDF.
///
/// With a question, answers it once and exits; without one, starts an
/// interactive session on stdin.
#[inline]
pub async fn run_query(config: &Config, db_dir: &Path, question: Option<&str>) -> Result<()> {
    println!("Loading vector database...");
    let store = VectorStore::open(db_dir).await?;

    let client = Arc::new(OllamaClient::new(&config.ollama, &config.query)?);
    client.health_check()?;
    let embedder: Arc<dyn Embedder> = Arc::clone(&client) as Arc<dyn Embedder>;
    let llm: Arc<dyn LanguageModel> = client;

    let engine = QueryEngine::new(embedder, llm, Box::new(store), config.query.top_k);
    println!("System ready! You can now ask questions.");

    let mut out = io::stdout();

    match question {
        Some(q) => {
            // A failed single query prints its error and exits cleanly, the
            // same way a failed question inside the interactive loop would
            let _ = engine.single_query(q, &mut out).await;
            out.flush()?;
        }
        None => {
            let stdin = io::stdin();
            let mut input = stdin.lock();
            engine.run_interactive(&mut input, &mut out).await?;
        }
    }

    Ok(())
}
