use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("PDF file not found: {0}")]
    PdfNotFound(PathBuf),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Vector store error: {0}")]
    Store(String),

    #[error("Vector store not found at {0}. Run `pdf-rag index <pdf>` first")]
    StoreMissing(PathBuf),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Language model error: {0}")]
    Llm(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod indexer;
pub mod pdf;
pub mod query;
