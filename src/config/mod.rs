// Configuration management module
// Handles TOML configuration loading, validation, and display

pub mod settings;

pub use settings::{Config, ConfigError, OllamaConfig, QueryConfig};

use crate::Result;

/// Get the default configuration directory for the application
#[inline]
pub fn default_config_dir() -> Result<std::path::PathBuf> {
    let base = dirs::config_dir()
        .ok_or_else(|| crate::RagError::Config("Could not determine config directory".into()))?;
    Ok(base.join("pdf-rag"))
}

/// Print the effective configuration to stdout
#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    println!("Configuration ({})", config.config_file_path().display());
    println!();
    println!("Ollama:");
    println!("  URL: {}://{}:{}", config.ollama.protocol, config.ollama.host, config.ollama.port);
    println!("  Embedding model: {}", config.ollama.embedding_model);
    println!("  Chat model: {}", config.ollama.chat_model);
    println!("  Batch size: {}", config.ollama.batch_size);
    println!();
    println!("Chunking:");
    println!("  Chunk size: {} chars", config.chunking.chunk_size);
    println!("  Chunk overlap: {} chars", config.chunking.chunk_overlap);
    println!();
    println!("Query:");
    println!("  Top k: {}", config.query.top_k);
    println!("  Max tokens: {}", config.query.max_tokens);
    println!("  Temperature: {}", config.query.temperature);

    Ok(())
}
