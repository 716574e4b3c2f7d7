pub mod chunking;
pub mod ollama;

use crate::Result;

/// Capability seam for embedding providers.
///
/// The network-backed implementation is [`ollama::OllamaClient`]; tests use
/// in-memory fakes.
pub trait Embedder: Send + Sync {
    /// Embed a single query string
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of chunk texts, one vector per input, in input order
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
