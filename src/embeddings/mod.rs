// Embeddings module
// Sentence-aware chunking and the embedding providers that vectorise chunk text

pub mod chunking;
pub mod hashing;
pub mod ollama;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::{Config, EmbeddingBackend};

pub use chunking::{ChunkingConfig, chunk_course, context_label, split_into_segments};
pub use hashing::HashingEmbedder;
pub use ollama::OllamaClient;

/// Turns text into fixed-dimension vectors. The same text must always yield
/// the same vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn model_name(&self) -> &str;

    fn dimensions(&self) -> usize;
}

/// Build the provider selected in `[embedding].provider`
#[inline]
pub fn build_provider(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    let dimension = config.embedding.dimension as usize;

    Ok(match config.embedding.provider {
        EmbeddingBackend::Ollama => Arc::new(
            OllamaClient::new(&config.ollama, dimension)
                .context("Failed to initialize Ollama client")?,
        ),
        EmbeddingBackend::Hashing => Arc::new(HashingEmbedder::new(dimension)),
    })
}
