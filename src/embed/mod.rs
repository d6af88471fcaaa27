//! Embedding generation
//!
//! This module provides an abstraction over embedding services with:
//! - A trait for different embedding backends
//! - The Generative Language API (`batchEmbedContents`)
//! - An HTTP sidecar backend
//! - A local fastembed model behind the `local-embed` feature
//! - Batch processing for efficiency

#[cfg(feature = "local-embed")]
mod fastembed_impl;
mod gemini;
mod http_backend;

#[cfg(feature = "local-embed")]
pub use fastembed_impl::*;
pub use gemini::*;
pub use http_backend::*;

use crate::config::{Config, EmbeddingProvider};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// `check_ready` reason when the API key is missing
pub const CREDENTIAL_NOT_SET: &str = "embedding credential not set";

/// `check_ready` reason prefix when the provider could not be constructed
pub const PROVIDER_UNAVAILABLE: &str = "embedding provider unavailable";

/// Trait for embedding providers
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Fail early when the provider cannot possibly succeed (e.g. no credential)
    fn check_ready(&self) -> Result<()> {
        Ok(())
    }

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create an embedder based on configuration
pub fn create_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    let embedding = &config.embedding;
    info!(
        "Using {} embeddings with model {}",
        embedding.provider, embedding.model
    );

    match embedding.provider {
        EmbeddingProvider::Gemini => Ok(Arc::new(GeminiEmbedder::new(
            &config.generation,
            &embedding.model,
            embedding.resolved_dimension(),
        )?)),
        EmbeddingProvider::Http => Ok(Arc::new(HttpEmbedder::new(
            embedding,
            config.generation.timeout(),
        )?)),
        #[cfg(feature = "local-embed")]
        EmbeddingProvider::Local => Ok(Arc::new(FastEmbedder::new(embedding)?)),
        #[cfg(not(feature = "local-embed"))]
        EmbeddingProvider::Local => Err(Error::Config(
            "embedding.provider = \"local\" requires the 'local-embed' feature".to_string(),
        )),
    }
}

/// Helper to embed in batches
pub async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: Vec<String>,
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut all_embeddings = Vec::with_capacity(texts.len());

    for chunk in texts.chunks(batch_size.max(1)) {
        let batch_texts: Vec<String> = chunk.to_vec();
        let expected = batch_texts.len();
        let embeddings = embedder.embed(batch_texts).await?;
        if embeddings.len() != expected {
            return Err(Error::Embedding(format!(
                "expected {} embeddings from {}, got {}",
                expected,
                embedder.model_name(),
                embeddings.len()
            )));
        }
        all_embeddings.extend(embeddings);
    }

    Ok(all_embeddings)
}

/// Stand-in for a provider that could not be constructed.
///
/// Reports not-ready with the construction error so index builds are
/// skipped and retrieval falls back instead of failing the process.
pub struct UnconfiguredEmbedder {
    model: String,
    dimension: usize,
    reason: String,
}

impl UnconfiguredEmbedder {
    pub fn new(model: &str, dimension: usize, cause: impl std::fmt::Display) -> Self {
        Self {
            model: model.to_string(),
            dimension,
            reason: format!("{}: {}", PROVIDER_UNAVAILABLE, cause),
        }
    }
}

#[async_trait]
impl Embedder for UnconfiguredEmbedder {
    async fn embed(&self, _texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        Err(Error::Embedding(self.reason.clone()))
    }

    fn check_ready(&self) -> Result<()> {
        Err(Error::Embedding(self.reason.clone()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Reject vectors whose length differs from the model dimension
pub(crate) fn validate_dimensions(model: &str, dimension: usize, embeddings: &[Vec<f32>]) -> Result<()> {
    if let Some(mismatch) = embeddings.iter().find(|vec| vec.len() != dimension) {
        return Err(Error::Embedding(format!(
            "Embedding dimension mismatch for model '{}': expected {}, got {}",
            model,
            dimension,
            mismatch.len()
        )));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::testing::KeywordEmbedder;
    use super::*;

    #[tokio::test]
    async fn test_embed_in_batches_preserves_order() {
        let embedder = KeywordEmbedder::nutrition();
        let texts: Vec<String> = vec![
            "iron".to_string(),
            "breastfeed".to_string(),
            "iron iron".to_string(),
        ];

        let vectors = embed_in_batches(&embedder, texts, 2).await.unwrap();
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[0][1], 1.0);
        assert_eq!(vectors[1][0], 1.0);
        assert_eq!(vectors[2][1], 2.0);
    }

    #[tokio::test]
    async fn test_unconfigured_embedder_is_never_ready() {
        let embedder = UnconfiguredEmbedder::new("text-embedding-004", 768, "bad URL");

        match embedder.check_ready() {
            Err(Error::Embedding(reason)) => {
                assert_eq!(reason, "embedding provider unavailable: bad URL")
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(embedder.embed(vec!["iron".to_string()]).await.is_err());
        assert_eq!(embedder.dimension(), 768);
    }

    #[cfg(not(feature = "local-embed"))]
    #[test]
    fn test_local_provider_needs_feature() {
        let mut config = Config::default();
        config.embedding.provider = EmbeddingProvider::Local;
        assert!(matches!(create_embedder(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_dimensions() {
        assert!(validate_dimensions("m", 2, &[vec![0.0, 1.0]]).is_ok());
        assert!(matches!(
            validate_dimensions("m", 3, &[vec![0.0, 1.0]]),
            Err(Error::Embedding(_))
        ));
    }

    #[cfg(not(feature = "local-embed"))]
    #[test]
    fn test_local_provider_requires_feature() {
        let mut config = Config::default();
        config.embedding.provider = EmbeddingProvider::Local;
        assert!(matches!(create_embedder(&config), Err(Error::Config(_))));
    }
}
