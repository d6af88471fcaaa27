//! In-process embeddings with fastembed
//!
//! Lets the guideline index be built and queried without any network
//! access. Only models with a known dimension are accepted, so a stored
//! collection can never be filled with vectors of an unexpected length.

use super::{validate_dimensions, Embedder};
use crate::config::{embedding_dimension_for_model, EmbeddingConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// fastembed model for a configured model name
fn local_model(name: &str) -> Option<EmbeddingModel> {
    match name {
        "BAAI/bge-small-en-v1.5" => Some(EmbeddingModel::BGESmallENV15),
        "BAAI/bge-base-en-v1.5" => Some(EmbeddingModel::BGEBaseENV15),
        "sentence-transformers/all-MiniLM-L6-v2" => Some(EmbeddingModel::AllMiniLML6V2),
        "intfloat/multilingual-e5-small" => Some(EmbeddingModel::MultilingualE5Small),
        _ => None,
    }
}

pub struct FastEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
    model_name: String,
    dimension: usize,
}

impl FastEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let (kind, dimension) = local_model(&config.model)
            .zip(embedding_dimension_for_model(&config.model))
            .ok_or_else(|| {
                Error::Config(format!(
                    "embedding model '{}' is not available locally",
                    config.model
                ))
            })?;

        info!("Loading local embedding model {}", config.model);
        let model = TextEmbedding::try_new(InitOptions::new(kind).with_show_download_progress(true))
            .map_err(|e| Error::Embedding(format!("cannot load {}: {}", config.model, e)))?;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            model_name: config.model.clone(),
            dimension,
        })
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Embedding {} texts with {}", texts.len(), self.model_name);

        let model = self.model.clone();
        let vectors = tokio::task::spawn_blocking(move || {
            let model = model
                .lock()
                .map_err(|_| Error::Embedding("local embedding model lock poisoned".to_string()))?;
            model
                .embed(texts, None)
                .map_err(|e| Error::Embedding(e.to_string()))
        })
        .await
        .map_err(|e| Error::Embedding(format!("embedding task failed: {}", e)))??;

        validate_dimensions(&self.model_name, self.dimension, &vectors)?;
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_model_is_not_local() {
        let config = EmbeddingConfig {
            model: "text-embedding-004".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(local_model(&config.model).is_none());
        assert!(matches!(FastEmbedder::new(&config), Err(Error::Config(_))));
    }

    #[tokio::test]
    #[ignore = "downloads the model"]
    async fn test_multilingual_model() {
        let config = EmbeddingConfig {
            model: "intfloat/multilingual-e5-small".to_string(),
            ..EmbeddingConfig::default()
        };

        let embedder = FastEmbedder::new(&config).unwrap();
        let vectors = embedder
            .embed(vec![
                "ASI eksklusif sampai 6 bulan".to_string(),
                "Offer finger foods at 9 months".to_string(),
            ])
            .await
            .unwrap();

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), embedder.dimension());
    }
}
