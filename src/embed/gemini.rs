//! Generative Language API embeddings

use super::{validate_dimensions, Embedder, CREDENTIAL_NOT_SET};
use crate::config::GenerationConfig;
use crate::error::{Error, Result};
use crate::gemini::GeminiClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub struct GeminiEmbedder {
    client: GeminiClient,
    model: String,
    dimension: usize,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Serialize)]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

impl GeminiEmbedder {
    pub fn new(generation: &GenerationConfig, model: &str, dimension: usize) -> Result<Self> {
        Ok(Self::with_client(GeminiClient::new(generation)?, model, dimension))
    }

    pub fn with_client(client: GeminiClient, model: &str, dimension: usize) -> Self {
        Self {
            client,
            model: model.trim_start_matches("models/").to_string(),
            dimension,
        }
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.check_ready()?;

        debug!("Embedding {} texts with {}", texts.len(), self.model);

        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: format!("models/{}", self.model),
                    content: Content {
                        parts: vec![Part { text }],
                    },
                })
                .collect(),
        };

        let url = self.client.endpoint(&self.model, "batchEmbedContents")?;
        let response: BatchEmbedResponse = self
            .client
            .post(url, &request)
            .await
            .map_err(|failure| Error::Embedding(failure.to_string()))?;

        let embeddings: Vec<Vec<f32>> = response.embeddings.into_iter().map(|e| e.values).collect();
        if embeddings.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "requested {} embeddings, received {}",
                texts.len(),
                embeddings.len()
            )));
        }
        validate_dimensions(&self.model, self.dimension, &embeddings)?;
        Ok(embeddings)
    }

    fn check_ready(&self) -> Result<()> {
        if self.client.has_credential() {
            Ok(())
        } else {
            Err(Error::Embedding(CREDENTIAL_NOT_SET.to_string()))
        }
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
