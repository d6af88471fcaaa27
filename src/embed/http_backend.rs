//! Embedding sidecar over HTTP (`POST /v1/embed/text`)

use super::{validate_dimensions, Embedder};
use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Serialize)]
struct EmbedTextRequest<'a> {
    model: &'a str,
    inputs: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum EmbeddingResponse {
    Embeddings { embeddings: Vec<Vec<f32>> },
    Vectors { vectors: Vec<Vec<f32>> },
    Data { data: Vec<EmbeddingData> },
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl EmbeddingResponse {
    fn into_embeddings(self) -> Vec<Vec<f32>> {
        match self {
            EmbeddingResponse::Embeddings { embeddings } => embeddings,
            EmbeddingResponse::Vectors { vectors } => vectors,
            EmbeddingResponse::Data { data } => data.into_iter().map(|d| d.embedding).collect(),
        }
    }
}

pub struct HttpEmbedder {
    client: Client,
    endpoint: Url,
    model_id: String,
    dimension: usize,
    retries: usize,
    timeout: Duration,
}

impl HttpEmbedder {
    /// `timeout` bounds a whole `embed` call, retries included
    pub fn new(config: &EmbeddingConfig, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(&config.backend_url)?;
        let endpoint = base_url
            .join("/v1/embed/text")
            .map_err(|e| Error::Config(format!("Invalid embedding backend URL: {}", e)))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            model_id: config.model.clone(),
            dimension: config.resolved_dimension(),
            retries: 2,
            timeout,
        })
    }

    /// Retries only transport and status failures; decoding errors are final
    async fn send_with_retry(&self, request: &EmbedTextRequest<'_>) -> Result<EmbeddingResponse> {
        let mut last_err: Option<Error> = None;
        for attempt in 0..=self.retries {
            let sent = self
                .client
                .post(self.endpoint.clone())
                .json(request)
                .send()
                .await
                .and_then(|r| r.error_for_status());

            match sent {
                Ok(response) => return Ok(response.json::<EmbeddingResponse>().await?),
                Err(e) => last_err = Some(Error::Embedding(e.to_string())),
            }

            if attempt < self.retries {
                tokio::time::sleep(Duration::from_millis(200 * (attempt + 1) as u64)).await;
            }
        }

        Err(last_err.unwrap_or_else(|| {
            Error::Embedding("Embedding backend request failed".to_string())
        }))
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbedTextRequest {
            model: &self.model_id,
            inputs: texts,
        };
        let embeddings = tokio::time::timeout(self.timeout, self.send_with_retry(&request))
            .await
            .map_err(|_| {
                Error::Embedding(format!(
                    "embedding backend did not answer within {}s",
                    self.timeout.as_secs_f32()
                ))
            })??
            .into_embeddings();
        validate_dimensions(&self.model_id, self.dimension, &embeddings)?;
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> EmbeddingConfig {
        EmbeddingConfig {
            backend_url: server.uri(),
            model: "custom-model".to_string(),
            dimension: 2,
            ..EmbeddingConfig::default()
        }
    }

    #[tokio::test]
    async fn test_accepts_each_response_shape() {
        for body in [
            serde_json::json!({"embeddings": [[1.0, 0.0]]}),
            serde_json::json!({"vectors": [[1.0, 0.0]]}),
            serde_json::json!({"data": [{"embedding": [1.0, 0.0]}]}),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/v1/embed/text"))
                .and(body_partial_json(serde_json::json!({"model": "custom-model"})))
                .respond_with(ResponseTemplate::new(200).set_body_json(body))
                .mount(&server)
                .await;

            let embedder = HttpEmbedder::new(&config_for(&server), Duration::from_secs(30)).unwrap();
            let vectors = embedder.embed(vec!["iron".to_string()]).await.unwrap();
            assert_eq!(vectors, vec![vec![1.0, 0.0]]);
        }
    }

    #[tokio::test]
    async fn test_retries_then_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(&config_for(&server), Duration::from_secs(30)).unwrap();
        let err = embedder.embed(vec!["iron".to_string()]).await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }

    #[tokio::test]
    async fn test_whole_call_is_bounded_by_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"embeddings": [[1.0, 0.0]]}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(&config_for(&server), Duration::from_secs(1)).unwrap();
        let started = std::time::Instant::now();
        let err = embedder.embed(vec!["iron".to_string()]).await.unwrap_err();

        assert!(matches!(err, Error::Embedding(_)));
        assert!(started.elapsed() < Duration::from_millis(2500));
    }
}
