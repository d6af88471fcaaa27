//! Generative Language API client shared by embeddings and generation
//!
//! One call, one attempt: failures are returned as a [`GenerationFailure`]
//! tag and never retried here.

use crate::config::GenerationConfig;
use crate::error::{Error, GenerationFailure, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Self::with_key(config, config.api_key())
    }

    /// Build with an explicit key instead of reading the environment
    pub fn with_key(config: &GenerationConfig, api_key: Option<String>) -> Result<Self> {
        let base_url = Url::parse(&config.api_base_url)?;
        let timeout = config.timeout();
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
            timeout,
        })
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// `{base}/v1beta/models/{model}:{method}`
    pub fn endpoint(&self, model: &str, method: &str) -> Result<Url> {
        let model = model.trim_start_matches("models/");
        self.base_url
            .join(&format!("/v1beta/models/{}:{}", model, method))
            .map_err(|e| Error::Config(format!("Invalid generation API URL: {}", e)))
    }

    /// POST a JSON body and decode the JSON response
    pub async fn post<B, R>(&self, url: Url, body: &B) -> std::result::Result<R, GenerationFailure>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GenerationFailure::MissingCredential)?;

        debug!("POST {}", url);
        let request = self
            .client
            .post(url)
            .header(API_KEY_HEADER, api_key)
            .json(body)
            .send();

        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| GenerationFailure::Timeout)??;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(GenerationFailure::Status {
                status: status.as_u16(),
                body: truncate(&body, 500),
            });
        }

        let bytes = tokio::time::timeout(self.timeout, response.bytes())
            .await
            .map_err(|_| GenerationFailure::Timeout)??;
        serde_json::from_slice(&bytes).map_err(|e| GenerationFailure::Malformed(e.to_string()))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(max_chars).collect();
        out.push('…');
        out
    }
}
