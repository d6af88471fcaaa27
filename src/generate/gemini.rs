//! Generative Language API text generation (`generateContent`)

use super::{GenerationRequest, Generator};
use crate::config::GenerationConfig;
use crate::error::{GenerationFailure, Result};
use crate::gemini::GeminiClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub struct GeminiGenerator {
    client: GeminiClient,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationSettings,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationSettings {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn into_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

impl GeminiGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self::with_client(GeminiClient::new(config)?, config))
    }

    pub fn with_client(client: GeminiClient, config: &GenerationConfig) -> Self {
        Self {
            client,
            model: config.model.trim_start_matches("models/").to_string(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> std::result::Result<String, GenerationFailure> {
        let body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: &request.system,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationSettings {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        let url = self
            .client
            .endpoint(&self.model, "generateContent")
            .map_err(|e| GenerationFailure::Transport(e.to_string()))?;

        debug!("Generating with {}", self.model);
        let response: GenerateContentResponse = self.client.post(url, &body).await?;

        let text = response.into_text().trim().to_string();
        if text.is_empty() {
            return Err(GenerationFailure::Empty);
        }
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
