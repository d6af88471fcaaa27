//! Text generation
//!
//! One request, one attempt. Every failure comes back as a
//! [`GenerationFailure`] tag so callers can branch without catching errors.

mod gemini;

pub use gemini::*;

use crate::config::Config;
use crate::error::{GenerationFailure, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// A single prompt for the generation service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Instruction that constrains how the model answers
    pub system: String,

    /// User turn
    pub prompt: String,
}

/// Trait for generation providers
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a non-empty answer for the request
    async fn generate(&self, request: &GenerationRequest) -> std::result::Result<String, GenerationFailure>;

    /// Model identifier reported in results
    fn model_name(&self) -> &str;
}

/// Create the configured generator
pub fn create_generator(config: &Config) -> Result<Arc<dyn Generator>> {
    Ok(Arc::new(GeminiGenerator::new(&config.generation)?))
}

/// Stand-in for a generator that could not be constructed; every call fails
pub struct UnconfiguredGenerator {
    model: String,
    reason: String,
}

impl UnconfiguredGenerator {
    pub fn new(model: &str, reason: impl Into<String>) -> Self {
        Self {
            model: model.to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Generator for UnconfiguredGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> std::result::Result<String, GenerationFailure> {
        Err(GenerationFailure::Unconfigured(self.reason.clone()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_generator_always_fails() {
        let generator = UnconfiguredGenerator::new("gemini-2.5-flash", "relative URL without a base");
        let request = GenerationRequest {
            system: "context".to_string(),
            prompt: "question".to_string(),
        };

        assert_eq!(
            generator.generate(&request).await.unwrap_err(),
            GenerationFailure::Unconfigured("relative URL without a base".to_string())
        );
        assert_eq!(generator.model_name(), "gemini-2.5-flash");
    }

    #[test]
    fn test_bad_base_url_fails_construction() {
        let mut config = Config::default();
        config.generation.api_base_url = "not a url".to_string();
        assert!(create_generator(&config).is_err());
    }
}
