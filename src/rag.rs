//! Retrieval-augmented answering over the guideline index
//!
//! Retrieve the top-k chunks, ground the generation prompt in them and make
//! exactly one generation call. Any failure is reported as an
//! [`Unavailable`] reason for the caller to act on.

use crate::error::Unavailable;
use crate::generate::{GenerationRequest, Generator};
use crate::store::{ScoredChunk, VectorIndex};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

const SYSTEM_INSTRUCTION: &str = "You are a child nutrition education assistant. \
Answer only from the guideline context provided below.\n\
If the context is not sufficient, say honestly what is not known and suggest \
consulting a health worker.\n\
Write practical Markdown.";

/// A generated answer with the chunks it was grounded on
#[derive(Debug, Clone, Serialize)]
pub struct GroundedAnswer {
    pub answer: String,
    pub model: String,
    pub sources: Vec<ScoredChunk>,
}

pub struct Answerer {
    index: Arc<VectorIndex>,
    generator: Arc<dyn Generator>,
    top_k: usize,
}

impl Answerer {
    pub fn new(index: Arc<VectorIndex>, generator: Arc<dyn Generator>, top_k: usize) -> Self {
        Self {
            index,
            generator,
            top_k,
        }
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    /// Top-k chunks for the question; an empty result is `NoContext`
    pub async fn retrieve(&self, question: &str) -> Result<Vec<ScoredChunk>, Unavailable> {
        let chunks = self.index.query(question, self.top_k).await?;
        if chunks.is_empty() {
            return Err(Unavailable::NoContext);
        }
        debug!("Retrieved {} chunks", chunks.len());
        Ok(chunks)
    }

    /// Answer from retrieved guideline context with a single generation call
    pub async fn answer(&self, question: &str) -> Result<GroundedAnswer, Unavailable> {
        let sources = self.retrieve(question).await?;
        let request = compose_request(question, &sources);

        let answer = self.generator.generate(&request).await?;
        info!(
            "Answered from {} guideline chunks with {}",
            sources.len(),
            self.generator.model_name()
        );

        Ok(GroundedAnswer {
            answer,
            model: self.generator.model_name().to_string(),
            sources,
        })
    }
}

/// System instruction carrying the numbered context, question as the user turn
pub fn compose_request(question: &str, sources: &[ScoredChunk]) -> GenerationRequest {
    let context = sources
        .iter()
        .enumerate()
        .map(|(i, hit)| format!("[{}] {}\n{}", i + 1, hit.chunk.citation(), hit.chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n");

    GenerationRequest {
        system: format!("{}\n\nGUIDELINE CONTEXT:\n{}", SYSTEM_INSTRUCTION, context),
        prompt: question.trim().to_string(),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::GenerationFailure;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    /// Generator returning a canned outcome and recording requests
    pub struct ScriptedGenerator {
        pub outcome: Result<String, GenerationFailure>,
        pub requests: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedGenerator {
        pub fn answering(text: &str) -> Self {
            Self {
                outcome: Ok(text.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(failure: GenerationFailure) -> Self {
            Self {
                outcome: Err(failure),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationFailure> {
            self.requests.lock().await.push(request.clone());
            self.outcome.clone()
        }

        fn model_name(&self) -> &str {
            "scripted-model"
        }
    }
}
