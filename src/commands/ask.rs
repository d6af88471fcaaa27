//! Ask command implementation

use crate::service::GrowthGuide;
use serde::Serialize;
use tracing::warn;

/// Either a grounded answer or the reason there is none
#[derive(Debug, Clone, Serialize)]
pub struct AskResult {
    pub question: String,
    pub answered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub async fn cmd_ask(guide: &GrowthGuide, question: &str) -> AskResult {
    match guide.ask(question).await {
        Ok(grounded) => AskResult {
            question: question.to_string(),
            answered: true,
            answer: Some(grounded.answer),
            model: Some(grounded.model),
            sources: grounded.sources.iter().map(|s| s.chunk.citation()).collect(),
            reason: None,
        },
        Err(reason) => {
            warn!("No grounded answer: {}", reason);
            AskResult {
                question: question.to_string(),
                answered: false,
                answer: None,
                model: None,
                sources: Vec::new(),
                reason: Some(reason.to_string()),
            }
        }
    }
}

pub fn print_ask_result(result: &AskResult) {
    match (&result.answer, &result.reason) {
        (Some(answer), _) => {
            println!("\n{}\n", answer);
            if !result.sources.is_empty() {
                println!("Sources:");
                for source in &result.sources {
                    println!("  - {}", source);
                }
            }
        }
        (None, Some(reason)) => println!("No answer available: {}", reason),
        (None, None) => println!("No answer available"),
    }
}
