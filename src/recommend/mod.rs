//! Caregiver recommendations
//!
//! A grounded answer is attempted once; on any failure the rule-based
//! text is returned instead. Mixed results are never produced.

mod fallback;

pub use fallback::*;

use crate::growth::{Diagnosis, Sex};
use crate::rag::Answerer;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// `model_used` value for rule-based results
pub const FALLBACK_MODEL: &str = "fallback";

/// Language of the generated recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Indonesian,
}

impl Language {
    /// Indonesian for codes starting with `id`, English otherwise
    pub fn from_code(code: &str) -> Self {
        if code.trim().to_lowercase().starts_with("id") {
            Language::Indonesian
        } else {
            Language::English
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::English => write!(f, "English"),
            Language::Indonesian => write!(f, "Indonesian"),
        }
    }
}

/// Measurements and caregiver-supplied details for one child
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientContext {
    pub age_months: u32,
    pub sex: Sex,
    pub weight_kg: f64,
    pub height_cm: f64,

    #[serde(default)]
    pub language: Option<String>,

    #[serde(default)]
    pub allergies: Vec<String>,

    #[serde(default)]
    pub preferences: Vec<String>,

    #[serde(default)]
    pub notes: Option<String>,
}

impl PatientContext {
    pub fn new(age_months: u32, sex: Sex, weight_kg: f64, height_cm: f64) -> Self {
        Self {
            age_months,
            sex,
            weight_kg,
            height_cm,
            language: None,
            allergies: Vec::new(),
            preferences: Vec::new(),
            notes: None,
        }
    }
}

/// The recommendation returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub diagnosis: Diagnosis,
    pub markdown: String,
    pub model_used: String,
    pub used_fallback: bool,
}

impl RecommendationResult {
    pub fn fallback(diagnosis: &Diagnosis, patient: &PatientContext) -> Self {
        Self {
            diagnosis: *diagnosis,
            markdown: fallback_markdown(diagnosis, patient),
            model_used: FALLBACK_MODEL.to_string(),
            used_fallback: true,
        }
    }
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

/// Question sent to the answerer for this child
pub fn compose_question(diagnosis: &Diagnosis, patient: &PatientContext, language: Language) -> String {
    let results = diagnosis
        .iter()
        .map(|a| format!("- {}: {} (z={:.2})", a.indicator, a.label, a.z))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Create next-step recommendations to prevent or address stunting for this child.\n\
Use simple, practical and empathetic {language}.\n\
\n\
PATIENT:\n\
- age (months): {age}\n\
- sex: {sex}\n\
- weight (kg): {weight}\n\
- height/length (cm): {height}\n\
- allergies: {allergies}\n\
- preferences: {preferences}\n\
- notes: {notes}\n\
\n\
WHO RESULTS:\n\
{results}\n\
\n\
REQUESTED OUTPUT (Markdown):\n\
1) Summary of the results (1-2 sentences).\n\
2) Action steps for the next 7 days (bullets).\n\
3) Menu and food ideas (bullets), focused on animal protein and local variety.\n\
4) Danger signs that need a health worker (bullets).\n\
Do not give medication doses. If there is wasting, stress that a health worker must evaluate the child.",
        language = language,
        age = patient.age_months,
        sex = patient.sex,
        weight = patient.weight_kg,
        height = patient.height_cm,
        allergies = list_or_none(&patient.allergies),
        preferences = list_or_none(&patient.preferences),
        notes = patient.notes.as_deref().unwrap_or("none"),
        results = results,
    )
}

/// Grounded answer first, rule-based text on any failure
pub struct Composer {
    answerer: Answerer,
    default_language: String,
}

impl Composer {
    pub fn new(answerer: Answerer, default_language: &str) -> Self {
        Self {
            answerer,
            default_language: default_language.to_string(),
        }
    }

    pub fn answerer(&self) -> &Answerer {
        &self.answerer
    }

    pub async fn compose(&self, diagnosis: &Diagnosis, patient: &PatientContext) -> RecommendationResult {
        let language = Language::from_code(
            patient
                .language
                .as_deref()
                .unwrap_or(&self.default_language),
        );
        let question = compose_question(diagnosis, patient, language);

        match self.answerer.answer(&question).await {
            Ok(grounded) => {
                info!(
                    "Recommendation generated by {} from {} sources",
                    grounded.model,
                    grounded.sources.len()
                );
                RecommendationResult {
                    diagnosis: *diagnosis,
                    markdown: grounded.answer,
                    model_used: grounded.model,
                    used_fallback: false,
                }
            }
            Err(reason) => {
                warn!("Using rule-based recommendation: {}", reason);
                RecommendationResult::fallback(diagnosis, patient)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::GuidelineChunk;
    use crate::embed::testing::KeywordEmbedder;
    use crate::error::GenerationFailure;
    use crate::growth::{Assessment, DiagnosisLabel, Indicator};
    use crate::rag::testing::ScriptedGenerator;
    use crate::store::{SqliteBackend, VectorIndex};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn stunted() -> Diagnosis {
        let assess = |indicator, z, label| Assessment {
            indicator,
            z,
            label,
        };
        Diagnosis {
            height_for_age: assess(Indicator::HeightForAge, -2.5, DiagnosisLabel::Stunted),
            weight_for_age: assess(Indicator::WeightForAge, -1.0, DiagnosisLabel::Normal),
            weight_for_height: assess(Indicator::WeightForHeight, 0.2, DiagnosisLabel::Normal),
        }
    }

    async fn composer(dir: &TempDir, generator: ScriptedGenerator, build: bool) -> Composer {
        let backend = SqliteBackend::new(&dir.path().join("index.db"), "guidelines");
        let index = VectorIndex::new(Box::new(backend), Arc::new(KeywordEmbedder::nutrition()), 8);
        if build {
            index
                .upsert(&[GuidelineChunk::new(
                    "stunting.md",
                    None,
                    "Stunting prevention: iron rich foods every day",
                )])
                .await
                .unwrap();
        }
        let answerer = Answerer::new(Arc::new(index), Arc::new(generator), 4);
        Composer::new(answerer, "en")
    }

    #[test]
    fn test_language_from_code() {
        assert_eq!(Language::from_code("id"), Language::Indonesian);
        assert_eq!(Language::from_code("id-ID"), Language::Indonesian);
        assert_eq!(Language::from_code("en"), Language::English);
        assert_eq!(Language::from_code(""), Language::English);
    }

    #[test]
    fn test_question_lists_context() {
        let mut patient = PatientContext::new(14, Sex::Male, 8.1, 72.0);
        patient.allergies = vec!["peanut".to_string()];
        let question = compose_question(&stunted(), &patient, Language::Indonesian);

        assert!(question.contains("empathetic Indonesian"));
        assert!(question.contains("- age (months): 14"));
        assert!(question.contains("- allergies: peanut"));
        assert!(question.contains("- preferences: none"));
        assert!(question.contains("- height-for-age: stunted (z=-2.50)"));
    }

    #[tokio::test]
    async fn test_grounded_recommendation() {
        let dir = TempDir::new().unwrap();
        let composer = composer(&dir, ScriptedGenerator::answering("## Plan\nIron daily."), true).await;

        let result = composer
            .compose(&stunted(), &PatientContext::new(14, Sex::Male, 8.1, 72.0))
            .await;
        assert!(!result.used_fallback);
        assert_eq!(result.model_used, "scripted-model");
        assert_eq!(result.markdown, "## Plan\nIron daily.");
    }

    #[tokio::test]
    async fn test_generation_failure_falls_back() {
        let dir = TempDir::new().unwrap();
        let generator = ScriptedGenerator::failing(GenerationFailure::Timeout);
        let composer = composer(&dir, generator, true).await;

        let patient = PatientContext::new(10, Sex::Female, 7.5, 69.0);
        let result = composer.compose(&stunted(), &patient).await;
        assert!(result.used_fallback);
        assert_eq!(result.model_used, FALLBACK_MODEL);
        assert_eq!(result.markdown, fallback_markdown(&stunted(), &patient));
    }

    #[tokio::test]
    async fn test_missing_index_falls_back() {
        let dir = TempDir::new().unwrap();
        let composer = composer(&dir, ScriptedGenerator::answering("unused"), false).await;

        let result = composer
            .compose(&stunted(), &PatientContext::new(30, Sex::Female, 11.0, 88.0))
            .await;
        assert!(result.used_fallback);
        assert!(result.markdown.to_lowercase().contains("family meal"));
    }
}
