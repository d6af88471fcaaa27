//! Recommend command implementation

use crate::error::Result;
use crate::recommend::{PatientContext, RecommendationResult};
use crate::service::GrowthGuide;

pub async fn cmd_recommend(guide: &GrowthGuide, patient: &PatientContext) -> Result<RecommendationResult> {
    guide.assess(patient).await
}

pub fn print_recommendation(result: &RecommendationResult) {
    println!("\n{}\n", result.diagnosis);
    println!("{}\n", result.markdown);

    if result.used_fallback {
        println!("Source: rule-based recommendation (guideline answer unavailable)");
    } else {
        println!("Source: generated by {} from guideline context", result.model_used);
    }
}
