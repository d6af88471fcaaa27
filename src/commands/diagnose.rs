//! Diagnose command implementation

use crate::error::Result;
use crate::growth::{Diagnosis, Sex};
use crate::service::GrowthGuide;
use tracing::info;

pub fn cmd_diagnose(
    guide: &GrowthGuide,
    sex: Sex,
    age_months: u32,
    weight_kg: f64,
    height_cm: f64,
) -> Result<Diagnosis> {
    info!(
        "Diagnosing {} child, {} months, {} kg, {} cm",
        sex, age_months, weight_kg, height_cm
    );
    guide.diagnose(sex, age_months, weight_kg, height_cm)
}

pub fn print_diagnosis(diagnosis: &Diagnosis) {
    println!("\n📏 WHO growth assessment\n");
    for assessment in diagnosis.iter() {
        println!(
            "  {} ({}): {:<22} z = {:+.2}",
            assessment.indicator,
            assessment.indicator.code(),
            assessment.label,
            assessment.z
        );
    }
    println!();
}
