//! WHO child-growth z-scores and classification
//!
//! Reference tables are loaded once into [`GrowthStandards`] and shared
//! read-only across requests. A diagnosis computes all three indicators
//! from one set of measurements.

mod classify;
mod lms;
mod reference;

pub use classify::*;
pub use lms::*;
pub use reference::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Child sex as used by the WHO tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Female,
    Male,
}

impl Sex {
    /// File stem used by the reference table layout
    pub fn table_stem(&self) -> &'static str {
        match self {
            Sex::Female => "girls",
            Sex::Male => "boys",
        }
    }
}

impl std::fmt::Display for Sex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sex::Female => write!(f, "female"),
            Sex::Male => write!(f, "male"),
        }
    }
}

impl FromStr for Sex {
    type Err = Error;

    /// Accepts `female`/`male`, `f`/`m`, `girl`/`boy`, and the numeric
    /// codes `0` (female) and `1` (male).
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "female" | "f" | "girl" | "girls" | "0" => Ok(Sex::Female),
            "male" | "m" | "boy" | "boys" | "1" => Ok(Sex::Male),
            other => Err(Error::Domain(format!("unknown sex '{}'", other))),
        }
    }
}

/// Growth indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Indicator {
    HeightForAge,
    WeightForAge,
    WeightForHeight,
}

impl Indicator {
    pub const ALL: [Indicator; 3] = [
        Indicator::HeightForAge,
        Indicator::WeightForAge,
        Indicator::WeightForHeight,
    ];

    /// Short WHO code (HAZ, WAZ, WHZ)
    pub fn code(&self) -> &'static str {
        match self {
            Indicator::HeightForAge => "HAZ",
            Indicator::WeightForAge => "WAZ",
            Indicator::WeightForHeight => "WHZ",
        }
    }

    pub fn key_kind(&self) -> KeyKind {
        match self {
            Indicator::WeightForHeight => KeyKind::Length,
            _ => KeyKind::Month,
        }
    }

    fn table_file(&self, sex: Sex) -> String {
        match self {
            Indicator::HeightForAge => format!("height-for-age/{}-monthly.csv", sex.table_stem()),
            Indicator::WeightForAge => format!("weight-for-age/{}-monthly.csv", sex.table_stem()),
            Indicator::WeightForHeight => format!("weight-for-height/{}.csv", sex.table_stem()),
        }
    }
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Indicator::HeightForAge => write!(f, "height-for-age"),
            Indicator::WeightForAge => write!(f, "weight-for-age"),
            Indicator::WeightForHeight => write!(f, "weight-for-height"),
        }
    }
}

/// z-score and label for one indicator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub indicator: Indicator,
    pub z: f64,
    pub label: DiagnosisLabel,
}

/// Labels for all three indicators
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub height_for_age: Assessment,
    pub weight_for_age: Assessment,
    pub weight_for_height: Assessment,
}

impl Diagnosis {
    pub fn iter(&self) -> impl Iterator<Item = &Assessment> {
        [&self.height_for_age, &self.weight_for_age, &self.weight_for_height].into_iter()
    }

    /// `(indicator, label)` pairs in HAZ, WAZ, WHZ order
    pub fn labels(&self) -> Vec<(Indicator, DiagnosisLabel)> {
        self.iter().map(|a| (a.indicator, a.label)).collect()
    }

    pub fn has_label(&self, label: DiagnosisLabel) -> bool {
        self.iter().any(|a| a.label == label)
    }
}

impl std::fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|a| format!("{}: {} (z={:.2})", a.indicator, a.label, a.z))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// One table per (indicator, sex)
#[derive(Debug, Clone)]
pub struct GrowthStandards {
    tables: [[ReferenceTable; 2]; 3],
}

impl GrowthStandards {
    /// Load every reference table under `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::Config(format!(
                "growth tables directory not found: {}",
                dir.display()
            )));
        }

        let load_pair = |indicator: Indicator| -> Result<[ReferenceTable; 2]> {
            Ok([
                ReferenceTable::load(
                    &dir.join(indicator.table_file(Sex::Female)),
                    indicator,
                    Sex::Female,
                    indicator.key_kind(),
                )?,
                ReferenceTable::load(
                    &dir.join(indicator.table_file(Sex::Male)),
                    indicator,
                    Sex::Male,
                    indicator.key_kind(),
                )?,
            ])
        };

        let standards = Self {
            tables: [
                load_pair(Indicator::HeightForAge)?,
                load_pair(Indicator::WeightForAge)?,
                load_pair(Indicator::WeightForHeight)?,
            ],
        };

        info!("Loaded WHO growth tables from {}", dir.display());
        Ok(standards)
    }

    pub fn table(&self, indicator: Indicator, sex: Sex) -> &ReferenceTable {
        let i = match indicator {
            Indicator::HeightForAge => 0,
            Indicator::WeightForAge => 1,
            Indicator::WeightForHeight => 2,
        };
        let j = match sex {
            Sex::Female => 0,
            Sex::Male => 1,
        };
        &self.tables[i][j]
    }

    /// z-score for a single indicator; `key` is months or centimetres
    pub fn zscore(&self, indicator: Indicator, sex: Sex, key: f64, measurement: f64) -> Result<f64> {
        let lms = self.table(indicator, sex).lookup(key)?;
        lms.zscore(measurement)
    }

    pub fn assess(&self, indicator: Indicator, sex: Sex, key: f64, measurement: f64) -> Result<Assessment> {
        let z = self.zscore(indicator, sex, key, measurement)?;
        Ok(Assessment {
            indicator,
            z,
            label: classify(indicator, z)?,
        })
    }

    /// Compute all three indicators for one child
    pub fn diagnose(&self, sex: Sex, age_months: u32, weight_kg: f64, height_cm: f64) -> Result<Diagnosis> {
        if !weight_kg.is_finite() || weight_kg <= 0.0 {
            return Err(Error::Domain(format!("weight must be positive, got {}", weight_kg)));
        }
        if !height_cm.is_finite() || height_cm <= 0.0 {
            return Err(Error::Domain(format!("height must be positive, got {}", height_cm)));
        }

        let age = age_months as f64;
        let diagnosis = Diagnosis {
            height_for_age: self.assess(Indicator::HeightForAge, sex, age, height_cm)?,
            weight_for_age: self.assess(Indicator::WeightForAge, sex, age, weight_kg)?,
            weight_for_height: self.assess(Indicator::WeightForHeight, sex, height_cm, weight_kg)?,
        };

        debug!("Diagnosis for {} at {} months: {}", sex, age_months, diagnosis);
        Ok(diagnosis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn fixture_standards() -> GrowthStandards {
        let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/who");
        GrowthStandards::load(&dir).unwrap()
    }

    #[test]
    fn test_sex_parsing() {
        assert_eq!("F".parse::<Sex>().unwrap(), Sex::Female);
        assert_eq!("0".parse::<Sex>().unwrap(), Sex::Female);
        assert_eq!("boy".parse::<Sex>().unwrap(), Sex::Male);
        assert_eq!("1".parse::<Sex>().unwrap(), Sex::Male);
        assert!("x".parse::<Sex>().unwrap_err().is_user_error());
    }

    #[test]
    fn test_diagnose_at_medians_is_normal() {
        let standards = fixture_standards();

        let diagnosis = standards.diagnose(Sex::Female, 6, 7.297, 65.7).unwrap();
        assert_eq!(diagnosis.weight_for_age.label, DiagnosisLabel::Normal);
        assert!(diagnosis.weight_for_age.z.abs() < 1e-9);
        assert!((diagnosis.height_for_age.z - (65.7 / 65.7311 - 1.0) / 0.03448).abs() < 1e-12);
        assert_eq!(diagnosis.height_for_age.label, DiagnosisLabel::Normal);
        assert_eq!(diagnosis.weight_for_height.label, DiagnosisLabel::Normal);
    }

    #[test]
    fn test_diagnose_stunted_child() {
        let standards = fixture_standards();

        // 60 cm at 6 months is about -2.5 SD
        let diagnosis = standards.diagnose(Sex::Female, 6, 5.7, 60.0).unwrap();
        assert_eq!(diagnosis.height_for_age.label, DiagnosisLabel::Stunted);
        assert!(diagnosis.has_label(DiagnosisLabel::Stunted));
        assert_eq!(diagnosis.labels()[0], (Indicator::HeightForAge, DiagnosisLabel::Stunted));
    }

    #[test]
    fn test_diagnose_rejects_untabulated_inputs() {
        let standards = fixture_standards();

        let err = standards.diagnose(Sex::Female, 13, 7.3, 65.7).unwrap_err();
        assert!(matches!(err, Error::ReferenceNotFound { .. }));

        let err = standards.diagnose(Sex::Female, 6, 7.3, 65.75).unwrap_err();
        assert!(matches!(err, Error::ReferenceNotFound { .. }));

        let err = standards.diagnose(Sex::Female, 6, 0.0, 65.7).unwrap_err();
        assert!(matches!(err, Error::Domain(_)));
    }

    #[test]
    fn test_load_missing_dir() {
        let dir = TempDir::new().unwrap();
        let result = GrowthStandards::load(&dir.path().join("nope"));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
