//! Table-driven z-score classification
//!
//! Each indicator owns an ordered list of bands. Adjacent bands share a
//! boundary value and exactly one of them includes it, so every finite
//! z-score maps to exactly one label.

use super::Indicator;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Diagnosis label produced by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosisLabel {
    SeverelyStunted,
    Stunted,
    Normal,
    Tall,
    SeverelyUnderweight,
    Underweight,
    OverweightForAge,
    SevereWasting,
    ModerateWasting,
    AtRiskOverweight,
    Overweight,
    Obese,
}

impl DiagnosisLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SeverelyStunted => "severely-stunted",
            Self::Stunted => "stunted",
            Self::Normal => "normal",
            Self::Tall => "tall",
            Self::SeverelyUnderweight => "severely-underweight",
            Self::Underweight => "underweight",
            Self::OverweightForAge => "overweight-for-age",
            Self::SevereWasting => "severe-wasting",
            Self::ModerateWasting => "moderate-wasting",
            Self::AtRiskOverweight => "at-risk-overweight",
            Self::Overweight => "overweight",
            Self::Obese => "obese",
        }
    }
}

impl std::fmt::Display for DiagnosisLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One end of a band
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Edge {
    Unbounded,
    Inclusive(f64),
    Exclusive(f64),
}

/// A contiguous z-score interval mapped to a label
#[derive(Debug, Clone, Copy)]
pub struct Band {
    pub lower: Edge,
    pub upper: Edge,
    pub label: DiagnosisLabel,
}

impl Band {
    const fn new(lower: Edge, upper: Edge, label: DiagnosisLabel) -> Self {
        Self { lower, upper, label }
    }

    pub fn contains(&self, z: f64) -> bool {
        let above = match self.lower {
            Edge::Unbounded => true,
            Edge::Inclusive(v) => z >= v,
            Edge::Exclusive(v) => z > v,
        };
        let below = match self.upper {
            Edge::Unbounded => true,
            Edge::Inclusive(v) => z <= v,
            Edge::Exclusive(v) => z < v,
        };
        above && below
    }
}

use DiagnosisLabel as D;
use Edge::{Exclusive as Ex, Inclusive as In, Unbounded};

const HEIGHT_FOR_AGE: [Band; 4] = [
    Band::new(Unbounded, Ex(-3.0), D::SeverelyStunted),
    Band::new(In(-3.0), Ex(-2.0), D::Stunted),
    Band::new(In(-2.0), In(2.0), D::Normal),
    Band::new(Ex(2.0), Unbounded, D::Tall),
];

const WEIGHT_FOR_AGE: [Band; 4] = [
    Band::new(Unbounded, Ex(-3.0), D::SeverelyUnderweight),
    Band::new(In(-3.0), Ex(-2.0), D::Underweight),
    Band::new(In(-2.0), In(2.0), D::Normal),
    Band::new(Ex(2.0), Unbounded, D::OverweightForAge),
];

const WEIGHT_FOR_HEIGHT: [Band; 6] = [
    Band::new(Unbounded, Ex(-3.0), D::SevereWasting),
    Band::new(In(-3.0), Ex(-2.0), D::ModerateWasting),
    Band::new(In(-2.0), In(1.0), D::Normal),
    Band::new(Ex(1.0), In(2.0), D::AtRiskOverweight),
    Band::new(Ex(2.0), In(3.0), D::Overweight),
    Band::new(Ex(3.0), Unbounded, D::Obese),
];

/// Ordered bands for an indicator, lowest first
pub fn bands(indicator: Indicator) -> &'static [Band] {
    match indicator {
        Indicator::HeightForAge => &HEIGHT_FOR_AGE,
        Indicator::WeightForAge => &WEIGHT_FOR_AGE,
        Indicator::WeightForHeight => &WEIGHT_FOR_HEIGHT,
    }
}

/// Map a z-score to its diagnosis label
pub fn classify(indicator: Indicator, z: f64) -> Result<DiagnosisLabel> {
    if !z.is_finite() {
        return Err(Error::Domain(format!("cannot classify z-score {}", z)));
    }

    bands(indicator)
        .iter()
        .find(|band| band.contains(z))
        .map(|band| band.label)
        .ok_or_else(|| {
            Error::Domain(format!("z-score {} falls outside the {} bands", z, indicator))
        })
}
