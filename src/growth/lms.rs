//! WHO LMS (Lambda-Mu-Sigma) transform

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Box-Cox power, median and coefficient of variation for one reference row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lms {
    pub l: f64,
    pub m: f64,
    pub s: f64,
}

impl Lms {
    pub fn new(l: f64, m: f64, s: f64) -> Self {
        Self { l, m, s }
    }

    /// z-score of `measurement` against this row
    pub fn zscore(&self, measurement: f64) -> Result<f64> {
        zscore(measurement, self.l, self.m, self.s)
    }
}

/// Convert a raw measurement to a z-score.
///
/// `z = ((x / M)^L - 1) / (L * S)` when `L != 0`, otherwise `ln(x / M) / S`.
pub fn zscore(measurement: f64, l: f64, m: f64, s: f64) -> Result<f64> {
    if !measurement.is_finite() || measurement <= 0.0 {
        return Err(Error::Domain(format!(
            "measurement must be a positive number, got {}",
            measurement
        )));
    }
    if !m.is_finite() || m <= 0.0 {
        return Err(Error::Domain(format!("M must be positive, got {}", m)));
    }
    if !s.is_finite() || s <= 0.0 {
        return Err(Error::Domain(format!("S must be positive, got {}", s)));
    }
    if !l.is_finite() {
        return Err(Error::Domain(format!("L must be finite, got {}", l)));
    }

    let z = if l != 0.0 {
        ((measurement / m).powf(l) - 1.0) / (l * s)
    } else {
        (measurement / m).ln() / s
    };

    if !z.is_finite() {
        return Err(Error::Domain(format!(
            "z-score is not finite for measurement {} (L={}, M={}, S={})",
            measurement, l, m, s
        )));
    }

    Ok(z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_is_zero() {
        let z = zscore(65.7311, 1.0, 65.7311, 0.03448).unwrap();
        assert!(z.abs() < 1e-12);

        let z = zscore(7.297, 0.1257, 7.297, 0.11316).unwrap();
        assert!(z.abs() < 1e-12);
    }

    #[test]
    fn test_l_equal_one_is_linear() {
        // With L = 1 the transform is (x - M) / (M * S)
        let z = zscore(70.0, 1.0, 65.0, 0.04).unwrap();
        let expected = (70.0 - 65.0) / (65.0 * 0.04);
        assert!((z - expected).abs() < 1e-12);
    }

    #[test]
    fn test_l_zero_uses_log() {
        let z = zscore(12.0, 0.0, 10.0, 0.1).unwrap();
        assert!((z - (1.2f64).ln() / 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_negative_power() {
        let (l, m, s) = (-0.3521, 9.4, 0.109);
        let z = zscore(8.0, l, m, s).unwrap();
        let expected = ((8.0f64 / m).powf(l) - 1.0) / (l * s);
        assert_eq!(z, expected);
        assert!(z < 0.0);
    }

    #[test]
    fn test_rejects_invalid_inputs() {
        assert!(matches!(zscore(0.0, 1.0, 65.0, 0.04), Err(Error::Domain(_))));
        assert!(matches!(zscore(-3.0, 1.0, 65.0, 0.04), Err(Error::Domain(_))));
        assert!(matches!(zscore(f64::NAN, 1.0, 65.0, 0.04), Err(Error::Domain(_))));
        assert!(matches!(zscore(60.0, 1.0, 0.0, 0.04), Err(Error::Domain(_))));
        assert!(matches!(zscore(60.0, 1.0, 65.0, 0.0), Err(Error::Domain(_))));
    }
}
