//! Confidence-weighted variance bands

use serde::Serialize;

/// Narrowest band, reached at high confidence
pub const MIN_VARIANCE: f64 = 0.05;
/// Widest band, at zero confidence
pub const MAX_VARIANCE: f64 = 0.30;

/// Symmetric band around a point estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    /// Half-width as a fraction of the base value
    pub variance_pct: f64,
}

/// Half-width derived from a confidence score: 30% at 0 down to 5% at 100
pub fn variance_for_score(confidence_score: u8) -> f64 {
    (MAX_VARIANCE - (f64::from(confidence_score) / 100.0) * 0.25).max(MIN_VARIANCE)
}

/// Band around `base_value`
///
/// `custom_variance` bypasses the score. The lower bound is not clamped, so a
/// negative base yields a negative lower bound.
pub fn confidence_interval(
    base_value: f64,
    confidence_score: u8,
    custom_variance: Option<f64>,
) -> ConfidenceInterval {
    let variance_pct = custom_variance.unwrap_or_else(|| variance_for_score(confidence_score));

    ConfidenceInterval {
        lower: base_value * (1.0 - variance_pct),
        upper: base_value * (1.0 + variance_pct),
        variance_pct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variance_endpoints() {
        assert!((variance_for_score(0) - 0.30).abs() < 1e-12);
        assert!((variance_for_score(100) - 0.05).abs() < 1e-12);
        assert!((variance_for_score(50) - 0.175).abs() < 1e-12);
    }

    #[test]
    fn test_band_contains_base() {
        for score in [0u8, 17, 42, 80, 100] {
            for base in [0.0, 1.0, 1234.5] {
                let ci = confidence_interval(base, score, None);
                assert!(ci.lower <= base && base <= ci.upper);
                assert!((ci.upper - ci.lower - 2.0 * base * ci.variance_pct).abs() < 1e-9);
                assert!((MIN_VARIANCE..=MAX_VARIANCE).contains(&ci.variance_pct));
            }
        }
    }

    #[test]
    fn test_variance_non_increasing() {
        let mut previous = f64::MAX;
        for score in 0..=100u8 {
            let v = variance_for_score(score);
            assert!(v <= previous);
            previous = v;
        }
    }

    #[test]
    fn test_custom_variance_bypasses_score() {
        let ci = confidence_interval(100.0, 0, Some(0.10));
        assert_eq!(ci.variance_pct, 0.10);
        assert!((ci.lower - 90.0).abs() < 1e-9);
        assert!((ci.upper - 110.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_base_not_clamped() {
        let ci = confidence_interval(-100.0, 100, None);
        assert!(ci.lower < 0.0);
        assert!((ci.lower + 95.0).abs() < 1e-9);
    }
}
