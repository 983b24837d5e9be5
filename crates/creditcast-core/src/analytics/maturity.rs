//! Data maturity assessment
//!
//! Classifies how much history a sample carries into a discrete level and an
//! independent 0-100 confidence score. The level gates whether projections
//! should be shown; the score drives the width of variance bands.

use crate::models::UsageSample;
use serde::Serialize;

/// Distinct days needed for any projection
pub const MINIMUM_DAYS: usize = 3;
/// Distinct days after which estimates are "improving"
pub const DEVELOPING_DAYS: usize = 7;
/// Distinct days for statistically meaningful projections
pub const RELIABLE_DAYS: usize = 14;
/// Distinct days for full day-score credit
pub const CONFIDENT_DAYS: usize = 30;

/// Ordered maturity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MaturityLevel {
    None,
    Insufficient,
    Developing,
    Reliable,
    Confident,
}

impl MaturityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Insufficient => "insufficient",
            Self::Developing => "developing",
            Self::Reliable => "reliable",
            Self::Confident => "confident",
        }
    }
}

/// Result of assessing a sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaturityAssessment {
    pub level: MaturityLevel,
    /// Display label ("Developing" and "Improving" share a level)
    pub label: &'static str,
    pub days_of_data: usize,
    /// Distinct days over the inclusive span between first and last date
    pub completeness: f64,
    pub confidence_score: u8,
    pub ready_for_projection: bool,
    pub message: String,
    pub recommendations: Vec<String>,
}

/// `round(min(days/30, 1) * 60 + completeness * 40)`
pub fn confidence_score(days_of_data: usize, completeness: f64) -> u8 {
    let day_score = (days_of_data as f64 / CONFIDENT_DAYS as f64).min(1.0) * 60.0;
    let completeness_score = completeness.clamp(0.0, 1.0) * 40.0;
    (day_score + completeness_score).round() as u8
}

/// Assess a sample; never fails, an empty sample yields level `none`
pub fn assess_maturity(sample: &UsageSample) -> MaturityAssessment {
    let days = sample.days_of_data();

    if days == 0 {
        return MaturityAssessment {
            level: MaturityLevel::None,
            label: "No Data",
            days_of_data: 0,
            completeness: 0.0,
            confidence_score: 0,
            ready_for_projection: false,
            message: "No usage data available. Deploy monitoring and wait for data collection."
                .to_string(),
            recommendations: vec![
                "Deploy monitoring views".to_string(),
                format!("Wait for initial data collection ({}+ days)", MINIMUM_DAYS),
            ],
        };
    }

    let completeness = match sample.date_range() {
        Some((first, last)) if days > 1 => {
            let span = (last - first).num_days() + 1;
            if span > 0 {
                days as f64 / span as f64
            } else {
                1.0
            }
        }
        _ => 1.0,
    };
    let score = confidence_score(days, completeness);

    let (level, label, message, recommendations) = if days < MINIMUM_DAYS {
        (
            MaturityLevel::Insufficient,
            "Insufficient",
            format!(
                "Only {} day(s) of data. Need at least {} days for basic projections.",
                days, MINIMUM_DAYS
            ),
            vec![
                format!("Wait {} more days for minimum data", MINIMUM_DAYS - days),
                "Use published rates for initial estimates".to_string(),
            ],
        )
    } else if days < DEVELOPING_DAYS {
        (
            MaturityLevel::Developing,
            "Developing",
            format!("{} days of data. Projections are rough estimates.", days),
            vec![
                format!(
                    "Wait for {} days for more reliable projections",
                    RELIABLE_DAYS
                ),
                "Use wider variance ranges (+/- 25%)".to_string(),
                "Cross-check with published rates".to_string(),
            ],
        )
    } else if days < RELIABLE_DAYS {
        (
            MaturityLevel::Developing,
            "Improving",
            format!(
                "{} days of data. Projections improving in reliability.",
                days
            ),
            vec![
                format!("Wait for {} days for reliable projections", RELIABLE_DAYS),
                "Consider +/- 15-20% variance ranges".to_string(),
            ],
        )
    } else if days < CONFIDENT_DAYS {
        (
            MaturityLevel::Reliable,
            "Reliable",
            format!(
                "{} days of data. Projections are statistically meaningful.",
                days
            ),
            vec![
                "Projections are suitable for budget planning".to_string(),
                "Standard variance range (+/- 10%) is appropriate".to_string(),
            ],
        )
    } else {
        (
            MaturityLevel::Confident,
            "High Confidence",
            format!("{} days of data. High confidence in projections.", days),
            vec![
                "Data is mature for accurate forecasting".to_string(),
                "Consider tighter variance ranges if usage is stable".to_string(),
            ],
        )
    };

    MaturityAssessment {
        level,
        label,
        days_of_data: days,
        completeness,
        confidence_score: score,
        ready_for_projection: days >= MINIMUM_DAYS,
        message,
        recommendations,
    }
}
