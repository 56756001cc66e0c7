use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete risk tier derived from the recovery probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered probability bands. Both boundaries are inclusive on the better
/// tier: probability >= `low` is Low, probability >= `medium` is Medium,
/// anything below is High.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskThresholds {
    pub low: f64,
    pub medium: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low: 0.70,
            medium: 0.50,
        }
    }
}

pub fn classify(probability: f64, thresholds: &RiskThresholds) -> RiskLevel {
    if probability >= thresholds.low {
        RiskLevel::Low
    } else if probability >= thresholds.medium {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

/// Expected-days curve: linear in (1 - probability), bounded to
/// [1, max_days]. Monotone non-increasing in probability by construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayCurve {
    pub max_days: u32,
}

impl Default for DayCurve {
    fn default() -> Self {
        Self { max_days: 180 }
    }
}

pub fn expected_days(probability: f64, curve: &DayCurve) -> u32 {
    let span = f64::from(curve.max_days);
    let days = ((1.0 - probability.clamp(0.0, 1.0)) * span).round() as u32;
    days.clamp(1, curve.max_days)
}

/// Recovery velocity: probability points expected to materialize per day.
pub fn velocity_score(probability: f64, expected_days: u32) -> f64 {
    let velocity = probability * 100.0 / f64::from(expected_days.max(1));
    (velocity * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_boundaries_are_inclusive_as_documented() {
        let thresholds = RiskThresholds::default();
        assert_eq!(classify(0.70, &thresholds), RiskLevel::Low);
        assert_eq!(classify(0.6999, &thresholds), RiskLevel::Medium);
        assert_eq!(classify(0.50, &thresholds), RiskLevel::Medium);
        assert_eq!(classify(0.4999, &thresholds), RiskLevel::High);
        assert_eq!(classify(1.0, &thresholds), RiskLevel::Low);
        assert_eq!(classify(0.0, &thresholds), RiskLevel::High);
    }

    #[test]
    fn day_curve_is_monotone_and_bounded() {
        let curve = DayCurve::default();
        let mut previous = u32::MAX;
        for step in 0..=100 {
            let probability = f64::from(step) / 100.0;
            let days = expected_days(probability, &curve);
            assert!((1..=curve.max_days).contains(&days));
            assert!(days <= previous, "curve must not increase with probability");
            previous = days;
        }
        assert_eq!(expected_days(1.0, &curve), 1);
        assert_eq!(expected_days(0.0, &curve), curve.max_days);
    }

    #[test]
    fn velocity_rewards_fast_confident_recoveries() {
        let quick = velocity_score(0.9, 20);
        let slow = velocity_score(0.3, 150);
        assert!(quick > slow);
        assert_eq!(velocity_score(0.9, 20), 4.5);
    }
}
