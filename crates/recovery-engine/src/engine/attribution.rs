use super::features::{Feature, FeatureVector};
use super::scorer::{checked_score, ModelError, RecoveryModel};
use serde::Serialize;

/// Sign tag for a factor's contribution. Impacts within the configured
/// epsilon band of zero are neutral so noise never reads as direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Positive,
    Negative,
    Neutral,
}

/// One feature's signed contribution to the score, relative to the
/// reference vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributionFactor {
    pub feature: &'static str,
    pub label: &'static str,
    pub impact: f64,
    pub direction: Direction,
}

/// Decompose a score into per-feature contributions by baseline
/// perturbation: replace one feature at a time with its reference value,
/// re-score, and take the delta. One model evaluation per feature, which
/// is fine at this schema size. Output is ranked by |impact| descending
/// with declaration order breaking ties, truncated to `top_k`.
pub fn attribute(
    model: &dyn RecoveryModel,
    features: &FeatureVector,
    score: f64,
    epsilon: f64,
    top_k: usize,
) -> Result<Vec<AttributionFactor>, ModelError> {
    let mut factors = Vec::with_capacity(Feature::COUNT);

    for feature in Feature::ALL {
        let perturbed = features.with_value(feature, feature.baseline());
        let perturbed_score = checked_score(model, &perturbed)?;
        let impact = (score - perturbed_score).clamp(-1.0, 1.0);
        factors.push(AttributionFactor {
            feature: feature.name(),
            label: feature.label(),
            impact,
            direction: direction_for(impact, epsilon),
        });
    }

    // Stable sort keeps declaration order for tied magnitudes.
    factors.sort_by(|a, b| b.impact.abs().total_cmp(&a.impact.abs()));
    factors.truncate(top_k);
    Ok(factors)
}

fn direction_for(impact: f64, epsilon: f64) -> Direction {
    if impact > epsilon {
        Direction::Positive
    } else if impact < -epsilon {
        Direction::Negative
    } else {
        Direction::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::features::build_features;
    use crate::engine::record::RawAccountRecord;
    use crate::engine::scorer::ScorecardModel;

    /// Deterministic linear stub: score is an affine function of the
    /// features, so one-at-a-time perturbation decomposes it exactly.
    struct LinearStub;

    impl RecoveryModel for LinearStub {
        fn score(&self, features: &FeatureVector) -> f64 {
            let mut value = 0.30;
            value += 0.20 * features.get(Feature::PaymentHistory);
            value -= 0.15 * features.get(Feature::DaysOverdue);
            value += 0.10 * (features.get(Feature::VolumeGrowth) - 1.0);
            value -= 0.20 * features.get(Feature::DisputeFlag);
            value.clamp(0.0, 1.0)
        }
    }

    fn record() -> RawAccountRecord {
        RawAccountRecord {
            account_id: None,
            company_name: "Acme Freight".to_string(),
            amount: 5_000.0,
            days_overdue: 45,
            payment_history_score: 0.9,
            volume_recent: 150.0,
            volume_baseline: 100.0,
            express_ratio: 0.4,
            destination_diversity: 6,
            email_opened: true,
            dispute_flag: false,
        }
    }

    #[test]
    fn attributions_sum_to_score_minus_baseline_for_linear_model() {
        let model = LinearStub;
        let features = build_features(&record());
        let score = checked_score(&model, &features).expect("scores");
        let baseline_score =
            checked_score(&model, &FeatureVector::reference()).expect("baseline scores");

        let factors =
            attribute(&model, &features, score, 0.01, Feature::COUNT).expect("attribution runs");
        let total: f64 = factors.iter().map(|factor| factor.impact).sum();

        assert!(
            (total - (score - baseline_score)).abs() < 0.05,
            "sum {total} vs delta {}",
            score - baseline_score
        );
    }

    #[test]
    fn factors_are_ranked_by_absolute_impact() {
        let model = ScorecardModel::fitted();
        let features = build_features(&record());
        let score = checked_score(&model, &features).expect("scores");

        let factors = attribute(&model, &features, score, 0.01, 5).expect("attribution runs");
        assert_eq!(factors.len(), 5);
        for pair in factors.windows(2) {
            assert!(pair[0].impact.abs() >= pair[1].impact.abs());
        }
    }

    #[test]
    fn strong_payment_history_reads_positive() {
        let model = ScorecardModel::fitted();
        let features = build_features(&record());
        let score = checked_score(&model, &features).expect("scores");

        let factors =
            attribute(&model, &features, score, 0.01, Feature::COUNT).expect("attribution runs");
        let history = factors
            .iter()
            .find(|factor| factor.feature == "payment_history_score")
            .expect("history factor present");
        assert_eq!(history.direction, Direction::Positive);
        assert!(history.impact > 0.0);
    }

    #[test]
    fn tiny_impacts_are_tagged_neutral() {
        let model = ScorecardModel::fitted();
        let features = FeatureVector::reference();
        let score = checked_score(&model, &features).expect("scores");

        // Every feature already sits at its baseline, so every delta is 0.
        let factors =
            attribute(&model, &features, score, 0.01, Feature::COUNT).expect("attribution runs");
        assert!(factors
            .iter()
            .all(|factor| factor.direction == Direction::Neutral));
    }

    #[test]
    fn tied_impacts_keep_declaration_order() {
        let model = ScorecardModel::fitted();
        let features = FeatureVector::reference();
        let score = checked_score(&model, &features).expect("scores");

        let factors =
            attribute(&model, &features, score, 0.01, Feature::COUNT).expect("attribution runs");
        let names: Vec<&str> = factors.iter().map(|factor| factor.feature).collect();
        let declared: Vec<&str> = Feature::ALL.into_iter().map(Feature::name).collect();
        assert_eq!(names, declared);
    }
}
