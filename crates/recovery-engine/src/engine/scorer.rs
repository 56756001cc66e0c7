use super::features::{Feature, FeatureVector};

/// Capability contract for the fitted probability model. The engine treats
/// the model as a black box: it must be cheap, synchronous, side-effect
/// free, and safe to call concurrently; the engine validates the output
/// rather than trusting the implementation.
pub trait RecoveryModel: Send + Sync {
    /// Estimated probability the account recovers, expected in [0, 1].
    fn score(&self, features: &FeatureVector) -> f64;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("model produced out-of-range probability {value}")]
    OutOfRange { value: f64 },
    #[error("model produced a non-finite probability")]
    NonFinite,
}

/// Score with the output contract enforced. A contract-violating model fails the
/// record being scored, never the whole batch.
pub fn checked_score(
    model: &dyn RecoveryModel,
    features: &FeatureVector,
) -> Result<f64, ModelError> {
    let value = model.score(features);
    if !value.is_finite() {
        return Err(ModelError::NonFinite);
    }
    if !(0.0..=1.0).contains(&value) {
        return Err(ModelError::OutOfRange { value });
    }
    Ok(value)
}

/// The built-in fitted model: a logistic scorecard with fixed weights over
/// the v1 feature schema. The weights are constants from offline fitting;
/// training and retraining are outside this crate.
#[derive(Debug, Clone)]
pub struct ScorecardModel {
    weights: [f64; Feature::COUNT],
    intercept: f64,
}

impl Default for ScorecardModel {
    fn default() -> Self {
        Self::fitted()
    }
}

impl ScorecardModel {
    pub fn fitted() -> Self {
        let mut weights = [0.0; Feature::COUNT];
        for feature in Feature::ALL {
            weights[feature as usize] = match feature {
                Feature::AmountLog => -0.6,
                Feature::DaysOverdue => -2.2,
                Feature::PaymentHistory => 2.5,
                Feature::VolumeGrowth => 1.2,
                Feature::ExpressRatio => 0.8,
                Feature::VolumeLevel => 0.3,
                Feature::DestinationDiversity => 0.3,
                Feature::EmailOpened => 0.4,
                Feature::DisputeFlag => -1.5,
            };
        }
        Self {
            weights,
            intercept: -2.0,
        }
    }
}

impl RecoveryModel for ScorecardModel {
    fn score(&self, features: &FeatureVector) -> f64 {
        let logit = features
            .iter()
            .map(|(feature, value)| self.weights[feature as usize] * value)
            .sum::<f64>()
            + self.intercept;
        sigmoid(logit)
    }
}

fn sigmoid(logit: f64) -> f64 {
    1.0 / (1.0 + (-logit).exp())
}
