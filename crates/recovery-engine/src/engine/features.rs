use super::record::RawAccountRecord;
use serde::Serialize;

/// Version tag for the engineered feature schema. Scoring and attribution
/// for a batch always run against the same schema version, so impacts stay
/// meaningful relative to the probability they explain.
pub const FEATURE_SCHEMA_VERSION: &str = "v1";

/// Amounts above this cap all normalize to 1.0 on the log scale.
const AMOUNT_CAP: f64 = 1_000_000.0;
/// Shipment volumes above this cap saturate the volume-level feature.
const VOLUME_CAP: f64 = 10_000.0;
/// Days overdue at or past this horizon saturate the overdue feature.
const OVERDUE_HORIZON_DAYS: f64 = 180.0;
/// Growth ratios are clamped here to bound outlier influence.
const GROWTH_RATIO_CAP: f64 = 4.0;
const DIVERSITY_CAP: f64 = 20.0;

/// The engineered features, in declaration order. Declaration order is the
/// deterministic tie-breaker when attribution impacts are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    AmountLog,
    DaysOverdue,
    PaymentHistory,
    VolumeGrowth,
    ExpressRatio,
    VolumeLevel,
    DestinationDiversity,
    EmailOpened,
    DisputeFlag,
}

impl Feature {
    pub const ALL: [Feature; 9] = [
        Feature::AmountLog,
        Feature::DaysOverdue,
        Feature::PaymentHistory,
        Feature::VolumeGrowth,
        Feature::ExpressRatio,
        Feature::VolumeLevel,
        Feature::DestinationDiversity,
        Feature::EmailOpened,
        Feature::DisputeFlag,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Schema name used on the wire.
    pub fn name(self) -> &'static str {
        match self {
            Feature::AmountLog => "amount_log",
            Feature::DaysOverdue => "days_overdue",
            Feature::PaymentHistory => "payment_history_score",
            Feature::VolumeGrowth => "volume_growth",
            Feature::ExpressRatio => "express_ratio",
            Feature::VolumeLevel => "volume_level",
            Feature::DestinationDiversity => "destination_diversity",
            Feature::EmailOpened => "email_opened",
            Feature::DisputeFlag => "dispute_flag",
        }
    }

    /// Human-readable label surfaced next to attribution factors.
    pub fn label(self) -> &'static str {
        match self {
            Feature::AmountLog => "Invoice Amount (log)",
            Feature::DaysOverdue => "Days Overdue",
            Feature::PaymentHistory => "Payment History Score",
            Feature::VolumeGrowth => "Shipment Volume Growth",
            Feature::ExpressRatio => "Express Shipment Ratio",
            Feature::VolumeLevel => "Shipment Volume (30d)",
            Feature::DestinationDiversity => "Shipping Destination Diversity",
            Feature::EmailOpened => "Email Engagement",
            Feature::DisputeFlag => "Dispute History",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Reference value used as the attribution baseline for this feature.
    /// Taken together these form the "average account" the explanation is
    /// measured against.
    pub fn baseline(self) -> f64 {
        match self {
            Feature::AmountLog => 0.5,
            Feature::DaysOverdue => 0.25,
            Feature::PaymentHistory => 0.5,
            Feature::VolumeGrowth => 1.0,
            Feature::ExpressRatio => 0.3,
            Feature::VolumeLevel => 0.5,
            Feature::DestinationDiversity => 0.25,
            Feature::EmailOpened => 0.0,
            Feature::DisputeFlag => 0.0,
        }
    }
}

/// Ordered, fully-populated feature values for one account. Invariant:
/// every value is finite; every schema feature is present.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: [f64; Feature::COUNT],
}

impl FeatureVector {
    /// Reference vector scoring models are compared against.
    pub fn reference() -> Self {
        let mut values = [0.0; Feature::COUNT];
        for feature in Feature::ALL {
            values[feature.index()] = feature.baseline();
        }
        Self { values }
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    /// Copy of this vector with one feature replaced, used by the
    /// perturbation attributor.
    pub fn with_value(&self, feature: Feature, value: f64) -> Self {
        let mut values = self.values;
        values[feature.index()] = if value.is_finite() { value } else { 0.0 };
        Self { values }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL
            .into_iter()
            .map(move |feature| (feature, self.values[feature.index()]))
    }
}

/// Derive the feature vector for a validated record. Pure and total: every
/// output value is finite, with division guards resolving to documented
/// defaults rather than propagating NaN or infinity.
pub fn build_features(record: &RawAccountRecord) -> FeatureVector {
    let mut values = [0.0; Feature::COUNT];

    values[Feature::AmountLog.index()] = log_scale(record.amount, AMOUNT_CAP);
    values[Feature::DaysOverdue.index()] =
        (f64::from(record.days_overdue) / OVERDUE_HORIZON_DAYS).clamp(0.0, 1.0);
    values[Feature::PaymentHistory.index()] = record.payment_history_score.clamp(0.0, 1.0);
    values[Feature::VolumeGrowth.index()] =
        growth_ratio(record.volume_recent, record.volume_baseline);
    values[Feature::ExpressRatio.index()] = record.express_ratio.clamp(0.0, 1.0);
    values[Feature::VolumeLevel.index()] = log_scale(record.volume_recent, VOLUME_CAP);
    values[Feature::DestinationDiversity.index()] =
        (f64::from(record.destination_diversity) / DIVERSITY_CAP).clamp(0.0, 1.0);
    values[Feature::EmailOpened.index()] = if record.email_opened { 1.0 } else { 0.0 };
    values[Feature::DisputeFlag.index()] = if record.dispute_flag { 1.0 } else { 0.0 };

    FeatureVector { values }
}

/// ln(1 + value) normalized against ln(1 + cap), clamped to [0, 1].
fn log_scale(value: f64, cap: f64) -> f64 {
    let scaled = value.max(0.0).ln_1p() / cap.ln_1p();
    if scaled.is_finite() {
        scaled.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Recent-over-baseline volume ratio. A non-positive baseline means there
/// is no history to compare against, which reads as neutral growth (1.0).
fn growth_ratio(recent: f64, baseline: f64) -> f64 {
    if baseline <= 0.0 {
        return 1.0;
    }
    let ratio = recent / baseline;
    if ratio.is_finite() {
        ratio.clamp(0.0, GROWTH_RATIO_CAP)
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> RawAccountRecord {
        RawAccountRecord {
            account_id: None,
            company_name: "Acme Freight".to_string(),
            amount: 5_000.0,
            days_overdue: 10,
            payment_history_score: 0.75,
            volume_recent: 120.0,
            volume_baseline: 100.0,
            express_ratio: 0.6,
            destination_diversity: 4,
            email_opened: true,
            dispute_flag: false,
        }
    }

    #[test]
    fn every_feature_is_finite_and_present() {
        let vector = build_features(&record());
        let mut count = 0;
        for (_, value) in vector.iter() {
            assert!(value.is_finite());
            count += 1;
        }
        assert_eq!(count, Feature::COUNT);
    }

    #[test]
    fn zero_baseline_volume_defaults_to_neutral_growth() {
        let mut zeroed = record();
        zeroed.volume_recent = 0.0;
        zeroed.volume_baseline = 0.0;
        let vector = build_features(&zeroed);
        assert_eq!(vector.get(Feature::VolumeGrowth), 1.0);
    }

    #[test]
    fn growth_ratio_is_clamped_against_outliers() {
        let mut spiked = record();
        spiked.volume_recent = 5_000.0;
        spiked.volume_baseline = 1.0;
        let vector = build_features(&spiked);
        assert_eq!(vector.get(Feature::VolumeGrowth), GROWTH_RATIO_CAP);
    }

    #[test]
    fn express_ratio_is_clamped_to_unit_interval() {
        let mut noisy = record();
        noisy.express_ratio = 3.2;
        let vector = build_features(&noisy);
        assert_eq!(vector.get(Feature::ExpressRatio), 1.0);
    }

    #[test]
    fn amount_scaling_is_monotone_and_bounded() {
        let small = build_features(&RawAccountRecord {
            amount: 100.0,
            ..record()
        });
        let large = build_features(&RawAccountRecord {
            amount: 900_000.0,
            ..record()
        });
        let huge = build_features(&RawAccountRecord {
            amount: 5_000_000.0,
            ..record()
        });
        assert!(small.get(Feature::AmountLog) < large.get(Feature::AmountLog));
        assert_eq!(huge.get(Feature::AmountLog), 1.0);
    }

    #[test]
    fn with_value_replaces_exactly_one_feature() {
        let vector = build_features(&record());
        let perturbed = vector.with_value(Feature::PaymentHistory, 0.1);
        assert_eq!(perturbed.get(Feature::PaymentHistory), 0.1);
        assert_eq!(
            perturbed.get(Feature::VolumeGrowth),
            vector.get(Feature::VolumeGrowth)
        );
    }
}
