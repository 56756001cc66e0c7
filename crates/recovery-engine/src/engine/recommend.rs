use super::features::{Feature, FeatureVector};
use super::risk::RiskLevel;
use serde::Serialize;

/// Criterion an account must satisfy for an agency to take it. Each
/// criterion renders its own reasoning from the values that matched, so
/// recommendations stay explainable and testable.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchCriterion {
    /// Account has an open dispute on record.
    DisputeRaised,
    /// Account sits in the given tier and shipment volume is not
    /// contracting below the given growth ratio.
    RiskWithGrowth { risk: RiskLevel, min_growth: f64 },
    /// Account sits in the given tier.
    Risk(RiskLevel),
}

impl MatchCriterion {
    fn matches(&self, features: &FeatureVector, risk: RiskLevel) -> bool {
        match self {
            MatchCriterion::DisputeRaised => features.get(Feature::DisputeFlag) >= 0.5,
            MatchCriterion::RiskWithGrowth {
                risk: wanted,
                min_growth,
            } => risk == *wanted && features.get(Feature::VolumeGrowth) >= *min_growth,
            MatchCriterion::Risk(wanted) => risk == *wanted,
        }
    }

    fn reasoning(&self, features: &FeatureVector, risk: RiskLevel) -> String {
        match self {
            MatchCriterion::DisputeRaised => {
                "open dispute on record; resolve the dispute before standard collection".to_string()
            }
            MatchCriterion::RiskWithGrowth { min_growth, .. } => format!(
                "{risk} risk with shipment growth {:.2} at or above {:.2}; relationship worth retaining",
                features.get(Feature::VolumeGrowth),
                min_growth
            ),
            MatchCriterion::Risk(_) => format!("account classified {risk} risk"),
        }
    }
}

/// Static roster entry. Loaded once at startup and read-only thereafter.
#[derive(Debug, Clone, PartialEq)]
pub struct AgencyProfile {
    pub name: String,
    pub specialization: String,
    pub criterion: MatchCriterion,
}

impl AgencyProfile {
    fn new(name: &str, specialization: &str, criterion: MatchCriterion) -> Self {
        Self {
            name: name.to_string(),
            specialization: specialization.to_string(),
            criterion,
        }
    }
}

/// Recommendation surfaced per account; always references a roster entry
/// or the no-match sentinel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DcaRecommendation {
    pub name: String,
    pub specialization: String,
    pub reasoning: String,
}

impl DcaRecommendation {
    /// Sentinel returned when no roster criterion fires. A miss is an
    /// expected outcome, never an error.
    pub fn no_match() -> Self {
        Self {
            name: "No Agency Match".to_string(),
            specialization: "Unassigned".to_string(),
            reasoning: "no roster criterion matched this account profile".to_string(),
        }
    }
}

/// Priority-ordered agency roster. Recommendation is a deterministic
/// first-match walk: identical inputs always select the identical agency.
#[derive(Debug, Clone, PartialEq)]
pub struct AgencyRoster {
    profiles: Vec<AgencyProfile>,
}

impl AgencyRoster {
    pub fn new(profiles: Vec<AgencyProfile>) -> Self {
        Self { profiles }
    }

    /// The production roster. Dispute routing outranks tier routing;
    /// growing low-risk accounts stay with the in-house team rather than
    /// going to an external agency.
    pub fn standard() -> Self {
        Self::new(vec![
            AgencyProfile::new(
                "Mediation & Dispute Resolution Group",
                "Disputed balances",
                MatchCriterion::DisputeRaised,
            ),
            AgencyProfile::new(
                "In-House Retention Team",
                "Customer loyalty",
                MatchCriterion::RiskWithGrowth {
                    risk: RiskLevel::Low,
                    min_growth: 1.0,
                },
            ),
            AgencyProfile::new(
                "Premium Recovery Services",
                "High-value accounts",
                MatchCriterion::Risk(RiskLevel::Low),
            ),
            AgencyProfile::new(
                "Standard Recovery Partners",
                "General collections",
                MatchCriterion::Risk(RiskLevel::Medium),
            ),
            AgencyProfile::new(
                "Recovery Specialists Inc",
                "Challenging cases",
                MatchCriterion::Risk(RiskLevel::High),
            ),
        ])
    }

    pub fn recommend(&self, features: &FeatureVector, risk: RiskLevel) -> DcaRecommendation {
        for profile in &self.profiles {
            if profile.criterion.matches(features, risk) {
                return DcaRecommendation {
                    name: profile.name.clone(),
                    specialization: profile.specialization.clone(),
                    reasoning: profile.criterion.reasoning(features, risk),
                };
            }
        }
        DcaRecommendation::no_match()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::features::build_features;
    use crate::engine::record::RawAccountRecord;

    fn record(dispute_flag: bool, volume_recent: f64) -> RawAccountRecord {
        RawAccountRecord {
            account_id: None,
            company_name: "Acme Freight".to_string(),
            amount: 5_000.0,
            days_overdue: 10,
            payment_history_score: 0.8,
            volume_recent,
            volume_baseline: 100.0,
            express_ratio: 0.5,
            destination_diversity: 3,
            email_opened: false,
            dispute_flag,
        }
    }

    #[test]
    fn dispute_routing_outranks_tier_routing() {
        let roster = AgencyRoster::standard();
        let features = build_features(&record(true, 120.0));
        let recommendation = roster.recommend(&features, RiskLevel::Low);
        assert_eq!(recommendation.name, "Mediation & Dispute Resolution Group");
        assert!(recommendation.reasoning.contains("dispute"));
    }

    #[test]
    fn growing_low_risk_account_stays_in_house() {
        let roster = AgencyRoster::standard();
        let features = build_features(&record(false, 130.0));
        let recommendation = roster.recommend(&features, RiskLevel::Low);
        assert_eq!(recommendation.name, "In-House Retention Team");
    }

    #[test]
    fn shrinking_low_risk_account_goes_premium() {
        let roster = AgencyRoster::standard();
        let features = build_features(&record(false, 40.0));
        let recommendation = roster.recommend(&features, RiskLevel::Low);
        assert_eq!(recommendation.name, "Premium Recovery Services");
    }

    #[test]
    fn each_tier_resolves_deterministically() {
        let roster = AgencyRoster::standard();
        let features = build_features(&record(false, 40.0));

        let medium = roster.recommend(&features, RiskLevel::Medium);
        assert_eq!(medium.name, "Standard Recovery Partners");

        let high = roster.recommend(&features, RiskLevel::High);
        assert_eq!(high.name, "Recovery Specialists Inc");

        // Same inputs, same answer.
        assert_eq!(high, roster.recommend(&features, RiskLevel::High));
    }

    #[test]
    fn narrowed_roster_falls_back_to_sentinel() {
        let roster = AgencyRoster::new(vec![AgencyProfile::new(
            "Low Only Collections",
            "High-value accounts",
            MatchCriterion::Risk(RiskLevel::Low),
        )]);
        let features = build_features(&record(false, 40.0));
        let recommendation = roster.recommend(&features, RiskLevel::High);
        assert_eq!(recommendation, DcaRecommendation::no_match());
    }
}
