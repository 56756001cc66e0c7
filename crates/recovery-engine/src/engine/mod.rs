//! The prediction pipeline: validated record -> features -> probability ->
//! attribution, risk tier, and agency recommendation, orchestrated per batch.

pub mod attribution;
pub mod batch;
pub mod features;
pub mod recommend;
pub mod record;
pub mod risk;
pub mod scorer;

pub use attribution::{AttributionFactor, Direction};
pub use batch::{
    BatchError, BatchOrchestrator, BatchOutcome, BatchPhase, ErrorPolicy, LookupError, ParsedRow,
    PredictionResult, RecordError, RiskSummary, RowError,
};
pub use features::{Feature, FeatureVector, FEATURE_SCHEMA_VERSION};
pub use recommend::{AgencyProfile, AgencyRoster, DcaRecommendation, MatchCriterion};
pub use record::{AccountSubmission, RawAccountRecord, ValidationError};
pub use risk::{DayCurve, RiskLevel, RiskThresholds};
pub use scorer::{checked_score, ModelError, RecoveryModel, ScorecardModel};
