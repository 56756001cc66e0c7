use super::attribution::{attribute, AttributionFactor};
use super::features::{build_features, FeatureVector};
use super::recommend::{AgencyRoster, DcaRecommendation};
use super::record::{AccountSubmission, ValidationError};
use super::risk::{classify, expected_days, velocity_score, RiskLevel};
use super::scorer::{checked_score, ModelError, RecoveryModel};
use crate::config::EngineConfig;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// One input row as handed to the orchestrator: either a parsed submission
/// or the validation failure the parser hit, with its 1-based position.
#[derive(Debug, Clone)]
pub struct ParsedRow {
    pub row: usize,
    pub submission: Result<AccountSubmission, ValidationError>,
}

impl ParsedRow {
    pub fn ok(row: usize, submission: AccountSubmission) -> Self {
        Self {
            row,
            submission: Ok(submission),
        }
    }
}

/// Policy for rows that fail validation or scoring mid-batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Keep going; report failed rows alongside the successful predictions.
    SkipAndReport,
    /// Fail the whole batch at the first bad row.
    AbortOnError,
}

/// Batch lifecycle, observable for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPhase {
    Received,
    Processing,
    Completed,
    Failed,
}

/// The full per-account artifact. Created once per record per batch and
/// never mutated afterwards; re-uploads create new results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub account_id: String,
    pub company_name: String,
    pub amount: f64,
    pub days_overdue: u32,
    pub recovery_probability: f64,
    pub risk_level: RiskLevel,
    pub expected_days: u32,
    pub recovery_velocity_score: f64,
    pub top_factors: Vec<AttributionFactor>,
    pub recommended_dca: DcaRecommendation,
    pub prediction_timestamp: String,
}

/// Failure for a single record inside a batch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("row {row}: {source}")]
    Model { row: usize, source: ModelError },
}

/// Row-level failure as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub reason: String,
}

impl From<&RecordError> for RowError {
    fn from(error: &RecordError) -> Self {
        match error {
            RecordError::Validation(err) => RowError {
                row: err.row,
                field: Some(err.field.to_string()),
                reason: err.reason.clone(),
            },
            RecordError::Model { row, source } => RowError {
                row: *row,
                field: None,
                reason: source.to_string(),
            },
        }
    }
}

/// Per-tier counts summarizing one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RiskSummary {
    pub low_risk: usize,
    pub medium_risk: usize,
    pub high_risk: usize,
}

impl RiskSummary {
    fn count(&mut self, risk: RiskLevel) {
        match risk {
            RiskLevel::Low => self.low_risk += 1,
            RiskLevel::Medium => self.medium_risk += 1,
            RiskLevel::High => self.high_risk += 1,
        }
    }
}

/// Everything one upload produced: predictions in input order plus the
/// parallel error list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub total_accounts: usize,
    pub predictions: Vec<PredictionResult>,
    pub errors: Vec<RowError>,
    pub summary: RiskSummary,
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("batch aborted at row {row}: {reason}")]
    Aborted { row: usize, reason: String },
    #[error("batch of {count} rows exceeds the configured limit of {limit}")]
    TooManyRows { count: usize, limit: usize },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LookupError {
    #[error("account '{account_id}' not found; upload a batch first")]
    NotFound { account_id: String },
}

/// Runs the prediction pipeline for every record in a batch and owns the
/// in-memory result index. The index is the only shared mutable state;
/// results are immutable once inserted.
pub struct BatchOrchestrator {
    model: Arc<dyn RecoveryModel>,
    roster: AgencyRoster,
    config: EngineConfig,
    index: Mutex<HashMap<String, PredictionResult>>,
    phase: Mutex<BatchPhase>,
}

impl BatchOrchestrator {
    /// Build an orchestrator, probing the model against the reference
    /// vector once so a fundamentally broken model fails at startup
    /// instead of on the first upload.
    pub fn new(
        model: Arc<dyn RecoveryModel>,
        roster: AgencyRoster,
        config: EngineConfig,
    ) -> Result<Self, ModelError> {
        checked_score(model.as_ref(), &FeatureVector::reference())?;
        Ok(Self {
            model,
            roster,
            config,
            index: Mutex::new(HashMap::new()),
            phase: Mutex::new(BatchPhase::Received),
        })
    }

    pub fn phase(&self) -> BatchPhase {
        *self.phase.lock().expect("phase mutex poisoned")
    }

    fn set_phase(&self, phase: BatchPhase) {
        *self.phase.lock().expect("phase mutex poisoned") = phase;
    }

    /// Process one upload. Records are independent, so they are scored on
    /// a worker pool bounded by the configured width; a single writer
    /// merges results back in input order, keeping output deterministic.
    ///
    /// Account ids are stable: the explicit `account_id` column wins when
    /// present and non-empty, otherwise the id is derived from the 1-based
    /// row position (`ROW0007` for row 7). Colliding ids overwrite the
    /// prior index entry.
    pub fn submit(&self, rows: Vec<ParsedRow>) -> Result<BatchOutcome, BatchError> {
        self.set_phase(BatchPhase::Received);
        if rows.len() > self.config.max_batch_rows {
            self.set_phase(BatchPhase::Failed);
            return Err(BatchError::TooManyRows {
                count: rows.len(),
                limit: self.config.max_batch_rows,
            });
        }
        self.set_phase(BatchPhase::Processing);

        let mut outcomes: Vec<Result<PredictionResult, RecordError>> =
            Vec::with_capacity(rows.len());
        if !rows.is_empty() {
            let workers = self.config.workers.clamp(1, rows.len());
            let chunk_size = rows.len().div_ceil(workers);
            std::thread::scope(|scope| {
                let handles: Vec<_> = rows
                    .chunks(chunk_size)
                    .map(|chunk| {
                        scope.spawn(move || {
                            chunk
                                .iter()
                                .map(|parsed| self.process_row(parsed))
                                .collect::<Vec<_>>()
                        })
                    })
                    .collect();
                for handle in handles {
                    outcomes.extend(handle.join().expect("scoring worker panicked"));
                }
            });
        }

        if self.config.error_policy == ErrorPolicy::AbortOnError {
            if let Some(error) = outcomes.iter().find_map(|outcome| outcome.as_ref().err()) {
                let report = RowError::from(error);
                warn!(row = report.row, reason = %report.reason, "aborting batch");
                self.set_phase(BatchPhase::Failed);
                return Err(BatchError::Aborted {
                    row: report.row,
                    reason: report.reason,
                });
            }
        }

        let mut predictions = Vec::new();
        let mut errors = Vec::new();
        let mut summary = RiskSummary::default();
        for outcome in &outcomes {
            match outcome {
                Ok(prediction) => {
                    summary.count(prediction.risk_level);
                    predictions.push(prediction.clone());
                }
                Err(error) => errors.push(RowError::from(error)),
            }
        }

        {
            let mut index = self.index.lock().expect("index mutex poisoned");
            for prediction in &predictions {
                index.insert(prediction.account_id.clone(), prediction.clone());
            }
        }

        self.set_phase(BatchPhase::Completed);
        info!(
            accounts = predictions.len(),
            failed_rows = errors.len(),
            "batch analysis completed"
        );

        Ok(BatchOutcome {
            total_accounts: predictions.len(),
            predictions,
            errors,
            summary,
        })
    }

    /// Score one account outside a batch. The explicit account id is
    /// required here since there is no row position to derive one from.
    /// The result lands in the same index as batch results.
    pub fn submit_single(
        &self,
        submission: AccountSubmission,
    ) -> Result<PredictionResult, RecordError> {
        if submission
            .account_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .is_none()
        {
            return Err(RecordError::Validation(ValidationError {
                row: 1,
                field: "account_id",
                reason: "missing or empty".to_string(),
            }));
        }

        let prediction = self.predict(1, &submission)?;
        self.index
            .lock()
            .expect("index mutex poisoned")
            .insert(prediction.account_id.clone(), prediction.clone());
        Ok(prediction)
    }

    pub fn lookup(&self, account_id: &str) -> Result<PredictionResult, LookupError> {
        self.index
            .lock()
            .expect("index mutex poisoned")
            .get(account_id)
            .cloned()
            .ok_or_else(|| LookupError::NotFound {
                account_id: account_id.to_string(),
            })
    }

    /// Ids currently held in the index, sorted for stable output.
    pub fn account_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .index
            .lock()
            .expect("index mutex poisoned")
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    fn process_row(&self, parsed: &ParsedRow) -> Result<PredictionResult, RecordError> {
        let submission = parsed.submission.as_ref().map_err(|err| err.clone())?;
        self.predict(parsed.row, submission)
    }

    fn predict(
        &self,
        row: usize,
        submission: &AccountSubmission,
    ) -> Result<PredictionResult, RecordError> {
        let record = submission.validate(row)?;
        let account_id = record
            .account_id
            .clone()
            .unwrap_or_else(|| format!("ROW{row:04}"));

        let features = build_features(&record);
        let probability = checked_score(self.model.as_ref(), &features)
            .map_err(|source| RecordError::Model { row, source })?;
        let top_factors = attribute(
            self.model.as_ref(),
            &features,
            probability,
            self.config.direction_epsilon,
            self.config.top_factors,
        )
        .map_err(|source| RecordError::Model { row, source })?;

        let risk_level = classify(probability, &self.config.risk_thresholds);
        let expected = expected_days(probability, &self.config.day_curve);
        let recommended_dca = self.roster.recommend(&features, risk_level);

        Ok(PredictionResult {
            account_id,
            company_name: record.company_name,
            amount: record.amount,
            days_overdue: record.days_overdue,
            recovery_probability: probability,
            risk_level,
            expected_days: expected,
            recovery_velocity_score: velocity_score(probability, expected),
            top_factors,
            recommended_dca,
            prediction_timestamp: Utc::now().to_rfc3339(),
        })
    }
}
