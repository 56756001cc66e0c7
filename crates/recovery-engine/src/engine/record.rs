use serde::Deserialize;

/// One account as submitted, before validation. Field optionality mirrors
/// the upload contract: missing optional fields take documented defaults,
/// missing required fields fail validation with the offending field name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AccountSubmission {
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub days_overdue: Option<i64>,
    #[serde(default)]
    pub payment_history_score: Option<f64>,
    #[serde(default)]
    pub volume_recent: Option<f64>,
    #[serde(default)]
    pub volume_baseline: Option<f64>,
    #[serde(default)]
    pub express_ratio: Option<f64>,
    #[serde(default)]
    pub destination_diversity: Option<i64>,
    #[serde(default)]
    pub email_opened: Option<bool>,
    #[serde(default)]
    pub dispute_flag: Option<bool>,
}

/// A validated account record. Immutable once built; the feature builder
/// reads it, nothing mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAccountRecord {
    pub account_id: Option<String>,
    pub company_name: String,
    pub amount: f64,
    pub days_overdue: u32,
    /// Historical on-time payment rate in [0, 1]; 0.5 is the neutral
    /// default when the upload omits the column.
    pub payment_history_score: f64,
    pub volume_recent: f64,
    pub volume_baseline: f64,
    pub express_ratio: f64,
    pub destination_diversity: u32,
    pub email_opened: bool,
    pub dispute_flag: bool,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error, serde::Serialize)]
#[error("row {row}: invalid field '{field}': {reason}")]
pub struct ValidationError {
    pub row: usize,
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(row: usize, field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            row,
            field,
            reason: reason.into(),
        }
    }
}

impl AccountSubmission {
    /// Validate and coerce into a typed record. `row` is the 1-based input
    /// position, carried into any error for reporting.
    pub fn validate(&self, row: usize) -> Result<RawAccountRecord, ValidationError> {
        let company_name = self
            .company_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ValidationError::new(row, "company_name", "missing or empty"))?
            .to_string();

        let amount = require_finite(row, "amount", self.amount)?;
        if amount < 0.0 {
            return Err(ValidationError::new(row, "amount", "must not be negative"));
        }

        let days_overdue = require_non_negative_int(row, "days_overdue", self.days_overdue)?;

        let payment_history_score = match self.payment_history_score {
            Some(score) if !score.is_finite() => {
                return Err(ValidationError::new(
                    row,
                    "payment_history_score",
                    "must be a finite number",
                ))
            }
            Some(score) if !(0.0..=1.0).contains(&score) => {
                return Err(ValidationError::new(
                    row,
                    "payment_history_score",
                    format!("must be within [0, 1], got {score}"),
                ))
            }
            Some(score) => score,
            None => 0.5,
        };

        let volume_recent = require_finite(row, "volume_recent", self.volume_recent)?;
        if volume_recent < 0.0 {
            return Err(ValidationError::new(
                row,
                "volume_recent",
                "must not be negative",
            ));
        }

        let volume_baseline = require_finite(row, "volume_baseline", self.volume_baseline)?;
        if volume_baseline < 0.0 {
            return Err(ValidationError::new(
                row,
                "volume_baseline",
                "must not be negative",
            ));
        }

        let express_ratio = require_finite(row, "express_ratio", self.express_ratio)?;
        if express_ratio < 0.0 {
            return Err(ValidationError::new(
                row,
                "express_ratio",
                "must not be negative",
            ));
        }

        let destination_diversity = match self.destination_diversity {
            Some(count) => require_non_negative_int(row, "destination_diversity", Some(count))?,
            None => 0,
        };

        Ok(RawAccountRecord {
            account_id: self
                .account_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            company_name,
            amount,
            days_overdue,
            payment_history_score,
            volume_recent,
            volume_baseline,
            express_ratio,
            destination_diversity,
            email_opened: self.email_opened.unwrap_or(false),
            dispute_flag: self.dispute_flag.unwrap_or(false),
        })
    }
}

fn require_finite(
    row: usize,
    field: &'static str,
    value: Option<f64>,
) -> Result<f64, ValidationError> {
    match value {
        Some(value) if value.is_finite() => Ok(value),
        Some(_) => Err(ValidationError::new(row, field, "must be a finite number")),
        None => Err(ValidationError::new(row, field, "missing or empty")),
    }
}

fn require_non_negative_int(
    row: usize,
    field: &'static str,
    value: Option<i64>,
) -> Result<u32, ValidationError> {
    match value {
        Some(value) if value < 0 => {
            Err(ValidationError::new(row, field, "must not be negative"))
        }
        Some(value) => u32::try_from(value).map_err(|_| {
            ValidationError::new(row, field, format!("out of range, got {value}"))
        }),
        None => Err(ValidationError::new(row, field, "missing or empty")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_submission() -> AccountSubmission {
        AccountSubmission {
            account_id: Some("ACC0042".to_string()),
            company_name: Some("Meridian Textiles".to_string()),
            amount: Some(5_000.0),
            days_overdue: Some(10),
            payment_history_score: Some(0.8),
            volume_recent: Some(120.0),
            volume_baseline: Some(100.0),
            express_ratio: Some(0.6),
            destination_diversity: Some(4),
            email_opened: Some(true),
            dispute_flag: Some(false),
        }
    }

    #[test]
    fn valid_submission_produces_typed_record() {
        let record = complete_submission().validate(1).expect("record validates");
        assert_eq!(record.account_id.as_deref(), Some("ACC0042"));
        assert_eq!(record.company_name, "Meridian Textiles");
        assert_eq!(record.days_overdue, 10);
        assert!(record.email_opened);
    }

    #[test]
    fn optional_fields_take_documented_defaults() {
        let submission = AccountSubmission {
            payment_history_score: None,
            destination_diversity: None,
            email_opened: None,
            dispute_flag: None,
            ..complete_submission()
        };
        let record = submission.validate(3).expect("record validates");
        assert_eq!(record.payment_history_score, 0.5);
        assert_eq!(record.destination_diversity, 0);
        assert!(!record.email_opened);
        assert!(!record.dispute_flag);
    }

    #[test]
    fn missing_required_field_names_the_field() {
        let submission = AccountSubmission {
            amount: None,
            ..complete_submission()
        };
        let error = submission.validate(7).expect_err("amount required");
        assert_eq!(error.row, 7);
        assert_eq!(error.field, "amount");
    }

    #[test]
    fn negative_days_overdue_rejected() {
        let submission = AccountSubmission {
            days_overdue: Some(-5),
            ..complete_submission()
        };
        let error = submission.validate(2).expect_err("negative days rejected");
        assert_eq!(error.field, "days_overdue");
    }

    #[test]
    fn oversized_integer_counts_rejected_not_wrapped() {
        let submission = AccountSubmission {
            days_overdue: Some(i64::from(u32::MAX) + 11),
            ..complete_submission()
        };
        let error = submission.validate(5).expect_err("oversized days rejected");
        assert_eq!(error.field, "days_overdue");
        assert!(error.reason.contains("out of range"));

        let submission = AccountSubmission {
            destination_diversity: Some(i64::MAX),
            ..complete_submission()
        };
        let error = submission.validate(5).expect_err("oversized count rejected");
        assert_eq!(error.field, "destination_diversity");
    }

    #[test]
    fn out_of_range_history_score_rejected() {
        let submission = AccountSubmission {
            payment_history_score: Some(1.5),
            ..complete_submission()
        };
        let error = submission.validate(4).expect_err("score above 1 rejected");
        assert_eq!(error.field, "payment_history_score");
    }

    #[test]
    fn blank_account_id_treated_as_absent() {
        let submission = AccountSubmission {
            account_id: Some("   ".to_string()),
            ..complete_submission()
        };
        let record = submission.validate(1).expect("record validates");
        assert!(record.account_id.is_none());
    }
}
