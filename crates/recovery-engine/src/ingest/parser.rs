use crate::engine::batch::ParsedRow;
use crate::engine::record::{AccountSubmission, ValidationError};
use serde::{Deserialize, Deserializer};
use std::io::Read;

/// Columns every upload must declare in its header. Row values in these
/// columns may still be malformed; that is a per-row validation failure,
/// not a schema failure.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "company_name",
    "amount",
    "days_overdue",
    "volume_recent",
    "volume_baseline",
    "express_ratio",
];

/// Structural upload failures, reported before any row is processed.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("upload is missing required columns: {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },
    #[error("upload is empty")]
    Empty,
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
}

/// Parse an uploaded CSV into orchestrator input. The header is checked
/// against [`REQUIRED_COLUMNS`] up front; each row then parses
/// independently so one malformed row never poisons its neighbors.
pub fn parse_batch<R: Read>(reader: R) -> Result<Vec<ParsedRow>, SchemaError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
        return Err(SchemaError::Empty);
    }
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|required| !headers.iter().any(|column| column == **required))
        .map(|required| required.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(SchemaError::MissingColumns { missing });
    }

    let mut rows = Vec::new();
    for (offset, record) in csv_reader.deserialize::<CsvRow>().enumerate() {
        let row = offset + 1;
        let submission = match record {
            Ok(raw) => raw.into_submission(row),
            Err(err) => Err(ValidationError {
                row,
                field: "row",
                reason: err.to_string(),
            }),
        };
        rows.push(ParsedRow { row, submission });
    }

    Ok(rows)
}

/// Raw CSV row with every cell kept as text so malformed values surface as
/// field-level validation errors instead of failing the whole read.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    account_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    company_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    amount: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    days_overdue: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    payment_history_score: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    volume_recent: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    volume_baseline: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    express_ratio: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    destination_diversity: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    email_opened: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    dispute_flag: Option<String>,
}

impl CsvRow {
    fn into_submission(self, row: usize) -> Result<AccountSubmission, ValidationError> {
        Ok(AccountSubmission {
            account_id: self.account_id,
            company_name: self.company_name,
            amount: parse_number(row, "amount", self.amount)?,
            days_overdue: parse_integer(row, "days_overdue", self.days_overdue)?,
            payment_history_score: parse_number(
                row,
                "payment_history_score",
                self.payment_history_score,
            )?,
            volume_recent: parse_number(row, "volume_recent", self.volume_recent)?,
            volume_baseline: parse_number(row, "volume_baseline", self.volume_baseline)?,
            express_ratio: parse_number(row, "express_ratio", self.express_ratio)?,
            destination_diversity: parse_integer(
                row,
                "destination_diversity",
                self.destination_diversity,
            )?,
            email_opened: parse_flag(row, "email_opened", self.email_opened)?,
            dispute_flag: parse_flag(row, "dispute_flag", self.dispute_flag)?,
        })
    }
}

fn parse_number(
    row: usize,
    field: &'static str,
    value: Option<String>,
) -> Result<Option<f64>, ValidationError> {
    value
        .map(|raw| {
            raw.parse::<f64>().map_err(|_| ValidationError {
                row,
                field,
                reason: format!("'{raw}' is not a number"),
            })
        })
        .transpose()
}

fn parse_integer(
    row: usize,
    field: &'static str,
    value: Option<String>,
) -> Result<Option<i64>, ValidationError> {
    value
        .map(|raw| {
            raw.parse::<i64>().map_err(|_| ValidationError {
                row,
                field,
                reason: format!("'{raw}' is not an integer"),
            })
        })
        .transpose()
}

/// Boolean columns arrive in the wild as TRUE/FALSE, YES/NO, or 1/0.
fn parse_flag(
    row: usize,
    field: &'static str,
    value: Option<String>,
) -> Result<Option<bool>, ValidationError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    match raw.to_ascii_uppercase().as_str() {
        "TRUE" | "YES" | "1" => Ok(Some(true)),
        "FALSE" | "NO" | "0" => Ok(Some(false)),
        _ => Err(ValidationError {
            row,
            field,
            reason: format!("'{raw}' is not a boolean flag"),
        }),
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
