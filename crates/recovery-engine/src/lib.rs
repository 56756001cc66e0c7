//! Prediction and explanation engine for overdue-account recovery.
//!
//! The engine turns raw account rows (shipping and financial signals) into
//! per-account decision artifacts: a recovery probability, a risk tier, an
//! expected-days-to-recovery estimate, ranked feature attributions, and a
//! collection-agency recommendation. The HTTP surface lives in the `api`
//! service crate; everything algorithmic lives here.

pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod telemetry;
