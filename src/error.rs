// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Typed failures raised by the windowing, fetch, preload and tabulation layers
// role: errors/core
// outputs: ReportError enum and a Result alias; anyhow wraps these at the orchestration layer
// invariants:
// - Division is only raised when an Average is requested over zero values
// - FieldResolution is raised during preload or the pre-aggregation check, never mid-aggregation
// - RateLimited is the only upstream signal the pipeline turns into a partial harvest
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
  #[error("cannot compute Average for group `{group}`: it has no values")]
  Division { group: String },

  #[error("field `{field}` could not be resolved for pull request #{number}")]
  FieldResolution { field: String, number: u64 },

  #[error("unknown field `{0}` (expected one of: user, reviewers, requested_reviewers, merged, week, month, created, updated)")]
  UnknownField(String),

  #[error("field `{0}` is not a time bucket; group by week, month, created or updated")]
  NotABucket(String),

  #[error("search query `{query}` failed: {message}")]
  UpstreamQuery { query: String, message: String },

  #[error("rate limited while running `{query}`")]
  RateLimited { query: String },

  #[error("invalid date range: start {start} is after end {end}")]
  InvalidRange { start: NaiveDate, end: NaiveDate },

  #[error("window size must be at least one day")]
  InvalidWindow,
}

impl ReportError {
  pub fn is_rate_limited(&self) -> bool {
    matches!(self, ReportError::RateLimited { .. })
  }
}

pub type Result<T> = std::result::Result<T, ReportError>;
