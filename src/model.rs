// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Define the pull request record and the named fields reports group, filter and preload by
// role: model/types
// outputs: PullRequestRecord (serializable), Field enum with string names, time-bucket keys
// invariants:
// - reviewers / requested_reviewers are None until preloaded; Some(vec![]) means "resolved, nobody"
// - bucket keys are ISO dates (YYYY-MM-DD) or YYYY-MM so lexical order is chronological
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};
use crate::window::{start_of_month, start_of_week};

/// A record attribute a report can group by, filter on, or request to be preloaded.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
  User,
  Reviewers,
  RequestedReviewers,
  Merged,
  Week,
  Month,
  Created,
  Updated,
}

impl Field {
  pub fn name(&self) -> &'static str {
    match self {
      Field::User => "user",
      Field::Reviewers => "reviewers",
      Field::RequestedReviewers => "requested_reviewers",
      Field::Merged => "merged",
      Field::Week => "week",
      Field::Month => "month",
      Field::Created => "created",
      Field::Updated => "updated",
    }
  }

  pub fn is_time_bucket(&self) -> bool {
    matches!(self, Field::Week | Field::Month | Field::Created | Field::Updated)
  }

  /// Fields that need a second upstream call per record.
  pub fn needs_fetch(&self) -> bool {
    matches!(self, Field::Reviewers | Field::RequestedReviewers)
  }
}

impl fmt::Display for Field {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for Field {
  type Err = ReportError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_lowercase().as_str() {
      "user" => Ok(Field::User),
      "reviewers" => Ok(Field::Reviewers),
      "requested_reviewers" | "requested-reviewers" => Ok(Field::RequestedReviewers),
      "merged" => Ok(Field::Merged),
      "week" => Ok(Field::Week),
      "month" => Ok(Field::Month),
      "created" => Ok(Field::Created),
      "updated" => Ok(Field::Updated),
      other => Err(ReportError::UnknownField(other.to_string())),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequestRecord {
  pub repository: String,
  pub number: u64,
  pub title: String,
  pub user: String,
  pub merged: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub merged_at: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub reviewers: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub requested_reviewers: Option<Vec<String>>,
}

impl PullRequestRecord {
  /// Identity used to de-duplicate records across overlapping windows.
  pub fn key(&self) -> (&str, u64) {
    (self.repository.as_str(), self.number)
  }

  pub fn is_resolved(&self, field: Field) -> bool {
    match field {
      Field::Reviewers => self.reviewers.is_some(),
      Field::RequestedReviewers => self.requested_reviewers.is_some(),
      _ => true,
    }
  }

  pub fn reviewers(&self) -> &[String] {
    self.reviewers.as_deref().unwrap_or_default()
  }

  pub fn requested_reviewers(&self) -> &[String] {
    self.requested_reviewers.as_deref().unwrap_or_default()
  }

  /// Group key for a time-bucket field.
  pub fn bucket(&self, field: Field) -> Result<String> {
    let key = match field {
      Field::Week => start_of_week(self.created_at.date_naive()).format("%Y-%m-%d").to_string(),
      Field::Month => start_of_month(self.created_at.date_naive()).format("%Y-%m").to_string(),
      Field::Created => self.created_at.date_naive().format("%Y-%m-%d").to_string(),
      Field::Updated => self.updated_at.date_naive().format("%Y-%m-%d").to_string(),
      other => return Err(ReportError::NotABucket(other.name().to_string())),
    };

    Ok(key)
  }
}

#[cfg(test)]
pub(crate) mod fixtures {
  use super::*;
  use chrono::TimeZone;

  /// Merged PR by `user` created at noon UTC on `day` (YYYY-MM-DD).
  pub fn record(number: u64, user: &str, day: &str) -> PullRequestRecord {
    let d = chrono::NaiveDate::parse_from_str(day, "%Y-%m-%d").unwrap();
    let created = Utc.from_utc_datetime(&d.and_hms_opt(12, 0, 0).unwrap());
    PullRequestRecord {
      repository: "org/a".into(),
      number,
      title: format!("PR {number}"),
      user: user.into(),
      merged: true,
      created_at: created,
      updated_at: created,
      merged_at: Some(created),
      reviewers: None,
      requested_reviewers: None,
    }
  }

  pub fn reviewed(number: u64, user: &str, day: &str, reviewers: &[&str]) -> PullRequestRecord {
    let mut r = record(number, user, day);
    r.reviewers = Some(reviewers.iter().map(|s| s.to_string()).collect());
    r
  }
}
