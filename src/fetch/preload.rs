// Resolve fields that need a second upstream call (reviewers, requested reviewers)
// before any report aggregates over them.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use itertools::Itertools;
use serde_json::Value;
use tracing::debug;

use crate::error::{ReportError, Result};
use crate::ext::serde_json::JsonFetch;
use crate::fetch::github_api::GithubApi;
use crate::model::{Field, PullRequestRecord};

const PRELOAD_TEMPLATE: &str = "{spinner} {msg:20} {wide_bar} {pos:>5}/{len}";

pub fn progress_bar(message: &str, hidden: bool) -> ProgressBar {
  let pb = ProgressBar::no_length();
  if hidden {
    pb.set_draw_target(ProgressDrawTarget::hidden());
  }
  if let Ok(style) = ProgressStyle::with_template(PRELOAD_TEMPLATE) {
    pb.set_style(style.progress_chars("#>-"));
  }
  pb.set_message(message.to_string());
  pb.enable_steady_tick(Duration::from_millis(100));
  pb
}

/// Logins of submitted reviews, minus the author's own comments.
pub fn reviewer_logins(reviews: &Value, author: &str) -> Vec<String> {
  reviews
    .as_array()
    .map(|items| {
      items
        .iter()
        .filter(|r| r.fetch("state").as_str() != Some("PENDING"))
        .filter_map(|r| r.fetch("user.login").as_str())
        .filter(|login| *login != author)
        .map(str::to_string)
        .unique()
        .collect()
    })
    .unwrap_or_default()
}

/// Users named in `review_requested` events; team requests carry no login and are skipped.
pub fn requested_logins(events: &Value) -> Vec<String> {
  events
    .as_array()
    .map(|items| {
      items
        .iter()
        .filter(|e| e.fetch("event").as_str() == Some("review_requested"))
        .filter_map(|e| e.fetch("requested_reviewer.login").as_str())
        .map(str::to_string)
        .unique()
        .collect()
    })
    .unwrap_or_default()
}

fn resolve(record: &mut PullRequestRecord, field: Field, api: &dyn GithubApi) -> Result<()> {
  if record.is_resolved(field) {
    return Ok(());
  }
  let number = record.number;
  let missing = || ReportError::FieldResolution {
    field: field.name().to_string(),
    number,
  };

  match field {
    Field::Reviewers => {
      let reviews = api.list_reviews_json(&record.repository, number)?.ok_or_else(missing)?;
      record.reviewers = Some(reviewer_logins(&reviews, &record.user));
    }
    Field::RequestedReviewers => {
      let events = api.list_issue_events_json(&record.repository, number)?.ok_or_else(missing)?;
      record.requested_reviewers = Some(requested_logins(&events));
    }
    _ => {}
  }

  Ok(())
}

/// Fill `fields` on every merged record; fails on the first field the API cannot supply.
pub fn preload(
  records: &mut [PullRequestRecord],
  fields: &[Field],
  api: &dyn GithubApi,
  progress: &ProgressBar,
) -> Result<()> {
  let fetched: Vec<Field> = fields.iter().copied().filter(Field::needs_fetch).collect();
  if fetched.is_empty() {
    progress.finish_and_clear();
    return Ok(());
  }

  let merged = records.iter().filter(|r| r.merged).count();
  progress.set_length(merged as u64);
  debug!(records = merged, fields = ?fetched, "preloading fields");

  let resolved = records.iter_mut().filter(|r| r.merged).try_for_each(|record| -> Result<()> {
    for field in &fetched {
      resolve(record, *field, api)?;
    }
    progress.inc(1);
    Ok(())
  });
  // The bar ticks on its own thread; clear it on every exit.
  progress.finish_and_clear();

  resolved
}
