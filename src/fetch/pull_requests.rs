// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Pull windows from the batcher, run each search, and map result items into PullRequestRecords
// role: fetch/harvest
// inputs: DateWindowBatcher, start/end dates, GithubApi, optional window budget
// outputs: Harvest (records de-duplicated by repo+number, window counters, partial-stop reason)
// invariants:
// - windows are consumed lazily and in order; stopping early leaves a valid partial Harvest
// - the first occurrence of a (repository, number) pair wins
// - rate limiting stops consumption; any other upstream error propagates unchanged
// errors: UpstreamQuery; FieldResolution for items missing number/created_at/updated_at
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{ReportError, Result};
use crate::ext::serde_json::JsonFetch;
use crate::fetch::github_api::{GithubApi, SEARCH_RESULT_CAP};
use crate::model::PullRequestRecord;
use crate::window::DateWindowBatcher;

static RE_REPO_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"/repos/([^/]+/[^/]+?)/?$").unwrap());

/// `https://api.github.com/repos/org/a` -> `org/a`.
pub fn repo_from_api_url(url: &str) -> Option<String> {
  RE_REPO_URL.captures(url).and_then(|c| c.get(1)).map(|m| m.as_str().to_string())
}

fn timestamp(item: &Value, path: &str) -> Option<DateTime<Utc>> {
  item
    .fetch(path)
    .as_str()
    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    .map(|dt| dt.with_timezone(&Utc))
}

pub fn record_from_search_item(item: &Value) -> Result<PullRequestRecord> {
  let number = item.fetch("number").to::<u64>().ok_or_else(|| ReportError::FieldResolution {
    field: "number".into(),
    number: 0,
  })?;
  let missing = |field: &str| ReportError::FieldResolution {
    field: field.to_string(),
    number,
  };

  let created_at = timestamp(item, "created_at").ok_or_else(|| missing("created"))?;
  let updated_at = timestamp(item, "updated_at").ok_or_else(|| missing("updated"))?;
  let merged_at = timestamp(item, "pull_request.merged_at");

  Ok(PullRequestRecord {
    repository: item
      .fetch("repository_url")
      .as_str()
      .and_then(repo_from_api_url)
      .unwrap_or_default(),
    number,
    title: item.fetch("title").to_or_default::<String>(),
    user: item.fetch("user.login").as_str().unwrap_or("ghost").to_string(),
    merged: merged_at.is_some(),
    created_at,
    updated_at,
    merged_at,
    reviewers: None,
    requested_reviewers: None,
  })
}

#[derive(Debug, Clone, Default)]
pub struct Harvest {
  pub records: Vec<PullRequestRecord>,
  pub windows_total: usize,
  pub windows_fetched: usize,
  pub stopped_early: Option<String>,
}

impl Harvest {
  pub fn is_partial(&self) -> bool {
    self.stopped_early.is_some()
  }
}

/// Run one search per window over `[start, end]`, concatenating results.
pub fn harvest(
  batcher: &DateWindowBatcher,
  start: NaiveDate,
  end: NaiveDate,
  api: &dyn GithubApi,
  max_windows: Option<usize>,
) -> Result<Harvest> {
  let mut out = Harvest {
    windows_total: batcher.window_count(start, end),
    ..Harvest::default()
  };
  let mut seen: HashSet<(String, u64)> = HashSet::new();

  for query in batcher.batch(start, end)? {
    if max_windows.is_some_and(|m| out.windows_fetched >= m) {
      out.stopped_early = Some(format!(
        "stopped after {} of {} windows (--max-windows)",
        out.windows_fetched, out.windows_total
      ));
      break;
    }

    debug!(query = %query, "searching window");
    let results = match api.search_issues(&query.text) {
      Ok(r) => r,
      Err(e) if e.is_rate_limited() => {
        warn!(query = %query, "rate limited; keeping results fetched so far");
        out.stopped_early = Some(format!(
          "rate limited after {} of {} windows",
          out.windows_fetched, out.windows_total
        ));
        break;
      }
      Err(e) => return Err(e),
    };

    if results.total_count > SEARCH_RESULT_CAP {
      warn!(
        query = %query,
        total = results.total_count,
        "window matches more than {} results; only the first {} are visible, use a smaller --window-days",
        SEARCH_RESULT_CAP,
        SEARCH_RESULT_CAP
      );
    }

    for item in &results.items {
      let record = record_from_search_item(item)?;
      let (repo, number) = record.key();
      if seen.insert((repo.to_string(), number)) {
        out.records.push(record);
      }
    }
    out.windows_fetched += 1;
  }

  info!(
    windows = out.windows_fetched,
    total = out.windows_total,
    records = out.records.len(),
    "search windows fetched"
  );

  Ok(out)
}
