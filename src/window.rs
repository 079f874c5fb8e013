// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Split a date range into fixed-size windows and render one upstream search query per window
// role: windowing/batcher
// inputs: report filter fragment, repository list, window size in days, date qualifier, start/end dates
// outputs: lazy Windows iterator, SearchQuery values, start/end date helpers for the CLI
// invariants:
// - windows are contiguous [cursor, cursor + N) starting at start; stepping stops once cursor > end
// - the final window may overshoot end; no window is clamped
// - repo filter clause is built once per batcher and reused for every query
// - window count = floor(days(end - start) / N) + 1
// errors: InvalidWindow for N = 0; InvalidRange when start > end
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::fmt;

use anyhow::{bail, Context};
use chrono::{Datelike, Duration, Months, NaiveDate};
use chrono_english::{parse_duration, Interval};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};

pub const DEFAULT_WINDOW_DAYS: u32 = 14;
pub const DEFAULT_LOOKBACK_WEEKS: i64 = 64;

/// Which timestamp the search date range applies to.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum DateField {
  Created,
  Updated,
}

impl DateField {
  pub fn qualifier(&self) -> &'static str {
    match self {
      DateField::Created => "created",
      DateField::Updated => "updated",
    }
  }
}

/// Half-open date interval `[start, end)`.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
pub struct DateWindow {
  pub start: NaiveDate,
  pub end: NaiveDate,
}

impl fmt::Display for DateWindow {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}..{}", self.start.format("%Y-%m-%d"), self.end.format("%Y-%m-%d"))
  }
}

/// One upstream search request: the window it covers and the rendered query text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery {
  pub window: DateWindow,
  pub text: String,
}

impl fmt::Display for SearchQuery {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.text)
  }
}

/// Lazy stepping over `[start, end]` in `step`-sized windows.
#[derive(Clone, Debug)]
pub struct Windows {
  cursor: Option<NaiveDate>,
  end: NaiveDate,
  step: Duration,
}

impl Iterator for Windows {
  type Item = DateWindow;

  fn next(&mut self) -> Option<DateWindow> {
    let start = self.cursor.filter(|c| *c <= self.end)?;
    let end = start.checked_add_signed(self.step)?;
    self.cursor = Some(end);
    Some(DateWindow { start, end })
  }
}

/// Renders `<filter> <field>:<start>..<end> <repo filter>` queries over a date range.
#[derive(Clone, Debug)]
pub struct DateWindowBatcher {
  filter: String,
  date_field: DateField,
  window_days: u32,
  repo_filter: String,
}

impl DateWindowBatcher {
  pub fn new(filter: &str, repos: &[String], window_days: u32, date_field: DateField) -> Result<Self> {
    if window_days == 0 {
      return Err(ReportError::InvalidWindow);
    }

    Ok(Self {
      filter: filter.trim().to_string(),
      date_field,
      window_days,
      repo_filter: repo_filter(repos),
    })
  }

  pub fn repo_filter(&self) -> &str {
    &self.repo_filter
  }

  pub fn windows(&self, start: NaiveDate, end: NaiveDate) -> Result<Windows> {
    if start > end {
      return Err(ReportError::InvalidRange { start, end });
    }

    Ok(Windows {
      cursor: Some(start),
      end,
      step: Duration::days(i64::from(self.window_days)),
    })
  }

  /// Lazily yields one query per window; nothing is rendered until the caller pulls.
  pub fn batch(&self, start: NaiveDate, end: NaiveDate) -> Result<impl Iterator<Item = SearchQuery> + '_> {
    Ok(self.windows(start, end)?.map(move |w| self.render(w)))
  }

  pub fn render(&self, window: DateWindow) -> SearchQuery {
    let range = format!("{}:{}", self.date_field.qualifier(), window);
    let text = [self.filter.as_str(), range.as_str(), self.repo_filter.as_str()]
      .iter()
      .filter(|part| !part.is_empty())
      .copied()
      .collect::<Vec<_>>()
      .join(" ");

    SearchQuery { window, text }
  }

  pub fn window_count(&self, start: NaiveDate, end: NaiveDate) -> usize {
    if start > end {
      return 0;
    }
    let span = (end - start).num_days();
    (span / i64::from(self.window_days)) as usize + 1
  }
}

/// `repo:a repo:b`, in input order.
pub fn repo_filter(repos: &[String]) -> String {
  repos
    .iter()
    .map(|r| r.trim())
    .filter(|r| !r.is_empty())
    .map(|r| format!("repo:{}", r))
    .collect::<Vec<_>>()
    .join(" ")
}

/// Monday of the ISO week containing `day`.
pub fn start_of_week(day: NaiveDate) -> NaiveDate {
  day - Duration::days(i64::from(day.weekday().num_days_from_monday()))
}

pub fn start_of_month(day: NaiveDate) -> NaiveDate {
  day.with_day(1).unwrap_or(day)
}

/// Range end is tomorrow so today's activity is included.
pub fn end_date(today: NaiveDate) -> NaiveDate {
  today.succ_opt().unwrap_or(today)
}

pub fn default_start_date(today: NaiveDate) -> NaiveDate {
  today - Duration::weeks(DEFAULT_LOOKBACK_WEEKS)
}

/// Parse `--since`: an ISO date, or a lookback phrase such as "64 weeks ago" / "6 months".
pub fn parse_start_date(raw: &str, today: NaiveDate) -> anyhow::Result<NaiveDate> {
  let phrase = raw.trim().to_lowercase();

  if let Ok(day) = NaiveDate::parse_from_str(&phrase, "%Y-%m-%d") {
    return Ok(day);
  }

  let interval = parse_duration(&phrase).with_context(|| format!("unrecognized --since value: {raw}"))?;

  // A bare duration ("6 months") is read as a lookback, same as "6 months ago".
  let start = match interval {
    Interval::Seconds(secs) => today.checked_sub_signed(Duration::days(i64::from(secs.unsigned_abs() / 86_400))),
    Interval::Days(days) => today.checked_sub_signed(Duration::days(i64::from(days.unsigned_abs()))),
    Interval::Months(months) => today.checked_sub_months(Months::new(months.unsigned_abs())),
  };

  match start {
    Some(day) => Ok(day),
    None => bail!("--since value is out of range: {raw}"),
  }
}

/// Parse a `--now-override` value into the effective "today".
/// Accepts a plain date (2024-01-20) or an RFC3339 instant.
pub fn parse_today_override(s: Option<&str>) -> Option<NaiveDate> {
  s.and_then(|raw| {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
      .ok()
      .or_else(|| chrono::DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
  })
}
