use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use itertools::Itertools;
use serde::Serialize;

use crate::export::{ExportFormat, DEFAULT_EXPORTS};
use crate::fetch::github_api::DEFAULT_API_URL;
use crate::model::Field;
use crate::report::{ReportDefinition, ALL_REPORTS};
use crate::util;
use crate::window::{self, DateField, DEFAULT_WINDOW_DAYS};

#[derive(Parser, Debug)]
#[command(
    name = "mergometer",
    version,
    about = "Pull request merge and review metrics from GitHub search",
    long_about = None
)]
pub struct Cli {
  /// Comma-separated repositories, e.g. "org/a,org/b"
  #[arg(env = "MERGOMETER_REPOS")]
  pub repos: Option<String>,

  /// Start of the range: YYYY-MM-DD or a lookback such as "6 months ago" (default: 64 weeks back)
  #[arg(long, alias = "start-date")]
  pub since: Option<String>,

  /// Time bucket for report rows: week, month, created, updated
  #[arg(long, default_value = "week")]
  pub group_by: String,

  /// Reports to run (comma-separated; default: all)
  #[arg(long = "report", value_enum, value_delimiter = ',')]
  pub reports: Vec<ReportDefinition>,

  /// Days per search window; keep each window under the 1000-result search cap
  #[arg(long, default_value_t = DEFAULT_WINDOW_DAYS)]
  pub window_days: u32,

  /// Date qualifier the windows filter on
  #[arg(long, value_enum, default_value_t = DateField::Created)]
  pub date_field: DateField,

  /// Stop after this many search windows per report (results are marked partial)
  #[arg(long)]
  pub max_windows: Option<usize>,

  /// Directory for CSV/graph/JSON artifacts and manifest.json ("-" prints tables only)
  #[arg(long, default_value = "-")]
  pub out: String,

  /// Artifacts to write into --out (comma-separated; default: csv,graph)
  #[arg(long = "export", value_enum, value_delimiter = ',')]
  pub exports: Vec<ExportFormat>,

  /// GitHub API base URL (GitHub Enterprise: https://host/api/v3)
  #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
  pub api_url: String,

  /// Hide progress bars
  #[arg(long, short)]
  pub quiet: bool,

  /// Emit a troff man page to stdout (internal; for packaging)
  #[arg(long, hide = true)]
  pub gen_man: bool,

  /// Override "today" (hidden; tests only)
  #[arg(long = "now-override", hide = true)]
  pub now_override: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EffectiveConfig {
  pub repos: Vec<String>,
  pub start: NaiveDate,
  pub end: NaiveDate,
  pub group_by: Field,
  pub reports: Vec<ReportDefinition>,
  pub window_days: u32,
  pub date_field: DateField,
  pub max_windows: Option<usize>,
  pub out: String,
  pub exports: Vec<ExportFormat>,
  pub api_url: String,
  pub quiet: bool,
}

pub fn normalize(cli: Cli) -> Result<EffectiveConfig> {
  let repos: Vec<String> = cli
    .repos
    .as_deref()
    .unwrap_or_default()
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .unique()
    .map(str::to_string)
    .collect();
  if repos.is_empty() {
    bail!("Provide at least one repository, e.g. `mergometer org/a,org/b` (or set MERGOMETER_REPOS)");
  }

  if cli.window_days == 0 {
    bail!("--window-days must be at least 1");
  }

  let group_by: Field = cli.group_by.parse().with_context(|| format!("invalid --group-by: {}", cli.group_by))?;
  if !group_by.is_time_bucket() {
    bail!("--group-by must be a time bucket (week, month, created, updated), got {}", group_by);
  }

  let today = util::effective_today(window::parse_today_override(cli.now_override.as_deref()));
  let end = window::end_date(today);
  let start = match cli.since.as_deref() {
    Some(raw) => window::parse_start_date(raw, today)?,
    None => window::default_start_date(today),
  };
  if start > end {
    bail!("--since {} is after the end of the range ({})", start, end);
  }

  let reports: Vec<ReportDefinition> = if cli.reports.is_empty() {
    ALL_REPORTS.to_vec()
  } else {
    cli.reports.into_iter().unique().collect()
  };
  let exports: Vec<ExportFormat> = if cli.exports.is_empty() {
    DEFAULT_EXPORTS.to_vec()
  } else {
    cli.exports.into_iter().unique().collect()
  };

  Ok(EffectiveConfig {
    repos,
    start,
    end,
    group_by,
    reports,
    window_days: cli.window_days,
    date_field: cli.date_field,
    max_windows: cli.max_windows,
    out: cli.out,
    exports,
    api_url: cli.api_url.trim_end_matches('/').to_string(),
    quiet: cli.quiet,
  })
}
