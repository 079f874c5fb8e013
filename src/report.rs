// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: The closed set of report kinds and the shared driver that turns fetched records into a ReportOutput
// role: reports/definitions
// inputs: fetched PullRequestRecord list (preloaded), group-by field
// outputs: ReportOutput (table + summary statistics + optional point-in-time snapshot)
// invariants:
// - only merged records feed the time series; `checked` counts every fetched record
// - required fields are verified before any aggregation starts
// - sort_field is the last entry of fields()
// - the awaiting-review snapshot never mixes into the time-series table
// errors: FieldResolution, NotABucket (from the core layers); no subjects yields an empty table, not Division
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::aggregate::{counts_per_bucket, group_by_bucket, merged_only, Membership};
use crate::error::{ReportError, Result};
use crate::model::{Field, PullRequestRecord};
use crate::table::{median, DataSets, ReportTable, TableLayout, AVERAGE};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum ReportDefinition {
  /// Merged PRs per author per time bucket
  PullRequests,
  /// Merged PRs reviewed per reviewer per time bucket, plus PRs awaiting review
  Reviews,
  /// Merged PRs with a review request per requested reviewer per time bucket
  ReviewRequests,
  /// Merged PRs per week with the weekly median
  Weekly,
}

pub const ALL_REPORTS: [ReportDefinition; 4] = [
  ReportDefinition::PullRequests,
  ReportDefinition::Reviews,
  ReportDefinition::ReviewRequests,
  ReportDefinition::Weekly,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStat {
  pub label: String,
  pub value: f64,
}

/// Point-in-time count kept apart from the time series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
  pub label: String,
  pub query: String,
  pub count: u64,
  pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportOutput {
  pub name: String,
  pub filter: String,
  pub checked: usize,
  pub table: ReportTable,
  pub summary: Vec<SummaryStat>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub snapshot: Option<Snapshot>,
}

impl ReportDefinition {
  pub fn name(&self) -> &'static str {
    match self {
      ReportDefinition::PullRequests => "PullRequestReport",
      ReportDefinition::Reviews => "ReviewReport",
      ReportDefinition::ReviewRequests => "ReviewRequestReport",
      ReportDefinition::Weekly => "WeeklyReport",
    }
  }

  /// Type-and-state fragment of the search query; the batcher adds dates and repos.
  pub fn filter(&self) -> &'static str {
    match self {
      ReportDefinition::PullRequests | ReportDefinition::Weekly => "type:pr is:merged",
      ReportDefinition::Reviews | ReportDefinition::ReviewRequests => "type:pr",
    }
  }

  pub fn fields(&self, group_by: Field) -> Vec<String> {
    match self {
      ReportDefinition::Weekly => vec![Field::Week.name().to_string(), "count".to_string()],
      _ => vec![group_by.name().to_string(), "Total".to_string(), AVERAGE.to_string()],
    }
  }

  pub fn fields_to_preload(&self) -> &'static [Field] {
    match self {
      ReportDefinition::PullRequests => &[Field::User],
      ReportDefinition::Reviews => &[Field::Reviewers],
      ReportDefinition::ReviewRequests => &[Field::RequestedReviewers],
      ReportDefinition::Weekly => &[],
    }
  }

  pub fn sort_field(&self, group_by: Field) -> String {
    self.fields(group_by).pop().unwrap_or_default()
  }

  fn membership(&self) -> Option<Membership> {
    match self {
      ReportDefinition::PullRequests => Some(Membership::Author),
      ReportDefinition::Reviews => Some(Membership::Reviewer),
      ReportDefinition::ReviewRequests => Some(Membership::RequestedReviewer),
      ReportDefinition::Weekly => None,
    }
  }

  /// Query for PRs currently waiting on a review, if this report carries that snapshot.
  pub fn snapshot_filter(&self, repo_filter: &str) -> Option<String> {
    match self {
      ReportDefinition::Reviews => Some(format!("{} is:pr is:open review:required NOT [WIP]", repo_filter)),
      _ => None,
    }
  }

  /// Rows for this report, built from merged records only.
  pub fn entries(&self, records: &[PullRequestRecord], group_by: Field) -> Result<ReportTable> {
    let merged = merged_only(records);
    require_fields(&merged, self.fields_to_preload())?;

    let (bucket, membership) = match self.membership() {
      Some(m) => (group_by, Some(m)),
      None => (Field::Week, None),
    };
    let grouped = group_by_bucket(&merged, bucket)?;

    let (data_sets, layout) = match membership {
      Some(m) => {
        let subjects = m.subjects(&merged);
        // No subject columns means nothing to rank; keep the headers and emit no rows.
        let data_sets: DataSets = if subjects.is_empty() {
          DataSets::new()
        } else {
          counts_per_bucket(&grouped, &subjects, m)
            .into_iter()
            .map(|(key, counts)| (key, counts.into_iter().map(|c| c.count).collect()))
            .collect()
        };
        let layout = TableLayout {
          first_column: bucket.name().to_string(),
          column_keys: subjects,
          add_total: true,
          add_average: true,
          sort_field: Some(self.sort_field(group_by)),
        };
        (data_sets, layout)
      }
      None => {
        let data_sets: DataSets = grouped.iter().map(|(key, prs)| (key.clone(), vec![prs.len() as u64])).collect();
        let layout = TableLayout {
          first_column: Field::Week.name().to_string(),
          column_keys: vec!["count".to_string()],
          add_total: false,
          add_average: false,
          sort_field: Some(self.sort_field(group_by)),
        };
        (data_sets, layout)
      }
    };

    ReportTable::build(&data_sets, layout)
  }

  /// Template driver: entries, then the statistics derived from them.
  pub fn build(&self, records: &[PullRequestRecord], group_by: Field) -> Result<ReportOutput> {
    let table = self.entries(records, group_by)?;
    let summary = self.summary(&table);

    Ok(ReportOutput {
      name: self.name().to_string(),
      filter: self.filter().to_string(),
      checked: records.len(),
      table,
      summary,
      snapshot: None,
    })
  }

  fn summary(&self, table: &ReportTable) -> Vec<SummaryStat> {
    match self {
      ReportDefinition::Weekly => median(&table.column_values("count"))
        .map(|m| vec![SummaryStat { label: "Median num of PRs/week".into(), value: m }])
        .unwrap_or_default(),
      _ => {
        let mut stats = vec![SummaryStat { label: "Grand total".into(), value: table.grand_total() as f64 }];
        if let Some(m) = median(&table.averages()) {
          stats.push(SummaryStat { label: "Median of averages".into(), value: m });
        }
        stats
      }
    }
  }
}

/// Every record must have each field resolved before aggregation.
pub fn require_fields(records: &[&PullRequestRecord], fields: &[Field]) -> Result<()> {
  for record in records {
    if let Some(field) = fields.iter().find(|f| !record.is_resolved(**f)) {
      return Err(ReportError::FieldResolution {
        field: field.name().to_string(),
        number: record.number,
      });
    }
  }

  Ok(())
}
