// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Count records per subject and group records into ordered time buckets
// role: aggregation/core
// inputs: slices of PullRequestRecord, ordered subject lists, membership predicates, bucket fields
// outputs: AggregateCount lists, distinct subject lists, GroupedEntries keyed by bucket
// invariants:
// - aggregate returns exactly one count per subject, in subject order
// - sum of counts equals the number of (record, subject) pairs the predicate accepts
// - subjects are distinct and in first-occurrence order
// - grouped keys are ascending; records inside a group keep input order
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;

use crate::error::Result;
use crate::model::{Field, PullRequestRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateCount {
  pub subject: String,
  pub count: u64,
}

/// For each subject, count the records the predicate associates with it.
pub fn aggregate<T, F>(records: &[T], subjects: &[String], is_member: F) -> Vec<AggregateCount>
where
  F: Fn(&T, &str) -> bool,
{
  subjects
    .iter()
    .map(|subject| AggregateCount {
      subject: subject.clone(),
      count: records.iter().filter(|r| is_member(r, subject)).count() as u64,
    })
    .collect()
}

/// How a subject relates to a pull request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Membership {
  Author,
  Reviewer,
  RequestedReviewer,
}

impl Membership {
  pub fn holds(&self, record: &PullRequestRecord, subject: &str) -> bool {
    match self {
      Membership::Author => record.user == subject,
      Membership::Reviewer => record.reviewers().iter().any(|r| r == subject),
      Membership::RequestedReviewer => record.requested_reviewers().iter().any(|r| r == subject),
    }
  }

  pub fn subjects(&self, records: &[&PullRequestRecord]) -> Vec<String> {
    match self {
      Membership::Author => distinct_authors(records),
      Membership::Reviewer => distinct_reviewers(records),
      Membership::RequestedReviewer => records
        .iter()
        .flat_map(|r| r.requested_reviewers().iter().cloned())
        .unique()
        .collect(),
    }
  }

  pub fn count(&self, records: &[&PullRequestRecord], subjects: &[String]) -> Vec<AggregateCount> {
    aggregate(records, subjects, |r, s| self.holds(r, s))
  }
}

pub fn distinct_authors(records: &[&PullRequestRecord]) -> Vec<String> {
  records.iter().map(|r| r.user.clone()).unique().collect()
}

pub fn distinct_reviewers(records: &[&PullRequestRecord]) -> Vec<String> {
  records.iter().flat_map(|r| r.reviewers().iter().cloned()).unique().collect()
}

pub fn merged_only(records: &[PullRequestRecord]) -> Vec<&PullRequestRecord> {
  records.iter().filter(|r| r.merged).collect()
}

pub type GroupedEntries<'a> = IndexMap<String, Vec<&'a PullRequestRecord>>;

/// Sort by bucket key (stable) and group; keys come out ascending.
pub fn group_by_bucket<'a>(records: &[&'a PullRequestRecord], field: Field) -> Result<GroupedEntries<'a>> {
  let mut keyed = records
    .iter()
    .map(|r| r.bucket(field).map(|k| (k, *r)))
    .collect::<Result<Vec<_>>>()?;
  keyed.sort_by(|a, b| a.0.cmp(&b.0));

  let mut grouped: GroupedEntries<'a> = IndexMap::new();
  for (key, record) in keyed {
    grouped.entry(key).or_default().push(record);
  }

  Ok(grouped)
}

/// Per bucket, one count per subject (a bucket x subject matrix).
pub fn counts_per_bucket(
  grouped: &GroupedEntries<'_>,
  subjects: &[String],
  membership: Membership,
) -> IndexMap<String, Vec<AggregateCount>> {
  grouped
    .iter()
    .map(|(key, records)| (key.clone(), membership.count(records, subjects)))
    .collect()
}
