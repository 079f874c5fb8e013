// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Turn grouped per-subject counts into ordered report rows with Total/Average, plus graph series
// role: tabulation/core
// inputs: DataSets (group key -> values in column order) and a TableLayout
// outputs: ReportTable (rows, per-group sums and averages), GraphData, median helper
// invariants:
// - each row: key column, one cell per column key, then Total, then Average (each only when enabled)
// - Total = sum of the group's values; Average = Total / value count rounded to 2 decimals
// - sums and averages are computed once at build time and never recomputed
// - when a sort field is set rows are sorted descending by it; ties keep input order
// - table, CSV and graph views all read the same rows
// errors: Division when Average is requested for a group with no values
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{ReportError, Result};

pub const TOTAL: &str = "Total";
pub const AVERAGE: &str = "Average";

/// Group key -> values, one per column key.
pub type DataSets = IndexMap<String, Vec<u64>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
  Text(String),
  Count(u64),
  Decimal(f64),
}

impl Cell {
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Cell::Text(_) => None,
      Cell::Count(n) => Some(*n as f64),
      Cell::Decimal(x) => Some(*x),
    }
  }

  pub fn is_numeric(&self) -> bool {
    !matches!(self, Cell::Text(_))
  }
}

impl fmt::Display for Cell {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Cell::Text(s) => f.write_str(s),
      Cell::Count(n) => write!(f, "{}", n),
      Cell::Decimal(x) => f.write_str(&format_decimal(*x)),
    }
  }
}

/// Whole numbers keep one decimal place ("2.0"), others print as-is ("0.33").
pub fn format_decimal(x: f64) -> String {
  if x.is_finite() && x.fract() == 0.0 {
    format!("{:.1}", x)
  } else {
    format!("{}", x)
  }
}

pub fn round2(x: f64) -> f64 {
  (x * 100.0).round() / 100.0
}

/// Middle value of the sorted values; even lengths average the two middle values.
pub fn median(values: &[f64]) -> Option<f64> {
  if values.is_empty() {
    return None;
  }
  let mut sorted = values.to_vec();
  sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
  let mid = sorted.len() / 2;

  if sorted.len() % 2 == 0 {
    Some((sorted[mid - 1] + sorted[mid]) / 2.0)
  } else {
    Some(sorted[mid])
  }
}

/// Ordered label -> cell mapping; the first entry is the group key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ReportRow {
  cells: IndexMap<String, Cell>,
}

impl ReportRow {
  pub fn push(&mut self, label: &str, cell: Cell) {
    self.cells.insert(label.to_string(), cell);
  }

  pub fn get(&self, label: &str) -> Option<&Cell> {
    self.cells.get(label)
  }

  pub fn key(&self) -> Option<String> {
    self.cells.first().map(|(_, cell)| cell.to_string())
  }

  pub fn labels(&self) -> impl Iterator<Item = &str> {
    self.cells.keys().map(|k| k.as_str())
  }

  pub fn cells(&self) -> impl Iterator<Item = &Cell> {
    self.cells.values()
  }
}

#[derive(Debug, Clone)]
pub struct TableLayout {
  pub first_column: String,
  pub column_keys: Vec<String>,
  pub add_total: bool,
  pub add_average: bool,
  pub sort_field: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphSeries {
  pub name: String,
  pub values: Vec<f64>,
}

/// Line-graph view: x-axis labels are group keys in group order.
#[derive(Debug, Clone, Serialize)]
pub struct GraphData {
  pub title: String,
  pub labels: Vec<String>,
  pub series: Vec<GraphSeries>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportTable {
  headers: Vec<String>,
  group_order: Vec<String>,
  rows: Vec<ReportRow>,
  sums: IndexMap<String, u64>,
  averages: IndexMap<String, f64>,
}

impl ReportTable {
  pub fn build(data_sets: &DataSets, layout: TableLayout) -> Result<Self> {
    let mut headers = vec![layout.first_column.clone()];
    headers.extend(layout.column_keys.iter().cloned());
    if layout.add_total {
      headers.push(TOTAL.to_string());
    }
    if layout.add_average {
      headers.push(AVERAGE.to_string());
    }

    let mut rows = Vec::with_capacity(data_sets.len());
    let mut sums = IndexMap::new();
    let mut averages = IndexMap::new();

    for (group, values) in data_sets {
      let mut row = ReportRow::default();
      row.push(&layout.first_column, Cell::Text(group.clone()));
      for (i, key) in layout.column_keys.iter().enumerate() {
        row.push(key, Cell::Count(values.get(i).copied().unwrap_or(0)));
      }

      let sum: u64 = values.iter().sum();
      sums.insert(group.clone(), sum);

      if layout.add_total {
        row.push(TOTAL, Cell::Count(sum));
      }
      if layout.add_average {
        if values.is_empty() {
          return Err(ReportError::Division { group: group.clone() });
        }
        let avg = round2(sum as f64 / values.len() as f64);
        averages.insert(group.clone(), avg);
        row.push(AVERAGE, Cell::Decimal(avg));
      }

      rows.push(row);
    }

    if let Some(field) = layout.sort_field.as_deref() {
      let value = |row: &ReportRow| row.get(field).and_then(Cell::as_f64).unwrap_or(f64::NEG_INFINITY);
      // sort_by is stable: equal values keep group order.
      rows.sort_by(|a, b| value(b).partial_cmp(&value(a)).unwrap_or(Ordering::Equal));
    }

    Ok(Self {
      headers,
      group_order: data_sets.keys().cloned().collect(),
      rows,
      sums,
      averages,
    })
  }

  pub fn headers(&self) -> &[String] {
    &self.headers
  }

  pub fn rows(&self) -> &[ReportRow] {
    &self.rows
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  pub fn sum(&self, group: &str) -> Option<u64> {
    self.sums.get(group).copied()
  }

  pub fn average(&self, group: &str) -> Option<f64> {
    self.averages.get(group).copied()
  }

  pub fn grand_total(&self) -> u64 {
    self.sums.values().sum()
  }

  pub fn averages(&self) -> Vec<f64> {
    self.averages.values().copied().collect()
  }

  /// Numeric values of one column, in row order.
  pub fn column_values(&self, label: &str) -> Vec<f64> {
    self.rows.iter().filter_map(|r| r.get(label).and_then(Cell::as_f64)).collect()
  }

  pub fn graph(&self, title: &str) -> GraphData {
    let by_key: IndexMap<String, &ReportRow> =
      self.rows.iter().filter_map(|r| r.key().map(|k| (k, r))).collect();
    let ordered: Vec<&ReportRow> = self.group_order.iter().filter_map(|k| by_key.get(k).copied()).collect();

    let series = self
      .headers
      .iter()
      .skip(1)
      .map(|label| GraphSeries {
        name: label.clone(),
        values: ordered
          .iter()
          .map(|r| r.get(label).and_then(Cell::as_f64).unwrap_or(0.0))
          .collect(),
      })
      .collect();

    GraphData {
      title: title.to_string(),
      labels: self.group_order.clone(),
      series,
    }
  }
}
