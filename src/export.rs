// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Write report artifacts (CSV rows, graph series JSON, full report JSON) into the output directory
// role: persistence/export
// inputs: ReportOutput, selected ExportFormat list, output directory
// outputs: <Name>.csv, <Name>.graph.json, <Name>.json; list of written file names
// side_effects: Writes to filesystem
// invariants:
// - CSV header is the first row's keys; an empty table writes an empty file
// - all three artifacts are derived from the same ReportTable rows
// - <Name>.graph.json is chart series data (title, x labels, named series) for an external renderer; no image is drawn here
// errors: IO errors surfaced with full path context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::report::ReportOutput;
use crate::table::ReportTable;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum ExportFormat {
  Csv,
  /// Line-chart series as JSON, for an external plotting tool to render. No image file is written.
  Graph,
  Json,
}

pub const DEFAULT_EXPORTS: [ExportFormat; 2] = [ExportFormat::Csv, ExportFormat::Graph];

impl ExportFormat {
  pub fn file_name(&self, report: &str) -> String {
    match self {
      ExportFormat::Csv => format!("{}.csv", report),
      ExportFormat::Graph => format!("{}.graph.json", report),
      ExportFormat::Json => format!("{}.json", report),
    }
  }
}

fn csv_field(s: &str) -> String {
  if s.contains([',', '"', '\n', '\r']) {
    format!("\"{}\"", s.replace('"', "\"\""))
  } else {
    s.to_string()
  }
}

pub fn csv_string(table: &ReportTable) -> String {
  let Some(first) = table.rows().first() else {
    return String::new();
  };

  let mut out = String::new();
  let header: Vec<String> = first.labels().map(csv_field).collect();
  out.push_str(&header.join(","));
  out.push('\n');

  for row in table.rows() {
    let cells: Vec<String> = row.cells().map(|c| csv_field(&c.to_string())).collect();
    out.push_str(&cells.join(","));
    out.push('\n');
  }

  out
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
  std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

pub fn write_artifact(output: &ReportOutput, format: ExportFormat, dir: &Path) -> Result<PathBuf> {
  let path = dir.join(format.file_name(&output.name));

  match format {
    ExportFormat::Csv => write_file(&path, csv_string(&output.table).as_bytes())?,
    ExportFormat::Graph => write_file(&path, &serde_json::to_vec_pretty(&output.table.graph(&output.name))?)?,
    ExportFormat::Json => write_file(&path, &serde_json::to_vec_pretty(output)?)?,
  }
  info!(path = %path.display(), "wrote artifact");

  Ok(path)
}

/// Write every selected artifact; returns file names relative to `dir`.
pub fn export(output: &ReportOutput, formats: &[ExportFormat], dir: &Path) -> Result<Vec<String>> {
  let mut files = Vec::with_capacity(formats.len());

  for format in formats {
    write_artifact(output, *format, dir)?;
    files.push(format.file_name(&output.name));
  }

  Ok(files)
}
