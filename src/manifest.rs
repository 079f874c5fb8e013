// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Build and write the run manifest listing every report produced in one invocation
// role: persistence/manifest
// inputs: repos, generated_at, date range, window size, group-by, per-report entries
// outputs: manifest.json file written under the output directory
// side_effects: Writes to filesystem
// invariants:
// - reports[] keeps the order reports were run in
// - file names in entries are relative to the output directory
// - generated_at is serialized in %Y-%m-%dT%H:%M:%S (local)
// errors: IO errors surfaced with full path context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use serde_json::{json, Value};

pub struct ReportEntry {
  pub name: String,
  pub rows: usize,
  pub checked: usize,
  pub windows_fetched: usize,
  pub windows_total: usize,
  pub partial: Option<String>,
  pub files: Vec<String>,
}

/// Manifest for one run; reports are appended as they finish.
pub struct RunManifest {
  value: Value,
  reports: Vec<Value>,
}

impl RunManifest {
  pub fn new(
    repos: &[String],
    generated_at: DateTime<Local>,
    start: NaiveDate,
    end: NaiveDate,
    window_days: u32,
    group_by: &str,
  ) -> Self {
    let value = json!({
      "repos": repos,
      "generated_at": generated_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
      "range": {"start": start.to_string(), "end": end.to_string()},
      "window_days": window_days,
      "group_by": group_by,
    });
    Self {
      value,
      reports: Vec::new(),
    }
  }

  pub fn push_report(&mut self, entry: ReportEntry) {
    self.reports.push(json!({
      "name": entry.name,
      "rows": entry.rows,
      "checked": entry.checked,
      "windows": {"fetched": entry.windows_fetched, "total": entry.windows_total},
      "partial": entry.partial,
      "files": entry.files,
    }));
  }

  pub fn as_value(&self) -> Value {
    let mut v = self.value.clone();
    v["reports"] = Value::Array(self.reports.clone());
    v
  }

  pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
    let path = dir.join("manifest.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&self.as_value())?)
      .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
  }
}
