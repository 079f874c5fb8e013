// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Render a ReportOutput as a box-drawn terminal table with summary lines
// role: output/text
// inputs: ReportOutput, optional partial-harvest note
// outputs: UTF-8 text for stdout
// invariants:
// - columns follow ReportTable::headers(); numbers right-aligned, text left-aligned
// - the awaiting-review snapshot prints under its own heading, after the time series
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::fmt::Write as _;

use crate::report::ReportOutput;
use crate::table::{format_decimal, ReportTable};

fn border(widths: &[usize], left: &str, mid: &str, right: &str) -> String {
  let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
  format!("{}{}{}", left, segments.join(mid), right)
}

fn line(cells: &[(String, bool)], widths: &[usize]) -> String {
  let padded: Vec<String> = cells
    .iter()
    .zip(widths)
    .map(|((text, numeric), w)| if *numeric { format!("{:>w$}", text, w = *w) } else { format!("{:<w$}", text, w = *w) })
    .collect();
  format!("│ {} │", padded.join(" │ "))
}

/// Box-drawn table followed by a row count.
pub fn render_table(table: &ReportTable) -> String {
  let rows = table.rows();
  if rows.is_empty() {
    return "0 rows in set\n".to_string();
  }

  let headers = table.headers();
  let body: Vec<Vec<(String, bool)>> = rows
    .iter()
    .map(|row| {
      headers
        .iter()
        .map(|h| match row.get(h) {
          Some(cell) => (cell.to_string(), cell.is_numeric()),
          None => (String::new(), false),
        })
        .collect()
    })
    .collect();

  let widths: Vec<usize> = headers
    .iter()
    .enumerate()
    .map(|(i, h)| {
      body
        .iter()
        .map(|r| r[i].0.chars().count())
        .chain(std::iter::once(h.chars().count()))
        .max()
        .unwrap_or(0)
    })
    .collect();

  let header_cells: Vec<(String, bool)> = headers.iter().map(|h| (h.clone(), false)).collect();
  let mut out = String::new();
  let _ = writeln!(out, "{}", border(&widths, "┌", "┬", "┐"));
  let _ = writeln!(out, "{}", line(&header_cells, &widths));
  let _ = writeln!(out, "{}", border(&widths, "├", "┼", "┤"));
  for r in &body {
    let _ = writeln!(out, "{}", line(r, &widths));
  }
  let _ = writeln!(out, "{}", border(&widths, "└", "┴", "┘"));
  let _ = writeln!(out, "{} {} in set", rows.len(), if rows.len() == 1 { "row" } else { "rows" });

  out
}

fn format_stat(value: f64) -> String {
  if value.is_finite() && value.fract() == 0.0 {
    format!("{}", value as i64)
  } else {
    format_decimal(value)
  }
}

pub fn render_report(output: &ReportOutput, partial: Option<&str>) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "== {} ==", output.name);
  out.push_str(&render_table(&output.table));

  for stat in &output.summary {
    let _ = writeln!(out, "{}: {}", stat.label, format_stat(stat.value));
  }
  let _ = writeln!(out, "Total number of PRs checked: {} ({})", output.checked, output.filter);

  if let Some(note) = partial {
    let _ = writeln!(out, "Partial results: {}", note);
  }

  if let Some(snapshot) = &output.snapshot {
    let _ = writeln!(out, "-- {} (now) --", snapshot.label);
    let _ = writeln!(out, "{}: {}", snapshot.label, snapshot.count);
    let _ = writeln!(out, "{}", snapshot.url);
  }
  out.push('\n');

  out
}
