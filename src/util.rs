// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Utilities for the effective "today", output directories, search URLs, and man page rendering
// role: utilities/helpers
// inputs: Various primitives; NaiveDate; paths; clap CommandFactory
// outputs: Dates, directories ensured, URLs, man page text
// side_effects: prepare_out_dir creates directories
// invariants:
// - prepare_out_dir returns None only for "-" (stdout-only runs)
// - search_url percent-encodes the whole query
// errors: IO errors bubble with context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::CommandFactory;

const SEARCH_PAGE: &str = "https://github.com/pulls?q=";

/// Returns the effective "today" given an optional override.
///
/// Centralizes test determinism without sprinkling `Local::now()` throughout the code.
pub fn effective_today(override_today: Option<NaiveDate>) -> NaiveDate {
  override_today.unwrap_or_else(|| Local::now().date_naive())
}

/// Prepare the artifact directory. `-` means print tables only and write nothing.
pub fn prepare_out_dir(out: &str) -> Result<Option<PathBuf>> {
  if out == "-" {
    return Ok(None);
  }
  let dir = PathBuf::from(out);
  std::fs::create_dir_all(&dir).with_context(|| format!("creating output directory {}", dir.display()))?;

  Ok(Some(dir))
}

/// Browser link for a search query.
pub fn search_url(query: &str) -> String {
  let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
  format!("{}{}", SEARCH_PAGE, encoded)
}

/// Render a section-1 man page for a clap `CommandFactory` implementor.
/// Returns the troff content as a UTF-8 string.
pub fn render_man_page<T: CommandFactory>() -> Result<String> {
  let cmd = T::command();
  let man = clap_mangen::Man::new(cmd);
  let mut buf: Vec<u8> = Vec::new();

  man.render(&mut buf)?;

  Ok(String::from_utf8_lossy(&buf).to_string())
}
