use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod aggregate;
mod cli;
mod error;
mod export;
mod ext;
mod fetch;
mod manifest;
mod model;
mod pipeline;
mod render;
mod report;
mod table;
mod util;
mod window;

use crate::cli::{normalize, Cli};

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mergometer=info"));
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .try_init();
}

fn main() -> Result<()> {
  dotenvy::dotenv().ok();
  init_tracing();

  let cli = Cli::parse();

  if cli.gen_man {
    let page = util::render_man_page::<Cli>()?;
    print!("{}", page);
    return Ok(());
  }

  // Phase 1: normalize CLI (repos, range, group-by, report selection)
  let cfg = normalize(cli)?;
  tracing::debug!(config = ?cfg, "effective configuration");

  // Phase 2: fetch, aggregate, print and export each report
  pipeline::run(&cfg)
}
