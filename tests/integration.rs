// Driver for integration + snapshot tests under tests/integration/
// Keeps tests organized in a subdirectory while remaining visible to Cargo.
//
#[path = "integration/cli_errors.rs"]
mod cli_errors;
#[path = "integration/cli_gen_man.rs"]
mod cli_gen_man;
#[path = "integration/cli_reports.rs"]
mod cli_reports;
