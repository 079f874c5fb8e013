use predicates::prelude::*;
use test_support::{cmd_bin, fixture_env, read_fixture_text};

fn base() -> assert_cmd::Command {
  let mut cmd = cmd_bin("mergometer");
  cmd.args(["--since", "2024-01-01", "--now-override", "2024-01-20", "--quiet"]);
  cmd
}

#[test]
fn missing_repos_is_rejected() {
  base()
    .envs(fixture_env())
    .assert()
    .failure()
    .stderr(predicate::str::contains("at least one repository"));
}

#[test]
fn zero_window_days_is_rejected() {
  base()
    .envs(fixture_env())
    .args(["org/a", "--window-days", "0"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("--window-days must be at least 1"));
}

#[test]
fn group_by_must_be_a_known_time_bucket() {
  base()
    .envs(fixture_env())
    .args(["org/a", "--group-by", "colour"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown field `colour`"));

  base()
    .envs(fixture_env())
    .args(["org/a", "--group-by", "user"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("time bucket"));
}

#[test]
fn unresolvable_reviewers_fail_the_run() {
  base()
    .env("MERGO_TEST_SEARCH_JSON", read_fixture_text("search_items.json"))
    .args(["org/a", "--report", "reviews"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("field `reviewers` could not be resolved for pull request #1"));
}

#[test]
fn upstream_search_errors_propagate() {
  base()
    .envs(fixture_env())
    .env("MERGO_TEST_SEARCH_ERROR", "HTTP 422: validation failed")
    .args(["org/a", "--report", "weekly"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("HTTP 422: validation failed"));
}

#[test]
fn rate_limit_yields_partial_results() {
  base()
    .envs(fixture_env())
    .env("MERGO_TEST_RATE_LIMIT_AFTER", "1")
    .args(["org/a", "--report", "weekly"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Partial results: rate limited after 1 of 2 windows"))
    .stdout(predicate::str::contains("│ 2024-01-01 │     2 │"));
}

#[test]
fn window_budget_marks_results_partial() {
  base()
    .envs(fixture_env())
    .args(["org/a", "--report", "weekly", "--max-windows", "1"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Partial results: stopped after 1 of 2 windows (--max-windows)"));
}
