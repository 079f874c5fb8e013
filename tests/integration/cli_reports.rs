use predicates::prelude::*;
use serde_json::Value;
use test_support::{cmd_bin, fixture_env, tempdir};

/// Fixture-backed run pinned to 2024-01-20 (range 2024-01-01..2024-01-21, two 14-day windows).
fn mergometer(args: &[&str]) -> assert_cmd::Command {
  let mut cmd = cmd_bin("mergometer");
  cmd.envs(fixture_env());
  cmd.args(["org/a", "--since", "2024-01-01", "--now-override", "2024-01-20", "--quiet"]);
  cmd.args(args);
  cmd
}

fn stdout_of(cmd: &mut assert_cmd::Command) -> String {
  let out = cmd.output().unwrap();
  assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
  String::from_utf8(out.stdout).unwrap()
}

#[test]
fn weekly_report_prints_table_and_median() {
  let stdout = stdout_of(&mut mergometer(&["--report", "weekly"]));
  insta::assert_snapshot!(stdout.trim_end(), @r"
  == WeeklyReport ==
  ┌────────────┬───────┐
  │ week       │ count │
  ├────────────┼───────┤
  │ 2024-01-01 │     2 │
  │ 2024-01-08 │     1 │
  └────────────┴───────┘
  2 rows in set
  Median num of PRs/week: 1.5
  Total number of PRs checked: 4 (type:pr is:merged)
  ");
}

#[test]
fn all_reports_run_in_order_by_default() {
  let stdout = stdout_of(&mut mergometer(&[]));
  let positions: Vec<usize> = ["== PullRequestReport ==", "== ReviewReport ==", "== ReviewRequestReport ==", "== WeeklyReport =="]
    .iter()
    .map(|h| stdout.find(h).unwrap_or_else(|| panic!("missing {h}")))
    .collect();
  assert!(positions.windows(2).all(|w| w[0] < w[1]), "{:?}", positions);
}

#[test]
fn review_report_counts_reviewers_and_awaiting_reviews() {
  let stdout = stdout_of(&mut mergometer(&["--report", "reviews"]));
  assert!(stdout.contains("│ week       │ bob │ alice │ dave │ Total │ Average │"), "{}", stdout);
  assert!(stdout.contains("│ 2024-01-01 │   1 │     1 │    1 │     3 │     1.0 │"), "{}", stdout);
  assert!(stdout.contains("│ 2024-01-08 │   1 │     0 │    0 │     1 │    0.33 │"), "{}", stdout);
  assert!(stdout.contains("Grand total: 4\n"));
  assert!(stdout.contains("Total number of PRs checked: 4 (type:pr)"));
  assert!(stdout.contains("-- PRs awaiting review (now) --\nPRs awaiting review: 2\n"));
  assert!(stdout.contains("https://github.com/pulls?q=repo%3Aorg%2Fa+is%3Apr+is%3Aopen"));
}

#[test]
fn exports_csv_graph_and_manifest() {
  let td = tempdir();
  let out_dir = td.path().to_string_lossy().to_string();
  mergometer(&["--report", "pull-requests,weekly,review-requests", "--out", &out_dir])
    .assert()
    .success()
    .stdout(predicate::str::contains("== PullRequestReport =="));

  let csv = std::fs::read_to_string(td.path().join("PullRequestReport.csv")).unwrap();
  assert_eq!(csv, "week,alice,bob,Total,Average\n2024-01-01,1,1,2,1.0\n2024-01-08,1,0,1,0.5\n");

  let weekly = std::fs::read_to_string(td.path().join("WeeklyReport.csv")).unwrap();
  assert_eq!(weekly, "week,count\n2024-01-01,2\n2024-01-08,1\n");

  let requests = std::fs::read_to_string(td.path().join("ReviewRequestReport.csv")).unwrap();
  assert_eq!(requests, "week,bob,dave,Total,Average\n2024-01-01,1,1,2,1.0\n2024-01-08,0,0,0,0.0\n");

  let graph: Value = serde_json::from_slice(&std::fs::read(td.path().join("WeeklyReport.graph.json")).unwrap()).unwrap();
  assert_eq!(graph["labels"], serde_json::json!(["2024-01-01", "2024-01-08"]));
  assert_eq!(graph["series"][0]["name"], "count");

  assert!(!td.path().join("WeeklyReport.json").exists());

  let manifest: Value = serde_json::from_slice(&std::fs::read(td.path().join("manifest.json")).unwrap()).unwrap();
  assert_eq!(manifest["repos"], serde_json::json!(["org/a"]));
  assert_eq!(manifest["range"]["start"], "2024-01-01");
  assert_eq!(manifest["range"]["end"], "2024-01-21");
  let names: Vec<&str> = manifest["reports"].as_array().unwrap().iter().map(|r| r["name"].as_str().unwrap()).collect();
  assert_eq!(names, vec!["PullRequestReport", "WeeklyReport", "ReviewRequestReport"]);
  assert_eq!(manifest["reports"][0]["windows"]["total"], 2);
}

#[test]
fn json_export_holds_rows_and_summary() {
  let td = tempdir();
  let out_dir = td.path().to_string_lossy().to_string();
  mergometer(&["--report", "weekly", "--export", "json", "--out", &out_dir]).assert().success();

  assert!(!td.path().join("WeeklyReport.csv").exists());
  let report: Value = serde_json::from_slice(&std::fs::read(td.path().join("WeeklyReport.json")).unwrap()).unwrap();
  assert_eq!(report["name"], "WeeklyReport");
  assert_eq!(report["checked"], 4);
  assert_eq!(report["table"]["rows"][0], serde_json::json!({"week": "2024-01-01", "count": 2}));
  assert_eq!(report["summary"][0]["value"], 1.5);
}

#[test]
fn monthly_grouping_collapses_weeks() {
  let stdout = stdout_of(&mut mergometer(&["--report", "pull-requests", "--group-by", "month"]));
  assert!(stdout.contains("│ month   │ alice │ bob │ Total │ Average │"), "{}", stdout);
  assert!(stdout.contains("│ 2024-01 │     2 │   1 │     3 │     1.5 │"), "{}", stdout);
  assert!(stdout.contains("1 row in set"));
}

#[test]
fn repos_can_come_from_the_environment() {
  let mut cmd = cmd_bin("mergometer");
  cmd
    .envs(fixture_env())
    .env("MERGOMETER_REPOS", "org/a")
    .args(["--report", "weekly", "--since", "2024-01-01", "--now-override", "2024-01-20", "--quiet"]);
  let stdout = stdout_of(&mut cmd);
  assert!(stdout.contains("== WeeklyReport =="));
}
