// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: GitHub REST access for search windows, PR reviews and issue events behind a swappable trait
// role: fetch/github-api
// inputs: search query strings, owner/name + PR number; env GITHUB_TOKEN / GH_TOKEN; optional `gh` CLI
// outputs: SearchResults (total_count + items) and raw JSON arrays for reviews / events
// side_effects: Network calls to the configured API base URL; spawns `gh` for token discovery
// invariants:
// - search and per-PR list pagination stop on a short page or at 10 pages x 100 items
// - count-only searches make one per_page=1 request
// - 404 on a per-PR endpoint is Ok(None) so preload can raise FieldResolution
// - 403/429 with an exhausted rate limit is RateLimited; any other failure is UpstreamQuery
// - cached wrapper never caches errors
// - MERGO_TEST_* env vars switch the whole seam to fixture data
// errors: ReportError::{UpstreamQuery, RateLimited}; no retries
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ReportError, Result};
use crate::ext::serde_json::JsonFetch;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const SEARCH_RESULT_CAP: u64 = 1000;
const PER_PAGE: u64 = 100;
const MAX_PAGES: u64 = SEARCH_RESULT_CAP / PER_PAGE;

pub const ENV_PREFIX: &str = "MERGO_TEST_";
pub const ENV_SEARCH: &str = "MERGO_TEST_SEARCH_JSON";
pub const ENV_OPEN_SEARCH: &str = "MERGO_TEST_OPEN_SEARCH_JSON";
pub const ENV_REVIEWS: &str = "MERGO_TEST_REVIEWS_JSON";
pub const ENV_EVENTS: &str = "MERGO_TEST_EVENTS_JSON";
pub const ENV_RATE_LIMIT_AFTER: &str = "MERGO_TEST_RATE_LIMIT_AFTER";
pub const ENV_SEARCH_ERROR: &str = "MERGO_TEST_SEARCH_ERROR";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
  pub total_count: u64,
  pub items: Vec<Value>,
}

/// Discover a GitHub token: env vars first, then `gh auth token` if available.
pub fn get_github_token() -> Option<String> {
  for key in ["GITHUB_TOKEN", "GH_TOKEN"] {
    if let Ok(t) = std::env::var(key) {
      if !t.trim().is_empty() {
        return Some(t.trim().to_string());
      }
    }
  }

  if let Ok(output) = std::process::Command::new("gh").args(["auth", "token"]).output() {
    if output.status.success() {
      let t = String::from_utf8_lossy(&output.stdout).trim().to_string();

      if !t.is_empty() {
        return Some(t);
      }
    }
  }

  None
}

// --- Trait seam for GitHub API ---
pub trait GithubApi {
  fn search_issues(&self, query: &str) -> Result<SearchResults>;

  /// `total_count` for `query` without needing its items.
  fn search_count(&self, query: &str) -> Result<u64> {
    Ok(self.search_issues(query)?.total_count)
  }

  fn list_reviews_json(&self, repo: &str, number: u64) -> Result<Option<Value>>;
  fn list_issue_events_json(&self, repo: &str, number: u64) -> Result<Option<Value>>;
}

// --- Per-run in-memory cache ---
// Report kinds sharing a filter issue identical window queries; each is fetched once.
struct GithubCachedApi {
  inner: Box<dyn GithubApi>,
  searches: RefCell<HashMap<String, SearchResults>>,
  reviews: RefCell<HashMap<String, Option<Value>>>,
  events: RefCell<HashMap<String, Option<Value>>>,
}

impl GithubCachedApi {
  fn new(inner: Box<dyn GithubApi>) -> Self {
    Self {
      inner,
      searches: RefCell::new(HashMap::new()),
      reviews: RefCell::new(HashMap::new()),
      events: RefCell::new(HashMap::new()),
    }
  }

  #[inline]
  fn key_num(repo: &str, number: u64) -> String {
    format!("{}#{}", repo, number)
  }
}

impl GithubApi for GithubCachedApi {
  fn search_issues(&self, query: &str) -> Result<SearchResults> {
    if let Some(v) = self.searches.borrow().get(query).cloned() {
      debug!(query, "search served from cache");
      return Ok(v);
    }
    let v = self.inner.search_issues(query)?;
    self.searches.borrow_mut().insert(query.to_string(), v.clone());

    Ok(v)
  }

  fn search_count(&self, query: &str) -> Result<u64> {
    if let Some(v) = self.searches.borrow().get(query) {
      return Ok(v.total_count);
    }
    self.inner.search_count(query)
  }

  fn list_reviews_json(&self, repo: &str, number: u64) -> Result<Option<Value>> {
    let key = Self::key_num(repo, number);

    if let Some(v) = self.reviews.borrow().get(&key).cloned() {
      return Ok(v);
    }
    let v = self.inner.list_reviews_json(repo, number)?;
    self.reviews.borrow_mut().insert(key, v.clone());

    Ok(v)
  }

  fn list_issue_events_json(&self, repo: &str, number: u64) -> Result<Option<Value>> {
    let key = Self::key_num(repo, number);

    if let Some(v) = self.events.borrow().get(&key).cloned() {
      return Ok(v);
    }
    let v = self.inner.list_issue_events_json(repo, number)?;
    self.events.borrow_mut().insert(key, v.clone());

    Ok(v)
  }
}

struct GithubHttpApi {
  agent: ureq::Agent,
  base_url: String,
  token: Option<String>,
}

impl GithubHttpApi {
  fn new(base_url: &str, token: Option<String>) -> Self {
    let agent = ureq::AgentBuilder::new().timeout(Duration::from_secs(30)).build();

    Self {
      agent,
      base_url: base_url.trim_end_matches('/').to_string(),
      token,
    }
  }

  /// GET `path` with query params; `context` names the request in errors.
  fn get_json(&self, path: &str, params: &[(&str, &str)], context: &str) -> Result<Option<Value>> {
    let url = format!("{}{}", self.base_url, path);
    let mut req = self
      .agent
      .get(&url)
      .set("Accept", "application/vnd.github+json")
      .set("User-Agent", "mergometer");

    if let Some(token) = &self.token {
      req = req.set("Authorization", &format!("Bearer {}", token));
    }
    for (k, v) in params {
      req = req.query(k, v);
    }

    match req.call() {
      Ok(resp) => resp.into_json::<Value>().map(Some).map_err(|e| ReportError::UpstreamQuery {
        query: context.to_string(),
        message: format!("invalid JSON body: {}", e),
      }),
      Err(ureq::Error::Status(404, _)) => Ok(None),
      Err(ureq::Error::Status(code, resp)) if is_rate_limited(code, &resp) => Err(ReportError::RateLimited {
        query: context.to_string(),
      }),
      Err(ureq::Error::Status(code, resp)) => {
        let body = resp.into_string().unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
          .ok()
          .and_then(|v| v.fetch("message").to::<String>())
          .unwrap_or_else(|| body.trim().to_string());
        Err(ReportError::UpstreamQuery {
          query: context.to_string(),
          message: format!("HTTP {}: {}", code, message),
        })
      }
      Err(e) => Err(ReportError::UpstreamQuery {
        query: context.to_string(),
        message: e.to_string(),
      }),
    }
  }

  /// Concatenate every page of a per-PR list endpoint. `None` when the first page is 404.
  fn get_all_pages(&self, path: &str) -> Result<Option<Value>> {
    let per_page = PER_PAGE.to_string();
    let mut all = Vec::new();

    for page in 1..=MAX_PAGES {
      let page_s = page.to_string();
      let params = [("per_page", per_page.as_str()), ("page", page_s.as_str())];
      let items = match self.get_json(path, &params, path)? {
        Some(Value::Array(items)) => items,
        Some(_) => {
          return Err(ReportError::UpstreamQuery {
            query: path.to_string(),
            message: "expected a JSON array".to_string(),
          })
        }
        None if page == 1 => return Ok(None),
        None => break,
      };

      let fetched = items.len() as u64;
      all.extend(items);
      if fetched < PER_PAGE {
        return Ok(Some(Value::Array(all)));
      }
      debug!(path, page, "fetching next page");
    }

    if all.len() as u64 >= MAX_PAGES * PER_PAGE {
      warn!(path, entries = all.len(), "page cap reached; later entries are not counted");
    }
    Ok(Some(Value::Array(all)))
  }
}

fn is_rate_limited(code: u16, resp: &ureq::Response) -> bool {
  code == 429 || (code == 403 && resp.header("x-ratelimit-remaining") == Some("0"))
}

impl GithubApi for GithubHttpApi {
  fn search_issues(&self, query: &str) -> Result<SearchResults> {
    let per_page = PER_PAGE.to_string();
    let mut out = SearchResults::default();

    for page in 1..=MAX_PAGES {
      let page_s = page.to_string();
      let params = [("q", query), ("per_page", per_page.as_str()), ("page", page_s.as_str())];
      let Some(body) = self.get_json("/search/issues", &params, query)? else {
        break;
      };

      out.total_count = body.fetch("total_count").to_or_default::<u64>();
      let items = body.fetch("items").to_or_default::<Vec<Value>>();
      let fetched = items.len() as u64;
      out.items.extend(items);

      if fetched < PER_PAGE || out.items.len() as u64 >= out.total_count {
        break;
      }
    }

    Ok(out)
  }

  fn search_count(&self, query: &str) -> Result<u64> {
    let body = self.get_json("/search/issues", &[("q", query), ("per_page", "1")], query)?;
    Ok(body.map(|b| b.fetch("total_count").to_or_default::<u64>()).unwrap_or_default())
  }

  fn list_reviews_json(&self, repo: &str, number: u64) -> Result<Option<Value>> {
    self.get_all_pages(&format!("/repos/{}/pulls/{}/reviews", repo, number))
  }

  fn list_issue_events_json(&self, repo: &str, number: u64) -> Result<Option<Value>> {
    self.get_all_pages(&format!("/repos/{}/issues/{}/events", repo, number))
  }
}

/// Fixture-backed API for tests, driven by MERGO_TEST_* variables.
#[derive(Default)]
struct GithubEnvApi {
  searches: Cell<usize>,
}

fn read_env_json(key: &str) -> Option<Value> {
  let raw = std::env::var(key).ok()?;
  match serde_json::from_str::<Value>(&raw) {
    Ok(v) => Some(v),
    Err(e) => {
      warn!(key, error = %e, "ignoring malformed fixture JSON");
      None
    }
  }
}

/// Fixture maps are keyed by "owner/name#number" or plain "number".
fn lookup_per_pull(key: &str, repo: &str, number: u64) -> Option<Value> {
  let map = read_env_json(key)?;
  let found = map
    .get(format!("{}#{}", repo, number))
    .or_else(|| map.get(number.to_string()))
    .cloned();

  Some(found.unwrap_or_else(|| serde_json::json!([])))
}

impl GithubApi for GithubEnvApi {
  fn search_issues(&self, query: &str) -> Result<SearchResults> {
    if let Ok(message) = std::env::var(ENV_SEARCH_ERROR) {
      return Err(ReportError::UpstreamQuery {
        query: query.to_string(),
        message,
      });
    }

    let calls = self.searches.get();
    self.searches.set(calls + 1);

    let limit = std::env::var(ENV_RATE_LIMIT_AFTER).ok().and_then(|s| s.trim().parse::<usize>().ok());
    if limit.is_some_and(|l| calls >= l) {
      return Err(ReportError::RateLimited {
        query: query.to_string(),
      });
    }

    let key = if query.contains("is:open") { ENV_OPEN_SEARCH } else { ENV_SEARCH };
    let items = match read_env_json(key) {
      Some(Value::Array(items)) => items,
      Some(v) => v.fetch("items").to_or_default::<Vec<Value>>(),
      None => Vec::new(),
    };

    Ok(SearchResults {
      total_count: items.len() as u64,
      items,
    })
  }

  fn list_reviews_json(&self, repo: &str, number: u64) -> Result<Option<Value>> {
    Ok(lookup_per_pull(ENV_REVIEWS, repo, number))
  }

  fn list_issue_events_json(&self, repo: &str, number: u64) -> Result<Option<Value>> {
    Ok(lookup_per_pull(ENV_EVENTS, repo, number))
  }
}

pub fn env_wants_mock() -> bool {
  std::env::vars().any(|(k, _)| k.starts_with(ENV_PREFIX))
}

/// Pick the backend for this run and wrap it in the per-run cache.
pub fn build_api(base_url: &str, token: Option<String>) -> Box<dyn GithubApi> {
  let inner: Box<dyn GithubApi> = if env_wants_mock() {
    debug!("using MERGO_TEST_* fixture data instead of the GitHub API");
    Box::new(GithubEnvApi::default())
  } else {
    if token.is_none() {
      warn!("no GitHub token found (GITHUB_TOKEN, GH_TOKEN, gh auth token); using unauthenticated requests");
    }
    Box::new(GithubHttpApi::new(base_url, token))
  };

  Box::new(GithubCachedApi::new(inner))
}
