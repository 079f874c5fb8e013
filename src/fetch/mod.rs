// Upstream collaborator: GitHub search windows, per-PR lookups and the preload phase.

pub mod github_api;
pub mod preload;
pub mod pull_requests;
