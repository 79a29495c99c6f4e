pub mod artifacts;
pub mod client;
pub mod comments;

use serde::Deserialize;
use std::fmt;

pub use client::{GithubClient, Listing, Page};

#[derive(PartialEq, Hash, Eq, PartialOrd, Ord, Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct GithubHandle(pub String);

/// `owner/name` of a repository.
#[derive(PartialEq, Eq, Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct RepositoryName(pub String);

impl RepositoryName {
    /// GitHub asks API clients to identify themselves with a user name, the repository
    /// owner is used.
    pub fn owner(&self) -> &str {
        self.0.split('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub head: Branch,
    pub user: GithubUser,
    #[serde(default)]
    pub locked: bool,
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
pub struct Branch {
    #[serde(rename = "ref")]
    pub ref_: String,
    pub sha: String,
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
pub struct GithubUser {
    pub login: GithubHandle,
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    pub head_sha: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct WorkflowRuns {
    pub workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub archive_download_url: String,
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct Artifacts {
    pub artifacts: Vec<Artifact>,
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
pub struct IssueComment {
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct RateLimitStatus {
    pub resources: RateLimitResources,
}

/// Only the `core` resource matters, `search` is a separate allotment this tool
/// never uses.
#[derive(Debug, PartialEq, Deserialize)]
pub struct RateLimitResources {
    pub core: RateLimit,
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    pub reset: u64,
}

impl Listing for WorkflowRuns {
    type Item = WorkflowRun;
    fn into_items(self) -> Vec<WorkflowRun> {
        self.workflow_runs
    }
}

impl Listing for Artifacts {
    type Item = Artifact;
    fn into_items(self) -> Vec<Artifact> {
        self.artifacts
    }
}
