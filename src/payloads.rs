//! Raw GitHub REST response shapes.
//!
//! Only the top-level fields a report cannot do without are required; everything else is
//! defaulted. Polymorphic sub-objects (users, labels, timeline events) stay as
//! `serde_json::Value` and are handled by the normalizer.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct RepoSearchPayload {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub items: Vec<RepoPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepoPayload {
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    #[serde(default)]
    pub watchers_count: u64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub license: Option<LicensePayload>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub pushed_at: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub private: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LicensePayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub spdx_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeSearchPayload {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub items: Vec<CodeItemPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeItemPayload {
    pub path: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub html_url: String,
}

/// One entry of `GET /repos/{o}/{r}/contents/{path}`. The same shape is used for a
/// single file (with `content`) and for each element of a directory listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentPayload {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MilestonePayload {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssuePayload {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user: Option<Value>,
    #[serde(default)]
    pub labels: Vec<Value>,
    #[serde(default)]
    pub assignees: Vec<Value>,
    #[serde(default)]
    pub milestone: Option<MilestonePayload>,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub closed_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BranchPayload {
    #[serde(default, rename = "ref")]
    pub git_ref: String,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestPayload {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user: Option<Value>,
    #[serde(default)]
    pub labels: Vec<Value>,
    #[serde(default)]
    pub assignees: Vec<Value>,
    #[serde(default)]
    pub milestone: Option<MilestonePayload>,
    #[serde(default)]
    pub head: BranchPayload,
    #[serde(default)]
    pub base: BranchPayload,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub changed_files: u64,
    #[serde(default)]
    pub commits: u64,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub closed_at: Option<String>,
    #[serde(default)]
    pub merged_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewPayload {
    pub id: u64,
    #[serde(default)]
    pub user: Option<Value>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewCommentPayload {
    pub id: u64,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub line: Option<u64>,
    #[serde(default)]
    pub original_line: Option<u64>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub user: Option<Value>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub diff_hunk: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitPayload {
    pub sha: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub commit: CommitDetailPayload,
    #[serde(default)]
    pub author: Option<Value>,
    #[serde(default)]
    pub stats: Option<CommitStatsPayload>,
    #[serde(default)]
    pub files: Vec<CommitFilePayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitDetailPayload {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author: Option<GitActorPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitActorPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitStatsPayload {
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitFilePayload {
    pub filename: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub patch: Option<String>,
}
