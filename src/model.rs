//! Normalized entities and the reports the renderer consumes.
//!
//! Every value here is fully defaulted: renderer code never has to look at raw API JSON.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub login: String,
    pub profile_url: String,
}

impl Default for User {
    fn default() -> Self {
        Self {
            login: "unknown".to_string(),
            profile_url: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Label {
    pub name: String,
    pub color: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueRef {
    pub number: u64,
    pub title: String,
}

/// Type-specific payload of a timeline event. The variant is picked from the event
/// discriminator through `normalize::EVENT_SHAPES`; kinds that share a shape
/// (`labeled`/`unlabeled`, ...) share a variant and are told apart by `TimelineEvent::kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum EventDetail {
    None,
    Body { body: String },
    Label { label: Option<Label> },
    Assignee { assignee: Option<User> },
    Milestone { title: Option<String> },
    Rename { rename: Option<Rename> },
    CrossReference { issue: Option<IssueRef> },
    Commit {
        commit_id: Option<String>,
        commit_url: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEvent {
    /// Discriminator exactly as GitHub sent it, `"unknown"` when missing.
    pub kind: String,
    pub created_at: String,
    /// `None` for events without an actor (automation, commits).
    pub actor: Option<User>,
    pub detail: EventDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
    #[serde(untagged)]
    Other(String),
}

impl ReviewState {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "APPROVED" => ReviewState::Approved,
            "CHANGES_REQUESTED" => ReviewState::ChangesRequested,
            "COMMENTED" => ReviewState::Commented,
            "DISMISSED" => ReviewState::Dismissed,
            "PENDING" => ReviewState::Pending,
            other => ReviewState::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ReviewState::Approved => "APPROVED",
            ReviewState::ChangesRequested => "CHANGES_REQUESTED",
            ReviewState::Commented => "COMMENTED",
            ReviewState::Dismissed => "DISMISSED",
            ReviewState::Pending => "PENDING",
            ReviewState::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewComment {
    pub id: u64,
    pub file_path: String,
    pub line_number: Option<u64>,
    pub body: String,
    pub author: User,
    pub created_at: String,
    pub diff_context: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Review {
    pub id: u64,
    pub author: User,
    pub body: Option<String>,
    pub state: ReviewState,
    pub submitted_at: Option<String>,
    pub comments: Vec<ReviewComment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Removed,
    Modified,
}

impl FileStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "added" => FileStatus::Added,
            "removed" => FileStatus::Removed,
            _ => FileStatus::Modified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitFileChange {
    pub filename: String,
    pub status: FileStatus,
    pub additions: u64,
    pub deletions: u64,
    pub patch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueReport {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub author: User,
    pub body: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub closed_at: Option<String>,
    pub labels: Vec<Label>,
    pub assignees: Vec<User>,
    pub milestone: Option<String>,
    pub comments: u64,
    pub url: String,
    pub timeline: Vec<TimelineEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestReport {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub draft: bool,
    pub merged_at: Option<String>,
    pub author: User,
    pub body: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub closed_at: Option<String>,
    pub labels: Vec<Label>,
    pub assignees: Vec<User>,
    pub milestone: Option<String>,
    pub head_ref: String,
    pub base_ref: String,
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
    pub commits: u64,
    pub url: String,
    pub reviews: Vec<Review>,
    pub timeline: Vec<TimelineEvent>,
    pub diff: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitReport {
    pub sha: String,
    pub message: String,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    /// GitHub account linked to the commit, when there is one.
    pub author: Option<User>,
    pub date: String,
    pub url: String,
    pub additions: u64,
    pub deletions: u64,
    pub files: Vec<CommitFileChange>,
    pub diff: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoInfo {
    pub full_name: String,
    pub description: Option<String>,
    pub url: String,
    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
    pub watchers: u64,
    pub language: Option<String>,
    pub license: Option<String>,
    pub topics: Vec<String>,
    pub default_branch: Option<String>,
    pub homepage: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub pushed_at: Option<String>,
    pub archived: bool,
    pub fork: bool,
    pub private: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoSearchResults {
    pub query: String,
    pub total_count: u64,
    pub items: Vec<RepoInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeMatch {
    pub path: String,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeSearchResults {
    pub query: String,
    pub repository: String,
    pub total_count: u64,
    pub items: Vec<CodeMatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileContent {
    pub repository: String,
    pub path: String,
    pub name: String,
    pub size: u64,
    pub sha: String,
    pub git_ref: Option<String>,
    pub url: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Dir,
    File,
    Symlink,
    Submodule,
}

impl EntryKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "dir" => EntryKind::Dir,
            "symlink" => EntryKind::Symlink,
            "submodule" => EntryKind::Submodule,
            _ => EntryKind::File,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntry {
    pub name: String,
    pub path: String,
    pub kind: EntryKind,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryListing {
    pub repository: String,
    pub path: String,
    pub entries: Vec<DirEntry>,
}
