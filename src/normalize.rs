//! Raw GitHub payloads to normalized entities.
//!
//! All functions here are total: missing or oddly typed fields fall back to defaults
//! instead of failing the whole response.

use serde_json::Value;

use crate::model::{
    CodeMatch, CodeSearchResults, CommitFileChange, CommitReport, DirEntry, DirectoryListing,
    EntryKind, EventDetail, FileStatus, IssueRef, IssueReport, Label, PullRequestReport, Rename,
    RepoInfo, RepoSearchResults, Review, ReviewComment, ReviewState, TimelineEvent, User,
};
use crate::payloads::{
    CodeSearchPayload, CommitFilePayload, CommitPayload, ContentPayload, IssuePayload,
    PullRequestPayload, RepoPayload, RepoSearchPayload, ReviewCommentPayload, ReviewPayload,
};

/// Which type-specific fields a timeline event carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventShape {
    Body,
    Label,
    Assignee,
    Milestone,
    Rename,
    CrossReference,
    Commit,
}

/// Discriminator to shape. Kinds missing from this table keep only the base fields.
pub const EVENT_SHAPES: &[(&str, EventShape)] = &[
    ("commented", EventShape::Body),
    ("reviewed", EventShape::Body),
    ("labeled", EventShape::Label),
    ("unlabeled", EventShape::Label),
    ("assigned", EventShape::Assignee),
    ("unassigned", EventShape::Assignee),
    ("milestoned", EventShape::Milestone),
    ("demilestoned", EventShape::Milestone),
    ("renamed", EventShape::Rename),
    ("cross-referenced", EventShape::CrossReference),
    ("referenced", EventShape::Commit),
    ("committed", EventShape::Commit),
];

pub fn event_shape(kind: &str) -> Option<EventShape> {
    EVENT_SHAPES
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, shape)| *shape)
}

fn str_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

/// `Some` only for present, non-null values.
fn present<'a>(raw: &'a Value, key: &str) -> Option<&'a Value> {
    raw.get(key).filter(|v| !v.is_null())
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

pub fn normalize_user(raw: Option<&Value>) -> User {
    let default = User::default();
    match raw {
        Some(v) if v.is_object() => User {
            login: str_field(v, "login").unwrap_or(default.login),
            profile_url: str_field(v, "html_url").unwrap_or(default.profile_url),
        },
        _ => default,
    }
}

pub fn normalize_label(raw: &Value) -> Label {
    match raw {
        Value::String(name) => Label {
            name: name.clone(),
            color: String::new(),
            description: None,
        },
        other => Label {
            name: str_field(other, "name").unwrap_or_default(),
            color: str_field(other, "color").unwrap_or_default(),
            description: str_field(other, "description"),
        },
    }
}

pub fn normalize_labels(raw: &[Value]) -> Vec<Label> {
    raw.iter().map(normalize_label).collect()
}

fn event_detail(shape: EventShape, raw: &Value) -> EventDetail {
    match shape {
        EventShape::Body => EventDetail::Body {
            body: str_field(raw, "body").unwrap_or_default(),
        },
        EventShape::Label => EventDetail::Label {
            label: present(raw, "label").map(normalize_label),
        },
        EventShape::Assignee => EventDetail::Assignee {
            assignee: present(raw, "assignee").map(|a| normalize_user(Some(a))),
        },
        EventShape::Milestone => EventDetail::Milestone {
            title: present(raw, "milestone").and_then(|m| str_field(m, "title")),
        },
        EventShape::Rename => EventDetail::Rename {
            rename: present(raw, "rename").map(|r| Rename {
                from: str_field(r, "from").unwrap_or_default(),
                to: str_field(r, "to").unwrap_or_default(),
            }),
        },
        EventShape::CrossReference => EventDetail::CrossReference {
            issue: present(raw, "source")
                .and_then(|s| present(s, "issue"))
                .map(|issue| IssueRef {
                    number: issue.get("number").and_then(Value::as_u64).unwrap_or(0),
                    title: str_field(issue, "title").unwrap_or_default(),
                }),
        },
        EventShape::Commit => EventDetail::Commit {
            commit_id: str_field(raw, "commit_id"),
            commit_url: str_field(raw, "commit_url"),
        },
    }
}

pub fn normalize_timeline_event(raw: &Value) -> TimelineEvent {
    // GitHub's REST timeline calls the discriminator `event`; older shapes used `type`.
    let kind = str_field(raw, "event")
        .or_else(|| str_field(raw, "type"))
        .unwrap_or_else(|| "unknown".to_string());
    let detail = match event_shape(&kind) {
        Some(shape) => event_detail(shape, raw),
        None => EventDetail::None,
    };
    TimelineEvent {
        created_at: str_field(raw, "created_at").unwrap_or_default(),
        actor: present(raw, "actor").map(|a| normalize_user(Some(a))),
        kind,
        detail,
    }
}

/// Keeps GitHub's order; nothing is sorted or dropped here.
pub fn normalize_timeline_events(raw: &[Value]) -> Vec<TimelineEvent> {
    raw.iter().map(normalize_timeline_event).collect()
}

pub fn normalize_review_comment(raw: ReviewCommentPayload) -> ReviewComment {
    ReviewComment {
        id: raw.id,
        file_path: raw.path,
        line_number: raw.line.or(raw.original_line),
        body: raw.body,
        author: normalize_user(raw.user.as_ref()),
        created_at: raw.created_at,
        diff_context: raw.diff_hunk,
    }
}

pub fn normalize_review(raw: ReviewPayload, comments: Vec<ReviewCommentPayload>) -> Review {
    Review {
        id: raw.id,
        author: normalize_user(raw.user.as_ref()),
        body: non_blank(raw.body),
        state: ReviewState::parse(raw.state.as_deref().unwrap_or_default()),
        submitted_at: raw.submitted_at,
        comments: comments.into_iter().map(normalize_review_comment).collect(),
    }
}

pub fn normalize_commit_file(raw: CommitFilePayload) -> CommitFileChange {
    CommitFileChange {
        status: FileStatus::parse(&raw.status),
        filename: raw.filename,
        additions: raw.additions,
        deletions: raw.deletions,
        patch: raw.patch,
    }
}

fn milestone_title(m: Option<crate::payloads::MilestonePayload>) -> Option<String> {
    non_blank(m.and_then(|m| m.title))
}

pub fn normalize_issue(raw: IssuePayload, timeline: &[Value]) -> IssueReport {
    IssueReport {
        number: raw.number,
        title: raw.title,
        state: raw.state,
        author: normalize_user(raw.user.as_ref()),
        body: non_blank(raw.body),
        created_at: raw.created_at.unwrap_or_default(),
        updated_at: raw.updated_at.unwrap_or_default(),
        closed_at: raw.closed_at,
        labels: normalize_labels(&raw.labels),
        assignees: raw
            .assignees
            .iter()
            .map(|a| normalize_user(Some(a)))
            .collect(),
        milestone: milestone_title(raw.milestone),
        comments: raw.comments,
        url: raw.html_url,
        timeline: normalize_timeline_events(timeline),
    }
}

pub fn normalize_pull_request(
    raw: PullRequestPayload,
    diff: String,
    reviews: Vec<(ReviewPayload, Vec<ReviewCommentPayload>)>,
    timeline: &[Value],
) -> PullRequestReport {
    PullRequestReport {
        number: raw.number,
        title: raw.title,
        state: raw.state,
        draft: raw.draft,
        merged_at: raw.merged_at,
        author: normalize_user(raw.user.as_ref()),
        body: non_blank(raw.body),
        created_at: raw.created_at.unwrap_or_default(),
        updated_at: raw.updated_at.unwrap_or_default(),
        closed_at: raw.closed_at,
        labels: normalize_labels(&raw.labels),
        assignees: raw
            .assignees
            .iter()
            .map(|a| normalize_user(Some(a)))
            .collect(),
        milestone: milestone_title(raw.milestone),
        head_ref: raw.head.git_ref,
        base_ref: raw.base.git_ref,
        additions: raw.additions,
        deletions: raw.deletions,
        changed_files: raw.changed_files,
        commits: raw.commits,
        url: raw.html_url,
        reviews: reviews
            .into_iter()
            .map(|(review, comments)| normalize_review(review, comments))
            .collect(),
        timeline: normalize_timeline_events(timeline),
        diff,
    }
}

pub fn normalize_commit(raw: CommitPayload, diff: String) -> CommitReport {
    let git_author = raw.commit.author;
    let (additions, deletions) = raw
        .stats
        .map(|s| (s.additions, s.deletions))
        .unwrap_or_else(|| {
            raw.files
                .iter()
                .fold((0, 0), |(a, d), f| (a + f.additions, d + f.deletions))
        });
    CommitReport {
        sha: raw.sha,
        message: raw.commit.message,
        author_name: git_author.as_ref().and_then(|a| a.name.clone()),
        author_email: git_author.as_ref().and_then(|a| a.email.clone()),
        author: raw
            .author
            .as_ref()
            .filter(|a| a.is_object())
            .map(|a| normalize_user(Some(a))),
        date: git_author.and_then(|a| a.date).unwrap_or_default(),
        url: raw.html_url,
        additions,
        deletions,
        files: raw.files.into_iter().map(normalize_commit_file).collect(),
        diff,
    }
}

pub fn normalize_repo(raw: RepoPayload) -> RepoInfo {
    RepoInfo {
        full_name: raw.full_name,
        description: non_blank(raw.description),
        url: raw.html_url,
        stars: raw.stargazers_count,
        forks: raw.forks_count,
        open_issues: raw.open_issues_count,
        watchers: raw.watchers_count,
        language: non_blank(raw.language),
        license: raw
            .license
            .and_then(|l| non_blank(l.spdx_id.filter(|id| id != "NOASSERTION")).or(non_blank(l.name))),
        topics: raw.topics,
        default_branch: non_blank(raw.default_branch),
        homepage: non_blank(raw.homepage),
        created_at: raw.created_at,
        updated_at: raw.updated_at,
        pushed_at: raw.pushed_at,
        archived: raw.archived,
        fork: raw.fork,
        private: raw.private,
    }
}

pub fn normalize_repo_search(query: &str, raw: RepoSearchPayload) -> RepoSearchResults {
    RepoSearchResults {
        query: query.to_string(),
        total_count: raw.total_count,
        items: raw.items.into_iter().map(normalize_repo).collect(),
    }
}

pub fn normalize_code_search(query: &str, repository: &str, raw: CodeSearchPayload) -> CodeSearchResults {
    CodeSearchResults {
        query: query.to_string(),
        repository: repository.to_string(),
        total_count: raw.total_count,
        items: raw
            .items
            .into_iter()
            .map(|item| CodeMatch {
                name: item.name,
                path: item.path,
                url: item.html_url,
            })
            .collect(),
    }
}

/// Entries keep API order; the renderer decides display order.
pub fn normalize_directory(repository: &str, path: &str, raw: Vec<ContentPayload>) -> DirectoryListing {
    DirectoryListing {
        repository: repository.to_string(),
        path: path.to_string(),
        entries: raw
            .into_iter()
            .map(|e| DirEntry {
                kind: EntryKind::parse(&e.kind),
                name: e.name,
                path: e.path,
                size: e.size,
            })
            .collect(),
    }
}
