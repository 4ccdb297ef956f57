//! Normalized reports to markdown-like text.
//!
//! Every function is pure and deterministic: same report in, same bytes out.
//! Metadata lines with nothing to show are left out entirely.

use chrono::{DateTime, NaiveDate, Utc};

use crate::model::{
    CodeSearchResults, CommitReport, DirEntry, DirectoryListing, EntryKind, EventDetail,
    FileContent, FileStatus, IssueReport, Label, PullRequestReport, RepoInfo, RepoSearchResults,
    Review, ReviewState, TimelineEvent, User,
};

const DATE_FORMAT: &str = "%B %-d, %Y, %-I:%M %p";
const NO_DESCRIPTION: &str = "(No description)";

/// `2024-01-15T14:30:00Z` -> `January 15, 2024, 2:30 PM` (UTC). Unparseable input yields "".
pub fn format_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc).format(DATE_FORMAT).to_string();
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrStatus {
    Draft,
    Open,
    Merged,
    Closed,
}

impl PrStatus {
    pub fn label(self) -> &'static str {
        match self {
            PrStatus::Draft => "Draft",
            PrStatus::Open => "Open",
            PrStatus::Merged => "Merged",
            PrStatus::Closed => "Closed",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            PrStatus::Draft => "📝",
            PrStatus::Open => "🟢",
            PrStatus::Merged => "🟣",
            PrStatus::Closed => "🔴",
        }
    }
}

pub fn pr_status(state: &str, draft: bool, merged_at: Option<&str>) -> PrStatus {
    if merged_at.is_some_and(|m| !m.trim().is_empty()) {
        PrStatus::Merged
    } else if state.eq_ignore_ascii_case("closed") {
        PrStatus::Closed
    } else if draft {
        PrStatus::Draft
    } else {
        PrStatus::Open
    }
}

pub fn review_state_symbol(state: &ReviewState) -> &'static str {
    match state {
        ReviewState::Approved => "✅",
        ReviewState::ChangesRequested => "❌",
        ReviewState::Commented => "💬",
        ReviewState::Dismissed => "🚫",
        ReviewState::Pending => "⏳",
        ReviewState::Other(_) => "❔",
    }
}

pub fn file_status_symbol(status: FileStatus) -> &'static str {
    match status {
        FileStatus::Added => "➕",
        FileStatus::Removed => "➖",
        FileStatus::Modified => "📝",
    }
}

fn mention(user: &User) -> String {
    format!("@{}", user.login)
}

fn who(actor: Option<&User>) -> String {
    actor.map(mention).unwrap_or_else(|| "someone".to_string())
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

/// A code fence longer than any backtick run inside `content`.
fn fence_for(content: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in content.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat(longest.max(2) + 1)
}

fn push_fenced(lines: &mut Vec<String>, info: &str, content: &str) {
    let fence = fence_for(content);
    lines.push(format!("{}{}", fence, info));
    // The join supplies the newline before the closing fence, so only one trailing `\n` is dropped.
    lines.push(content.strip_suffix('\n').unwrap_or(content).to_string());
    lines.push(fence);
}

fn push_field(lines: &mut Vec<String>, name: &str, value: &str) {
    if !value.trim().is_empty() {
        lines.push(format!("- {}: {}", name, value));
    }
}

fn push_date(lines: &mut Vec<String>, name: &str, raw: Option<&str>) {
    if let Some(raw) = raw {
        push_field(lines, name, &format_date(raw));
    }
}

fn join_labels(labels: &[Label]) -> String {
    labels
        .iter()
        .map(|l| l.name.as_str())
        .filter(|n| !n.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_users(users: &[User]) -> String {
    users.iter().map(mention).collect::<Vec<_>>().join(", ")
}

fn author_line(user: &User) -> String {
    if user.profile_url.is_empty() {
        mention(user)
    } else {
        format!("{} ({})", mention(user), user.profile_url)
    }
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|l| format!("{}{}", prefix, l).trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn event_action(event: &TimelineEvent) -> String {
    let kind = event.kind.as_str();
    match &event.detail {
        EventDetail::Body { body } => {
            let verb = if kind == "reviewed" { "reviewed" } else { "commented" };
            if body.trim().is_empty() {
                verb.to_string()
            } else {
                format!("{}:\n{}", verb, indent(body, "  > "))
            }
        }
        EventDetail::Label { label } => {
            let verb = if kind == "unlabeled" { "removed" } else { "added" };
            match label {
                Some(l) => format!("{} label \"{}\"", verb, l.name),
                None => format!("{} a label", verb),
            }
        }
        EventDetail::Assignee { assignee } => {
            let target = assignee
                .as_ref()
                .map(mention)
                .unwrap_or_else(|| "someone".to_string());
            format!("{} {}", kind, target)
        }
        EventDetail::Milestone { title } => {
            let target = match title.as_deref().filter(|t| !t.is_empty()) {
                Some(t) => format!("milestone \"{}\"", t),
                None => "a milestone".to_string(),
            };
            if kind == "demilestoned" {
                format!("removed this from {}", target)
            } else {
                format!("added this to {}", target)
            }
        }
        EventDetail::Rename { rename } => match rename {
            Some(r) => format!("changed the title from \"{}\" to \"{}\"", r.from, r.to),
            None => "changed the title".to_string(),
        },
        EventDetail::CrossReference { issue } => match issue {
            Some(i) => format!("mentioned this in #{} \"{}\"", i.number, i.title),
            None => "cross-referenced this".to_string(),
        },
        EventDetail::Commit { commit_id, .. } => {
            let sha = commit_id.as_deref().map(short_sha);
            match (kind, sha) {
                ("committed", Some(s)) => format!("added commit {}", s),
                ("committed", None) => "added a commit".to_string(),
                (_, Some(s)) => format!("referenced this in commit {}", s),
                (_, None) => "referenced this in a commit".to_string(),
            }
        }
        EventDetail::None => String::new(),
    }
}

/// One timeline entry, or `None` for events without a timestamp.
pub fn render_timeline_event(event: &TimelineEvent) -> Option<String> {
    if event.created_at.trim().is_empty() {
        return None;
    }
    let when = format_date(&event.created_at);
    let actor = who(event.actor.as_ref());
    Some(match event.detail {
        EventDetail::None => format!("- {}: {} by {}", when, event.kind, actor),
        _ => format!("- {}: {} {}", when, actor, event_action(event)),
    })
}

fn push_timeline(lines: &mut Vec<String>, events: &[TimelineEvent]) {
    let rendered: Vec<String> = events.iter().filter_map(render_timeline_event).collect();
    if rendered.is_empty() {
        return;
    }
    lines.push(String::new());
    lines.push("## Timeline".to_string());
    lines.push(String::new());
    lines.extend(rendered);
}

fn push_description(lines: &mut Vec<String>, body: Option<&str>) {
    if let Some(body) = body.filter(|b| !b.trim().is_empty()) {
        lines.push(String::new());
        lines.push("## Description".to_string());
        lines.push(String::new());
        lines.push(body.trim_end().to_string());
    }
}

pub fn render_issue(report: &IssueReport) -> String {
    let mut lines = vec![
        format!("# Issue #{}: {}", report.number, report.title),
        String::new(),
    ];
    push_field(&mut lines, "State", &report.state);
    push_field(&mut lines, "Author", &author_line(&report.author));
    push_date(&mut lines, "Created", Some(&report.created_at));
    push_date(&mut lines, "Updated", Some(&report.updated_at));
    push_date(&mut lines, "Closed", report.closed_at.as_deref());
    push_field(&mut lines, "Labels", &join_labels(&report.labels));
    push_field(&mut lines, "Assignees", &join_users(&report.assignees));
    push_field(&mut lines, "Milestone", report.milestone.as_deref().unwrap_or(""));
    if report.comments > 0 {
        push_field(&mut lines, "Comments", &report.comments.to_string());
    }
    push_field(&mut lines, "URL", &report.url);

    push_description(&mut lines, report.body.as_deref());
    push_timeline(&mut lines, &report.timeline);
    lines.join("\n")
}

fn render_review(review: &Review) -> Vec<String> {
    let mut lines = Vec::new();
    let mut heading = format!(
        "### {} {} {}",
        review_state_symbol(&review.state),
        mention(&review.author),
        review.state.as_str()
    );
    let when = review.submitted_at.as_deref().map(format_date).unwrap_or_default();
    if !when.is_empty() {
        heading.push_str(&format!(" ({})", when));
    }
    lines.push(heading);
    if let Some(body) = review.body.as_deref().filter(|b| !b.trim().is_empty()) {
        lines.push(String::new());
        lines.push(body.trim_end().to_string());
    }
    if !review.comments.is_empty() {
        lines.push(String::new());
        lines.push("Comments:".to_string());
        for c in &review.comments {
            let location = match c.line_number {
                Some(line) => format!("{}:{}", c.file_path, line),
                None => c.file_path.clone(),
            };
            let body = c.body.trim_end();
            let mut body_lines = body.lines();
            let first = body_lines.next().unwrap_or("");
            lines.push(format!("- `{}` {}: {}", location, mention(&c.author), first).trim_end().to_string());
            for rest in body_lines {
                lines.push(format!("  {}", rest).trim_end().to_string());
            }
        }
    }
    lines
}

pub fn render_pull_request(report: &PullRequestReport) -> String {
    let status = pr_status(&report.state, report.draft, report.merged_at.as_deref());
    let mut lines = vec![
        format!("# {} PR #{}: {}", status.icon(), report.number, report.title),
        String::new(),
    ];
    push_field(&mut lines, "Status", status.label());
    push_field(&mut lines, "Author", &author_line(&report.author));
    if !report.head_ref.is_empty() || !report.base_ref.is_empty() {
        push_field(
            &mut lines,
            "Branch",
            &format!("{} → {}", report.head_ref, report.base_ref),
        );
    }
    push_field(
        &mut lines,
        "Changes",
        &format!(
            "+{} -{} in {} files ({} commits)",
            report.additions, report.deletions, report.changed_files, report.commits
        ),
    );
    push_date(&mut lines, "Created", Some(&report.created_at));
    push_date(&mut lines, "Updated", Some(&report.updated_at));
    if status == PrStatus::Merged {
        push_date(&mut lines, "Merged", report.merged_at.as_deref());
    } else {
        push_date(&mut lines, "Closed", report.closed_at.as_deref());
    }
    push_field(&mut lines, "Labels", &join_labels(&report.labels));
    push_field(&mut lines, "Assignees", &join_users(&report.assignees));
    push_field(&mut lines, "Milestone", report.milestone.as_deref().unwrap_or(""));
    push_field(&mut lines, "URL", &report.url);

    push_description(&mut lines, report.body.as_deref());

    if !report.reviews.is_empty() {
        lines.push(String::new());
        lines.push("## Reviews".to_string());
        for review in &report.reviews {
            lines.push(String::new());
            lines.extend(render_review(review));
        }
    }

    push_timeline(&mut lines, &report.timeline);

    if !report.diff.trim().is_empty() {
        lines.push(String::new());
        lines.push("## Diff".to_string());
        lines.push(String::new());
        push_fenced(&mut lines, "diff", &report.diff);
    }
    lines.join("\n")
}

pub fn render_commit(report: &CommitReport) -> String {
    let mut lines = vec![
        format!("# Commit {}", short_sha(&report.sha)),
        String::new(),
    ];
    push_field(&mut lines, "SHA", &report.sha);
    let mut author = match (&report.author_name, &report.author_email) {
        (Some(name), Some(email)) => format!("{} <{}>", name, email),
        (Some(name), None) => name.clone(),
        (None, Some(email)) => format!("<{}>", email),
        (None, None) => String::new(),
    };
    if let Some(user) = &report.author {
        if author.is_empty() {
            author = mention(user);
        } else {
            author.push_str(&format!(" ({})", mention(user)));
        }
    }
    push_field(&mut lines, "Author", &author);
    push_date(&mut lines, "Date", Some(&report.date));
    push_field(
        &mut lines,
        "Changes",
        &format!(
            "+{} -{} in {} files",
            report.additions,
            report.deletions,
            report.files.len()
        ),
    );
    push_field(&mut lines, "URL", &report.url);

    lines.push(String::new());
    lines.push("## Message".to_string());
    lines.push(String::new());
    let message = report.message.trim_end();
    lines.push(if message.trim().is_empty() {
        NO_DESCRIPTION.to_string()
    } else {
        message.to_string()
    });

    if !report.files.is_empty() {
        lines.push(String::new());
        lines.push(format!("## Files ({})", report.files.len()));
        lines.push(String::new());
        for f in &report.files {
            lines.push(format!(
                "{} {} (+{} -{})",
                file_status_symbol(f.status),
                f.filename,
                f.additions,
                f.deletions
            ));
        }
    }

    if !report.diff.trim().is_empty() {
        lines.push(String::new());
        lines.push("## Diff".to_string());
        lines.push(String::new());
        push_fenced(&mut lines, "diff", &report.diff);
    }
    lines.join("\n")
}

pub fn render_repo_info(repo: &RepoInfo) -> String {
    let mut lines = vec![
        format!("# {}", repo.full_name),
        String::new(),
        repo.description.clone().unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        String::new(),
    ];
    push_field(&mut lines, "Stars", &repo.stars.to_string());
    push_field(&mut lines, "Forks", &repo.forks.to_string());
    push_field(&mut lines, "Open issues", &repo.open_issues.to_string());
    push_field(&mut lines, "Watchers", &repo.watchers.to_string());
    push_field(&mut lines, "Language", repo.language.as_deref().unwrap_or(""));
    push_field(&mut lines, "License", repo.license.as_deref().unwrap_or(""));
    push_field(&mut lines, "Topics", &repo.topics.join(", "));
    push_field(&mut lines, "Default branch", repo.default_branch.as_deref().unwrap_or(""));
    push_field(&mut lines, "Homepage", repo.homepage.as_deref().unwrap_or(""));
    push_date(&mut lines, "Created", repo.created_at.as_deref());
    push_date(&mut lines, "Updated", repo.updated_at.as_deref());
    push_date(&mut lines, "Last push", repo.pushed_at.as_deref());
    let flags: Vec<&str> = [
        (repo.archived, "archived"),
        (repo.fork, "fork"),
        (repo.private, "private"),
    ]
    .iter()
    .filter(|(on, _)| *on)
    .map(|(_, name)| *name)
    .collect();
    push_field(&mut lines, "Flags", &flags.join(", "));
    push_field(&mut lines, "URL", &repo.url);
    lines.join("\n")
}

pub fn render_repo_search(results: &RepoSearchResults) -> String {
    if results.items.is_empty() {
        return format!("No repositories found matching \"{}\".", results.query);
    }
    let mut lines = vec![format!(
        "Found {} repositories matching \"{}\" (showing {}):",
        results.total_count,
        results.query,
        results.items.len()
    )];
    for (i, repo) in results.items.iter().enumerate() {
        lines.push(String::new());
        lines.push(format!("{}. {} ⭐ {}", i + 1, repo.full_name, repo.stars));
        lines.push(format!(
            "   {}",
            repo.description.as_deref().unwrap_or(NO_DESCRIPTION)
        ));
        let mut facts = Vec::new();
        if let Some(lang) = &repo.language {
            facts.push(format!("Language: {}", lang));
        }
        let updated = repo.updated_at.as_deref().map(format_date).unwrap_or_default();
        if !updated.is_empty() {
            facts.push(format!("Updated: {}", updated));
        }
        if !facts.is_empty() {
            lines.push(format!("   {}", facts.join(" · ")));
        }
        if !repo.url.is_empty() {
            lines.push(format!("   {}", repo.url));
        }
    }
    lines.join("\n")
}

pub fn render_code_search(results: &CodeSearchResults) -> String {
    if results.items.is_empty() {
        return format!(
            "No code results found for \"{}\" in {}.",
            results.query, results.repository
        );
    }
    let mut lines = vec![format!(
        "Found {} code results for \"{}\" in {} (showing {}):",
        results.total_count,
        results.query,
        results.repository,
        results.items.len()
    )];
    lines.push(String::new());
    for (i, item) in results.items.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, item.path));
        if !item.url.is_empty() {
            lines.push(format!("   {}", item.url));
        }
    }
    lines.join("\n")
}

pub fn render_file(file: &FileContent) -> String {
    let mut lines = vec![format!("# {}: {}", file.repository, file.path), String::new()];
    push_field(&mut lines, "Size", &format!("{} bytes", file.size));
    push_field(&mut lines, "Ref", file.git_ref.as_deref().unwrap_or(""));
    push_field(&mut lines, "URL", file.url.as_deref().unwrap_or(""));
    lines.push(String::new());
    push_fenced(&mut lines, "", &file.content);
    lines.join("\n")
}

/// Directories first, then everything else; each group in byte order of the name.
pub fn sort_entries(entries: &[DirEntry]) -> Vec<&DirEntry> {
    let mut sorted: Vec<&DirEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| {
        (a.kind != EntryKind::Dir)
            .cmp(&(b.kind != EntryKind::Dir))
            .then_with(|| a.name.cmp(&b.name))
    });
    sorted
}

pub fn render_directory(listing: &DirectoryListing) -> String {
    let shown_path = if listing.path.trim_matches('/').is_empty() {
        "/".to_string()
    } else {
        format!("/{}", listing.path.trim_matches('/'))
    };
    let mut lines = vec![
        format!("# {}{}", listing.repository, shown_path),
        String::new(),
    ];
    if listing.entries.is_empty() {
        lines.push("(empty directory)".to_string());
    }
    for entry in sort_entries(&listing.entries) {
        lines.push(match entry.kind {
            EntryKind::Dir => format!("📁 {}/", entry.name),
            EntryKind::File => format!("📄 {} ({} bytes)", entry.name, entry.size),
            EntryKind::Symlink => format!("🔗 {}", entry.name),
            EntryKind::Submodule => format!("📦 {}", entry.name),
        });
    }
    lines.join("\n")
}
