use base64::Engine;
use futures::future::try_join_all;
use log::{debug, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::form_urlencoded;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::{self, encode_path_segment, encode_repo_path, has_next_page_from_link};
use crate::model::FileContent;
use crate::payloads::{
    CodeSearchPayload, CommitPayload, ContentPayload, IssuePayload, PullRequestPayload,
    RepoPayload, RepoSearchPayload, ReviewCommentPayload, ReviewPayload,
};
use crate::types::RepoRef;

const PAGE_SIZE: u32 = 100;

pub struct RawIssue {
    pub issue: IssuePayload,
    pub timeline: Vec<Value>,
}

pub struct RawPullRequest {
    pub pull: PullRequestPayload,
    pub diff: String,
    pub reviews: Vec<(ReviewPayload, Vec<ReviewCommentPayload>)>,
    pub timeline: Vec<Value>,
}

pub struct RawCommit {
    pub commit: CommitPayload,
    pub diff: String,
}

/// Typed read-only operations over the GitHub REST API.
///
/// Multi-request operations fan out concurrently and fail as a whole when any
/// request fails. Retries and timeouts live in [`crate::http`].
pub struct Gateway {
    client: Client,
    cfg: Config,
}

impl Gateway {
    pub fn new(cfg: Config) -> Result<Self> {
        let client = http::build_client(&cfg)?;
        Ok(Self { client, cfg })
    }

    fn repo_path(repo: &RepoRef, rest: &str) -> String {
        format!(
            "/repos/{}/{}{}",
            encode_path_segment(&repo.owner),
            encode_path_segment(&repo.repo),
            rest
        )
    }

    async fn get_value(&self, path: &str) -> Result<Value> {
        Ok(http::rest_get_json::<Value>(&self.client, &self.cfg, path)
            .await
            .into_result()?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let value = self.get_value(path).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn get_text(&self, path: &str, accept: &str) -> Result<String> {
        Ok(
            http::rest_get_text_with_accept(&self.client, &self.cfg, path, accept)
                .await
                .into_result()?,
        )
    }

    /// Follow `rel="next"` links page by page, concatenating in order, up to the page cap.
    async fn get_paged<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let sep = if path.contains('?') { '&' } else { '?' };
        let mut items = Vec::new();
        for page in 1..=self.cfg.max_pages {
            let paged = format!("{}{}per_page={}&page={}", path, sep, PAGE_SIZE, page);
            let resp = http::rest_get_json::<Value>(&self.client, &self.cfg, &paged).await;
            let has_next = resp
                .headers
                .as_ref()
                .map(has_next_page_from_link)
                .unwrap_or(false);
            let batch: Vec<Value> = serde_json::from_value(resp.into_result()?)?;
            items.extend(batch);
            if !has_next {
                break;
            }
            if page == self.cfg.max_pages {
                warn!(
                    "{}: more pages remain after {} pages; result is truncated (GITHUB_MCP_MAX_PAGES)",
                    path, page
                );
            }
        }
        Ok(serde_json::from_value(Value::Array(items))?)
    }

    pub async fn search_repositories(&self, query: &str, per_page: u32) -> Result<RepoSearchPayload> {
        debug!("search repositories q={:?}", query);
        let qs = form_urlencoded::Serializer::new(String::new())
            .append_pair("q", query)
            .append_pair("per_page", &per_page.to_string())
            .finish();
        self.get_json(&format!("/search/repositories?{}", qs)).await
    }

    pub async fn search_code(
        &self,
        repo: &RepoRef,
        query: &str,
        per_page: u32,
    ) -> Result<CodeSearchPayload> {
        debug!("search code in {} q={:?}", repo, query);
        let qs = form_urlencoded::Serializer::new(String::new())
            .append_pair("q", &format!("{} repo:{}", query, repo))
            .append_pair("per_page", &per_page.to_string())
            .finish();
        self.get_json(&format!("/search/code?{}", qs)).await
    }

    fn contents_path(repo: &RepoRef, path: &str, git_ref: Option<&str>) -> String {
        let encoded = encode_repo_path(path);
        let mut rest = String::from("/contents");
        if !encoded.is_empty() {
            rest.push('/');
            rest.push_str(&encoded);
        }
        if let Some(r) = git_ref.filter(|r| !r.is_empty()) {
            rest.push('?');
            rest.push_str(
                &form_urlencoded::Serializer::new(String::new())
                    .append_pair("ref", r)
                    .finish(),
            );
        }
        Self::repo_path(repo, &rest)
    }

    pub async fn get_file(
        &self,
        repo: &RepoRef,
        path: &str,
        git_ref: Option<&str>,
    ) -> Result<FileContent> {
        debug!("get file {}:{} ref={:?}", repo, path, git_ref);
        let value = self
            .get_value(&Self::contents_path(repo, path, git_ref))
            .await?;
        if value.is_array() {
            return Err(Error::NotAFile {
                path: path.to_string(),
                kind: "directory".into(),
            });
        }
        let payload: ContentPayload = serde_json::from_value(value)?;
        if payload.kind != "file" {
            return Err(Error::NotAFile {
                path: path.to_string(),
                kind: describe_kind(&payload.kind),
            });
        }
        let inline = payload.content.as_deref().unwrap_or_default();
        let encoding = payload.encoding.as_deref();
        // Files over 1 MB come back with `encoding: none` and no inline content.
        let content = if encoding == Some("none") || (inline.is_empty() && payload.size > 0) {
            debug!(
                "{}:{} is {} bytes without inline content; fetching raw",
                repo, path, payload.size
            );
            self.get_text(&Self::contents_path(repo, path, git_ref), http::ACCEPT_RAW)
                .await?
        } else {
            decode_content(inline, encoding)?
        };
        Ok(FileContent {
            repository: repo.to_string(),
            path: payload.path,
            name: payload.name,
            size: payload.size,
            sha: payload.sha,
            git_ref: git_ref.filter(|r| !r.is_empty()).map(str::to_string),
            url: payload.html_url,
            content,
        })
    }

    pub async fn list_directory(&self, repo: &RepoRef, path: &str) -> Result<Vec<ContentPayload>> {
        debug!("list directory {}:{}", repo, path);
        let value = self
            .get_value(&Self::contents_path(repo, path, None))
            .await?;
        if !value.is_array() {
            return Err(Error::NotADirectory {
                path: path.to_string(),
            });
        }
        Ok(serde_json::from_value(value)?)
    }

    pub async fn get_repo(&self, repo: &RepoRef) -> Result<RepoPayload> {
        debug!("get repo {}", repo);
        self.get_json(&Self::repo_path(repo, "")).await
    }

    pub async fn get_issue(&self, repo: &RepoRef, number: u64) -> Result<RawIssue> {
        debug!("get issue {}#{}", repo, number);
        let issue_path = Self::repo_path(repo, &format!("/issues/{}", number));
        let timeline_path = format!("{}/timeline", issue_path);
        let (issue, timeline) = futures::try_join!(
            self.get_json::<IssuePayload>(&issue_path),
            self.get_paged::<Value>(&timeline_path),
        )?;
        Ok(RawIssue { issue, timeline })
    }

    async fn review_comments(
        &self,
        repo: &RepoRef,
        number: u64,
        review_id: u64,
    ) -> Result<Vec<ReviewCommentPayload>> {
        let path = Self::repo_path(
            repo,
            &format!("/pulls/{}/reviews/{}/comments", number, review_id),
        );
        self.get_paged(&path).await
    }

    pub async fn get_pull_request(&self, repo: &RepoRef, number: u64) -> Result<RawPullRequest> {
        debug!("get pull request {}#{}", repo, number);
        let pr_path = Self::repo_path(repo, &format!("/pulls/{}", number));
        let reviews_path = format!("{}/reviews", pr_path);
        let timeline_path = Self::repo_path(repo, &format!("/issues/{}/timeline", number));

        let (pull, diff, reviews, timeline) = futures::try_join!(
            self.get_json::<PullRequestPayload>(&pr_path),
            self.get_text(&pr_path, http::ACCEPT_DIFF),
            self.get_paged::<ReviewPayload>(&reviews_path),
            self.get_paged::<Value>(&timeline_path),
        )?;

        // Comment lists need the review ids, so they form a second fan-out.
        let comments = try_join_all(
            reviews
                .iter()
                .map(|r| self.review_comments(repo, number, r.id)),
        )
        .await?;
        let reviews = reviews.into_iter().zip(comments).collect();

        Ok(RawPullRequest {
            pull,
            diff,
            reviews,
            timeline,
        })
    }

    pub async fn get_commit(&self, repo: &RepoRef, sha: &str) -> Result<RawCommit> {
        debug!("get commit {}@{}", repo, sha);
        let path = Self::repo_path(repo, &format!("/commits/{}", encode_path_segment(sha)));
        let (commit, diff) = futures::try_join!(
            self.get_json::<CommitPayload>(&path),
            self.get_text(&path, http::ACCEPT_DIFF),
        )?;
        Ok(RawCommit { commit, diff })
    }
}

/// Human wording for a contents-API `type` other than `file`.
fn describe_kind(kind: &str) -> String {
    match kind {
        "dir" => "directory".to_string(),
        "" => "non-file entry".to_string(),
        other => other.to_string(),
    }
}

/// Decode a contents-API body. Base64 payloads carry embedded newlines.
pub fn decode_content(raw: &str, encoding: Option<&str>) -> Result<String> {
    match encoding {
        Some("base64") => {
            let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(compact.as_bytes())
                .map_err(|e| Error::Upstream {
                    code: "server_error".into(),
                    message: format!("file content is not valid base64: {}", e),
                    retriable: false,
                })?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => Ok(raw.to_string()),
    }
}
