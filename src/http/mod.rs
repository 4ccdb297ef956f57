use crate::config::Config;
use crate::types::RateMeta;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ACCEPT_JSON: &str = "application/vnd.github+json";
pub const ACCEPT_DIFF: &str = "application/vnd.github.v3.diff";
pub const ACCEPT_RAW: &str = "application/vnd.github.raw";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
    pub retriable: bool,
}

#[derive(Debug, Clone)]
pub struct RestResponse<T> {
    pub value: Option<T>,
    pub error: Option<ErrorInfo>,
    pub status: StatusCode,
    pub headers: Option<HeaderMap>,
}

impl<T> RestResponse<T> {
    fn failed(status: StatusCode, headers: Option<HeaderMap>, err: ErrorInfo) -> Self {
        Self {
            value: None,
            error: Some(err),
            status,
            headers,
        }
    }

    pub fn into_result(self) -> Result<T, ErrorInfo> {
        if let Some(err) = self.error {
            return Err(err);
        }
        self.value.ok_or_else(|| ErrorInfo {
            code: "server_error".into(),
            message: format!("empty response (status {})", self.status),
            retriable: false,
        })
    }
}

pub fn build_client(cfg: &Config) -> Result<Client, ErrorInfo> {
    let mut default_headers = HeaderMap::new();
    let ua = HeaderValue::from_str(&cfg.user_agent).map_err(|e| ErrorInfo {
        code: "server_error".into(),
        message: format!("invalid user agent: {}", e),
        retriable: false,
    })?;
    default_headers.insert(USER_AGENT, ua);
    // Authorization header is injected per request so anonymous access stays possible.
    Client::builder()
        .default_headers(default_headers)
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .use_rustls_tls()
        .build()
        .map_err(|e| ErrorInfo {
            code: "server_error".into(),
            message: e.to_string(),
            retriable: false,
        })
}

fn auth_header(token: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!("Bearer {}", token)).ok()
}

pub fn map_status_to_error(status: StatusCode, message: String) -> ErrorInfo {
    let (code, retriable) = match status {
        StatusCode::BAD_REQUEST => ("bad_request", false),
        StatusCode::UNAUTHORIZED => ("unauthorized", false),
        StatusCode::FORBIDDEN => ("forbidden", false),
        StatusCode::NOT_FOUND => ("not_found", false),
        StatusCode::CONFLICT => ("conflict", false),
        StatusCode::UNPROCESSABLE_ENTITY => ("bad_request", false),
        StatusCode::TOO_MANY_REQUESTS => ("rate_limited", true),
        s if s.is_server_error() => ("upstream_error", true),
        _ => ("server_error", false),
    };
    ErrorInfo {
        code: code.to_string(),
        message,
        retriable,
    }
}

pub fn extract_rate_from_rest(headers: &HeaderMap) -> RateMeta {
    let header_num = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<i64>().ok())
    };
    let reset_at = header_num("x-ratelimit-reset")
        .and_then(|epoch| chrono::DateTime::<chrono::Utc>::from_timestamp(epoch, 0))
        .map(|dt| dt.to_rfc3339());
    RateMeta {
        remaining: header_num("x-ratelimit-remaining").map(|v| v as i32),
        used: header_num("x-ratelimit-used").map(|v| v as i32),
        reset_at,
    }
}

fn compute_backoff(attempt: u32, retry_after: Option<Duration>) -> Duration {
    if let Some(d) = retry_after {
        return d;
    }
    // Exponential backoff with jitter: base 200ms * 2^attempt, max 5s.
    let base = 200u64.saturating_mul(1u64 << attempt.min(5));
    let max = 5_000u64.min(base);
    let jitter = fastrand::u64(0..=max / 2);
    Duration::from_millis(max / 2 + jitter)
}

/// GET `path` (relative to the configured API root) and return the body as text.
/// Retries network errors, 429 and 5xx up to `cfg.max_retries` times.
pub async fn rest_get_text_with_accept(
    client: &Client,
    cfg: &Config,
    path: &str,
    accept: &str,
) -> RestResponse<String> {
    let url = format!("{}{}", cfg.api_url, path);
    let accept_value = match HeaderValue::from_str(accept) {
        Ok(v) => v,
        Err(e) => {
            return RestResponse::failed(
                StatusCode::BAD_REQUEST,
                None,
                ErrorInfo {
                    code: "bad_request".into(),
                    message: format!("invalid accept header {:?}: {}", accept, e),
                    retriable: false,
                },
            )
        }
    };
    let mut attempt: u32 = 0;
    loop {
        let mut req = client
            .get(&url)
            .header("X-GitHub-Api-Version", &cfg.api_version)
            .header(ACCEPT, accept_value.clone());
        if let Some(auth) = cfg.token.as_deref().and_then(auth_header) {
            req = req.header(AUTHORIZATION, auth);
        }

        let res = match req.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("REST GET {} error sending request: {}", url, e);
                if attempt < cfg.max_retries {
                    tokio::time::sleep(compute_backoff(attempt, None)).await;
                    attempt += 1;
                    continue;
                }
                return RestResponse::failed(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    None,
                    ErrorInfo {
                        code: "upstream_error".into(),
                        message: e.to_string(),
                        retriable: true,
                    },
                );
            }
        };

        let status = res.status();
        let headers = res.headers().clone();
        let rate = extract_rate_from_rest(&headers);
        debug!(
            "REST GET {} -> {} (rate remaining {:?})",
            url, status, rate.remaining
        );
        let retry_after = headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);

        // Retry on 429/5xx
        if (status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error())
            && attempt < cfg.max_retries
        {
            let backoff = compute_backoff(attempt, retry_after);
            warn!(
                "REST GET {} retrying (status {}), backoff {:?}",
                url, status, backoff
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
            continue;
        }

        let text = match res.text().await {
            Ok(t) => t,
            Err(e) => {
                return RestResponse::failed(
                    status,
                    Some(headers),
                    ErrorInfo {
                        code: "upstream_error".into(),
                        message: e.to_string(),
                        retriable: true,
                    },
                )
            }
        };
        if status.is_success() {
            return RestResponse {
                value: Some(text),
                error: None,
                status,
                headers: Some(headers),
            };
        }
        warn!("REST GET {} failed with status {}", url, status);
        let err = map_status_to_error(status, text);
        return RestResponse::failed(status, Some(headers), err);
    }
}

pub async fn rest_get_json<T: for<'de> Deserialize<'de>>(
    client: &Client,
    cfg: &Config,
    path: &str,
) -> RestResponse<T> {
    let resp = rest_get_text_with_accept(client, cfg, path, ACCEPT_JSON).await;
    let RestResponse {
        value,
        error,
        status,
        headers,
    } = resp;
    if let Some(err) = error {
        return RestResponse::failed(status, headers, err);
    }
    let parsed = serde_json::from_str::<T>(value.as_deref().unwrap_or_default());
    match parsed {
        Ok(val) => RestResponse {
            value: Some(val),
            error: None,
            status,
            headers,
        },
        Err(e) => RestResponse::failed(
            status,
            headers,
            ErrorInfo {
                code: "server_error".into(),
                message: e.to_string(),
                retriable: false,
            },
        ),
    }
}

pub fn has_next_page_from_link(headers: &HeaderMap) -> bool {
    if let Some(link) = headers.get("link").and_then(|v| v.to_str().ok()) {
        // Simple check for rel="next"
        return link.contains("rel=\"next\"");
    }
    false
}

/// Percent-encode a single URL path segment (everything but RFC 3986 unreserved characters).
pub fn encode_path_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Encode a repository-relative path segment by segment, dropping empty segments.
pub fn encode_repo_path(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(encode_path_segment)
        .collect::<Vec<_>>()
        .join("/")
}
