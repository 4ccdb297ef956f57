use assert_cmd::Command;
use httpmock::{Method::GET, MockServer};
use std::io::Write;

fn run_with_env(req: &serde_json::Value, envs: &[(&str, &str)]) -> anyhow::Result<serde_json::Value> {
    let mut cmd = Command::cargo_bin("github-explorer-mcp")?;
    for (k, v) in envs {
        cmd.env(k, v);
    }
    let input = serde_json::to_string(req)?;
    let assert = cmd
        .arg("--log-level")
        .arg("warn")
        .write_stdin({
            let mut b = Vec::new();
            writeln!(b, "{}", input).unwrap();
            b
        })
        .assert();
    let output = String::from_utf8(assert.get_output().stdout.clone())?;
    Ok(serde_json::from_str(output.trim())?)
}

fn call(name: &str, arguments: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc":"2.0","method":"tools/call","id":1,
        "params":{"name": name, "arguments": arguments}
    })
}

#[test]
fn find_repo_lists_matches() -> anyhow::Result<()> {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET)
            .path("/search/repositories")
            .query_param("q", "mcp server language:rust")
            .query_param("per_page", "2");
        then.status(200)
            .header("x-ratelimit-remaining", "29")
            .json_body(serde_json::json!({
                "total_count": 57,
                "items": [
                    {"full_name": "acme/mcp-rs", "description": "MCP in Rust",
                     "html_url": "https://github.com/acme/mcp-rs", "stargazers_count": 420,
                     "language": "Rust", "updated_at": "2024-05-01T12:00:00Z"},
                    {"full_name": "zed/tiny-mcp", "description": null,
                     "html_url": "https://github.com/zed/tiny-mcp", "stargazers_count": 3}
                ]
            }));
    });
    let out = run_with_env(
        &call("find_repo", serde_json::json!({"query": "mcp server language:rust", "limit": 2})),
        &[("GITHUB_TOKEN", "t"), ("GITHUB_API_URL", server.base_url().as_str())],
    )?;
    m.assert();
    let text = out["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with(
        "Found 57 repositories matching \"mcp server language:rust\" (showing 2):"
    ));
    assert!(text.contains("1. acme/mcp-rs ⭐ 420\n   MCP in Rust\n   Language: Rust · Updated: May 1, 2024, 12:00 PM"));
    assert!(text.contains("2. zed/tiny-mcp ⭐ 3\n   (No description)"));
    assert_eq!(out["result"]["structuredContent"]["total_count"], 57);
    Ok(())
}

#[test]
fn find_repo_uses_default_limit_and_reports_empty() -> anyhow::Result<()> {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET)
            .path("/search/repositories")
            .query_param("per_page", "10");
        then.status(200)
            .json_body(serde_json::json!({"total_count": 0, "items": []}));
    });
    let out = run_with_env(
        &call("find_repo", serde_json::json!({"query": "zzzz-nothing"})),
        &[("GITHUB_TOKEN", "t"), ("GITHUB_API_URL", server.base_url().as_str())],
    )?;
    m.assert();
    assert_eq!(
        out["result"]["content"][0]["text"],
        "No repositories found matching \"zzzz-nothing\"."
    );
    Ok(())
}

#[test]
fn search_code_scopes_query_to_repository() -> anyhow::Result<()> {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET)
            .path("/search/code")
            .query_param("q", "streamText repo:vercel/ai");
        then.status(200).json_body(serde_json::json!({
            "total_count": 2,
            "items": [
                {"name": "stream-text.ts", "path": "packages/ai/core/stream-text.ts",
                 "html_url": "https://github.com/vercel/ai/blob/main/packages/ai/core/stream-text.ts"},
                {"name": "index.ts", "path": "packages/ai/core/index.ts", "html_url": ""}
            ]
        }));
    });
    let out = run_with_env(
        &call("search_code", serde_json::json!({"repo": "vercel/ai", "query": "streamText"})),
        &[("GITHUB_TOKEN", "t"), ("GITHUB_API_URL", server.base_url().as_str())],
    )?;
    m.assert();
    let text = out["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("Found 2 code results for \"streamText\" in vercel/ai (showing 2):"));
    assert!(text.contains("1. packages/ai/core/stream-text.ts\n   https://github.com/vercel/ai/blob/main/packages/ai/core/stream-text.ts"));
    assert!(text.ends_with("2. packages/ai/core/index.ts"));
    assert_eq!(out["result"]["structuredContent"]["repository"], "vercel/ai");
    Ok(())
}

#[test]
fn search_code_rejects_bad_repository() -> anyhow::Result<()> {
    let out = run_with_env(
        &call("search_code", serde_json::json!({"repo": "vercel", "query": "x"})),
        &[("GITHUB_API_URL", "http://127.0.0.1:9"), ("GITHUB_HTTP_MAX_RETRIES", "0")],
    )?;
    assert_eq!(out["result"]["isError"], true);
    assert!(out["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("\"vercel\""));
    Ok(())
}

#[test]
fn server_errors_are_retried() -> anyhow::Result<()> {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET).path("/repos/o/r");
        then.status(503).body("unavailable");
    });
    let out = run_with_env(
        &call("get_repo_info", serde_json::json!({"repo": "o/r"})),
        &[
            ("GITHUB_TOKEN", "t"),
            ("GITHUB_API_URL", server.base_url().as_str()),
            ("GITHUB_HTTP_MAX_RETRIES", "2"),
        ],
    )?;
    m.assert_hits(3);
    let result = &out["result"];
    assert_eq!(result["isError"], true);
    assert_eq!(result["structuredContent"]["error"]["code"], "upstream_error");
    assert_eq!(result["structuredContent"]["error"]["retriable"], true);
    Ok(())
}
