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

fn repo_info_call(repo: &str) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc":"2.0","method":"tools/call","id":1,
        "params":{"name":"get_repo_info","arguments":{"repo": repo}}
    })
}

#[test]
fn malformed_repositories_are_rejected_without_requests() -> anyhow::Result<()> {
    let server = MockServer::start();
    let any = server.mock(|when, then| {
        when.method(GET);
        then.status(200).json_body(serde_json::json!({}));
    });
    let base = server.base_url();
    let envs = [
        ("GITHUB_TOKEN", "t"),
        ("GITHUB_API_URL", base.as_str()),
        ("GITHUB_HTTP_MAX_RETRIES", "0"),
    ];

    for bad in ["vercel", "a/b/c", "/ai", "vercel/"] {
        let out = run_with_env(&repo_info_call(bad), &envs)?;
        let result = &out["result"];
        assert_eq!(result["isError"], true, "expected error for {:?}", bad);
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains(&format!("\"{}\"", bad)), "message should name {:?}: {}", bad, text);
        assert!(text.contains("owner/repo"));
        assert_eq!(result["structuredContent"]["error"]["code"], "invalid_argument");
    }
    any.assert_hits(0);
    Ok(())
}

#[test]
fn well_formed_repository_reaches_github() -> anyhow::Result<()> {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET).path("/repos/vercel/ai");
        then.status(200).json_body(serde_json::json!({
            "full_name": "vercel/ai",
            "description": "The AI Toolkit for TypeScript",
            "html_url": "https://github.com/vercel/ai",
            "stargazers_count": 12000,
            "forks_count": 1800,
            "open_issues_count": 400,
            "watchers_count": 12000,
            "language": "TypeScript",
            "license": {"name": "Other", "spdx_id": "NOASSERTION"},
            "topics": ["ai", "llm"],
            "default_branch": "main"
        }));
    });
    let out = run_with_env(
        &repo_info_call("vercel/ai"),
        &[
            ("GITHUB_TOKEN", "t"),
            ("GITHUB_API_URL", server.base_url().as_str()),
        ],
    )?;
    m.assert();
    let result = &out["result"];
    assert!(result.get("isError").is_none());
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("# vercel/ai"));
    assert!(text.contains("- Stars: 12000"));
    assert!(text.contains("- Topics: ai, llm"));
    assert_eq!(result["structuredContent"]["full_name"], "vercel/ai");
    Ok(())
}
