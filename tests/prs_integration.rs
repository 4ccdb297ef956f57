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

const DIFF: &str = "diff --git a/src/lib.rs b/src/lib.rs\n--- a/src/lib.rs\n+++ b/src/lib.rs\n@@ -1 +1 @@\n-old\n+new\n";

fn pr_call() -> serde_json::Value {
    serde_json::json!({
        "jsonrpc":"2.0","method":"tools/call","id":1,
        "params":{"name":"get_pull_request","arguments": {"repo":"o/r","number":7}}
    })
}

fn mock_pull(server: &MockServer, pull: serde_json::Value) {
    server.mock(|when, then| {
        when.method(GET)
            .path("/repos/o/r/pulls/7")
            .header("accept", "application/vnd.github+json");
        then.status(200).json_body(pull);
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/repos/o/r/pulls/7")
            .header("accept", "application/vnd.github.v3.diff");
        then.status(200).body(DIFF);
    });
}

#[test]
fn get_pull_request_with_reviews_comments_and_diff() -> anyhow::Result<()> {
    let server = MockServer::start();
    mock_pull(
        &server,
        serde_json::json!({
            "number": 7,
            "title": "Swap old for new",
            "state": "closed",
            "draft": false,
            "merged_at": "2024-02-03T18:45:00Z",
            "closed_at": "2024-02-03T18:45:00Z",
            "body": "Replaces the old value.",
            "user": {"login": "dana", "html_url": "https://github.com/dana"},
            "head": {"ref": "feature/new"},
            "base": {"ref": "main"},
            "additions": 1, "deletions": 1, "changed_files": 1, "commits": 2,
            "html_url": "https://github.com/o/r/pull/7",
            "created_at": "2024-02-01T08:00:00Z",
            "updated_at": "2024-02-03T18:45:00Z"
        }),
    );
    server.mock(|when, then| {
        when.method(GET).path("/repos/o/r/pulls/7/reviews");
        then.status(200).json_body(serde_json::json!([
            {"id": 11, "user": {"login": "erin"}, "state": "CHANGES_REQUESTED",
             "body": "One nit", "submitted_at": "2024-02-02T09:00:00Z"},
            {"id": 12, "user": {"login": "erin"}, "state": "APPROVED",
             "body": "", "submitted_at": "2024-02-03T10:00:00Z"}
        ]));
    });
    let c11 = server.mock(|when, then| {
        when.method(GET).path("/repos/o/r/pulls/7/reviews/11/comments");
        then.status(200).json_body(serde_json::json!([
            {"id": 101, "path": "src/lib.rs", "line": 1, "body": "Rename this?",
             "user": {"login": "erin"}, "created_at": "2024-02-02T09:00:00Z",
             "diff_hunk": "@@ -1 +1 @@"}
        ]));
    });
    let c12 = server.mock(|when, then| {
        when.method(GET).path("/repos/o/r/pulls/7/reviews/12/comments");
        then.status(200).json_body(serde_json::json!([]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/repos/o/r/issues/7/timeline");
        then.status(200).json_body(serde_json::json!([
            {"event": "committed", "sha": "abcdef1234567", "commit_id": "abcdef1234567",
             "created_at": "2024-02-01T08:00:00Z"},
            {"event": "merged", "created_at": "2024-02-03T18:45:00Z", "actor": {"login": "dana"}}
        ]));
    });

    let out = run_with_env(
        &pr_call(),
        &[("GITHUB_TOKEN", "t"), ("GITHUB_API_URL", server.base_url().as_str())],
    )?;
    c11.assert();
    c12.assert();
    let result = &out["result"];
    assert!(result.get("isError").is_none(), "unexpected error: {}", out);
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("# 🟣 PR #7: Swap old for new"));
    assert!(text.contains("- Status: Merged"));
    assert!(text.contains("- Branch: feature/new → main"));
    assert!(text.contains("- Changes: +1 -1 in 1 files (2 commits)"));
    assert!(text.contains("- Merged: February 3, 2024, 6:45 PM"));
    assert!(text.contains("## Description\n\nReplaces the old value."));
    assert!(text.contains("### ❌ @erin CHANGES_REQUESTED (February 2, 2024, 9:00 AM)"));
    assert!(text.contains("- `src/lib.rs:1` @erin: Rename this?"));
    assert!(text.contains("### ✅ @erin APPROVED (February 3, 2024, 10:00 AM)"));
    assert!(text.contains("- February 3, 2024, 6:45 PM: merged by @dana"));
    assert!(text.contains("```diff\ndiff --git a/src/lib.rs b/src/lib.rs"));

    // Sections come in a fixed order.
    let reviews = text.find("## Reviews").unwrap();
    let timeline = text.find("## Timeline").unwrap();
    let diff = text.find("## Diff").unwrap();
    assert!(reviews < timeline && timeline < diff);

    let structured = &result["structuredContent"];
    assert_eq!(structured["reviews"][0]["state"], "CHANGES_REQUESTED");
    assert_eq!(structured["reviews"][0]["comments"][0]["file_path"], "src/lib.rs");
    assert_eq!(structured["reviews"][0]["comments"][0]["line_number"], 1);
    assert!(structured["reviews"][1]["comments"].as_array().unwrap().is_empty());
    assert_eq!(structured["diff"], DIFF);
    Ok(())
}

#[test]
fn draft_pull_request_without_reviews() -> anyhow::Result<()> {
    let server = MockServer::start();
    mock_pull(
        &server,
        serde_json::json!({
            "number": 7, "title": "WIP", "state": "open", "draft": true,
            "body": null, "user": {"login": "dana"},
            "head": {"ref": "wip"}, "base": {"ref": "main"},
            "created_at": "2024-02-01T08:00:00Z", "updated_at": "2024-02-01T08:00:00Z"
        }),
    );
    server.mock(|when, then| {
        when.method(GET).path("/repos/o/r/pulls/7/reviews");
        then.status(200).json_body(serde_json::json!([]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/repos/o/r/issues/7/timeline");
        then.status(200).json_body(serde_json::json!([]));
    });
    let out = run_with_env(
        &pr_call(),
        &[("GITHUB_TOKEN", "t"), ("GITHUB_API_URL", server.base_url().as_str())],
    )?;
    let text = out["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("# 📝 PR #7: WIP"));
    assert!(text.contains("- Status: Draft"));
    assert!(!text.contains("## Description"));
    assert!(!text.contains("## Reviews"));
    assert!(text.contains("## Diff"));
    Ok(())
}

#[test]
fn failed_review_fetch_fails_the_whole_call() -> anyhow::Result<()> {
    let server = MockServer::start();
    mock_pull(
        &server,
        serde_json::json!({"number": 7, "title": "x", "state": "open"}),
    );
    server.mock(|when, then| {
        when.method(GET).path("/repos/o/r/pulls/7/reviews");
        then.status(403)
            .json_body(serde_json::json!({"message": "Resource not accessible"}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/repos/o/r/issues/7/timeline");
        then.status(200).json_body(serde_json::json!([]));
    });
    let out = run_with_env(
        &pr_call(),
        &[
            ("GITHUB_TOKEN", "t"),
            ("GITHUB_API_URL", server.base_url().as_str()),
            ("GITHUB_HTTP_MAX_RETRIES", "0"),
        ],
    )?;
    let result = &out["result"];
    assert_eq!(result["isError"], true);
    assert_eq!(result["structuredContent"]["error"]["code"], "forbidden");
    Ok(())
}
