use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn run_lines(reqs: &[serde_json::Value], envs: &[(&str, &str)]) -> anyhow::Result<Vec<serde_json::Value>> {
    let mut cmd = Command::cargo_bin("github-explorer-mcp")?;
    cmd.env_remove("GITHUB_MCP_ENABLE_PING");
    for (k, v) in envs {
        cmd.env(k, v);
    }
    let mut input = Vec::new();
    for req in reqs {
        writeln!(input, "{}", serde_json::to_string(req)?)?;
    }
    let assert = cmd
        .arg("--log-level")
        .arg("warn")
        .write_stdin(input)
        .assert()
        .success();
    let output = String::from_utf8(assert.get_output().stdout.clone())?;
    let mut out = Vec::new();
    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        out.push(serde_json::from_str(line)?);
    }
    Ok(out)
}

#[test]
fn initialize_and_tools_list() -> anyhow::Result<()> {
    let out = run_lines(
        &[
            serde_json::json!({"jsonrpc":"2.0","method":"initialize","id":1}),
            serde_json::json!({"jsonrpc":"2.0","method":"notifications/initialized"}),
            serde_json::json!({"jsonrpc":"2.0","method":"tools/list","id":2}),
        ],
        &[],
    )?;
    // The notification gets no reply.
    assert_eq!(out.len(), 2);
    assert_eq!(out[0]["id"], 1);
    assert_eq!(out[0]["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(out[0]["result"]["serverInfo"]["name"], "github-explorer-mcp");

    assert_eq!(out[1]["id"], 2);
    let names: Vec<&str> = out[1]["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    for expected in [
        "find_repo",
        "search_code",
        "get_file",
        "list_directory",
        "get_repo_info",
        "get_issue",
        "get_pull_request",
        "get_commit",
    ] {
        assert!(names.contains(&expected), "missing tool {}", expected);
    }
    assert!(!names.contains(&"ping"));
    Ok(())
}

#[test]
fn ping_gating() -> anyhow::Result<()> {
    let call = serde_json::json!({
        "jsonrpc":"2.0","method":"tools/call","id":5,
        "params":{"name":"ping","arguments":{"message":"hello"}}
    });
    let off = run_lines(&[call.clone()], &[])?;
    assert_eq!(off[0]["error"]["code"], -32601);

    let list = serde_json::json!({"jsonrpc":"2.0","method":"tools/list","id":6});
    let on = run_lines(&[list, call], &[("GITHUB_MCP_ENABLE_PING", "1")])?;
    assert!(on[0]["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .any(|t| t["name"] == "ping"));
    assert_eq!(on[1]["result"]["content"][0]["text"], "hello");
    assert!(on[1]["result"].get("isError").is_none());
    Ok(())
}

#[test]
fn protocol_errors() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("github-explorer-mcp")?;
    let assert = cmd
        .arg("--log-level")
        .arg("warn")
        .write_stdin("{oops\n\n{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"resources/list\"}\n")
        .assert()
        .success();
    let output = String::from_utf8(assert.get_output().stdout.clone())?;
    let lines: Vec<serde_json::Value> = output
        .lines()
        .map(|l| serde_json::from_str(l))
        .collect::<Result<_, _>>()?;
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["error"]["code"], -32700);
    assert!(lines[0]["id"].is_null());
    assert_eq!(lines[1]["error"]["code"], -32601);
    assert_eq!(lines[1]["id"], 9);
    Ok(())
}

#[test]
fn unknown_tool_is_method_not_found() -> anyhow::Result<()> {
    let out = run_lines(
        &[serde_json::json!({
            "jsonrpc":"2.0","method":"tools/call","id":"x",
            "params":{"name":"delete_repo","arguments":{}}
        })],
        &[],
    )?;
    assert_eq!(out[0]["id"], "x");
    assert_eq!(out[0]["error"]["code"], -32601);
    Ok(())
}

#[test]
fn version_flag_prints_and_exits() -> anyhow::Result<()> {
    Command::cargo_bin("github-explorer-mcp")?
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("github-explorer-mcp "));
    Ok(())
}

#[test]
fn logs_stay_off_stdout() -> anyhow::Result<()> {
    Command::cargo_bin("github-explorer-mcp")?
        .arg("--log-level")
        .arg("debug")
        .write_stdin("{\"jsonrpc\":\"2.0\",\"method\":\"initialize\",\"id\":1}\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("protocolVersion"))
        .stdout(predicate::str::contains("Starting").not())
        .stderr(predicate::str::contains("Starting"));
    Ok(())
}
