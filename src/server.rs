use crate::config::Config;
use crate::error::{Error, Result};
use crate::gateway::Gateway;
use crate::mcp::{mcp_error, mcp_wrap};
use crate::normalize;
use crate::render;
use crate::tools::*;
use crate::types::RepoRef;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

// Minimal JSON-RPC 2.0 types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum Id {
    Str(String),
    Num(i64),
}

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Value,
    id: Option<Id>,
}

#[derive(Debug, Serialize)]
struct Response {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
    id: Option<Id>,
}

#[derive(Debug, Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

fn rpc_error(id: Option<Id>, code: i64, message: &str) -> Response {
    Response {
        jsonrpc: "2.0".into(),
        result: None,
        error: Some(RpcError {
            code,
            message: message.into(),
        }),
        id,
    }
}

fn rpc_ok(id: Option<Id>, result: Value) -> Response {
    Response {
        jsonrpc: "2.0".into(),
        result: Some(result),
        error: None,
        id,
    }
}

#[derive(Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Display text plus the structured value behind it.
type ToolOutput = (String, Value);

fn output<T: Serialize>(text: String, structured: &T) -> Result<ToolOutput> {
    Ok((text, serde_json::to_value(structured)?))
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T> {
    let args = if args.is_null() {
        serde_json::json!({})
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| Error::InvalidParams(e.to_string()))
}

fn enforce_limit(limit: Option<u32>) -> Result<u32> {
    let l = limit.unwrap_or(10);
    if l == 0 || l > 100 {
        return Err(Error::InvalidArgument {
            name: "limit".into(),
            reason: format!("must be 1..=100, got {}", l),
        });
    }
    Ok(l)
}

fn require_non_empty(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument {
            name: name.into(),
            reason: "must not be empty".into(),
        });
    }
    Ok(())
}

pub struct Server {
    cfg: Config,
    gateway: Gateway,
}

impl Server {
    pub fn new(cfg: Config) -> Result<Self> {
        let gateway = Gateway::new(cfg.clone())?;
        Ok(Self { cfg, gateway })
    }

    /// Handle one input line; `None` when nothing should be written back (notifications, blanks).
    async fn handle_line(&self, line: &str) -> Option<Response> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => return Some(rpc_error(None, -32700, &format!("Parse error: {}", e))),
        };
        let req: Request = match serde_json::from_value(value) {
            Ok(r) => r,
            Err(e) => return Some(rpc_error(None, -32600, &format!("Invalid Request: {}", e))),
        };
        if req.id.is_none() {
            debug!("Notification method={}", req.method);
            return None;
        }
        if req.jsonrpc != "2.0" {
            return Some(rpc_error(req.id, -32600, "Invalid Request: jsonrpc must be \"2.0\""));
        }
        debug!("Received method={}", req.method);
        Some(self.dispatch(req).await)
    }

    async fn dispatch(&self, req: Request) -> Response {
        match req.method.as_str() {
            "initialize" => self.handle_initialize(req.id),
            "tools/list" => self.handle_tools_list(req.id),
            "tools/call" => self.handle_tools_call(req.id, req.params).await,
            "ping" => rpc_ok(req.id, serde_json::json!({})),
            other => rpc_error(req.id, -32601, &format!("Method not found: {}", other)),
        }
    }

    fn handle_initialize(&self, id: Option<Id>) -> Response {
        rpc_ok(
            id,
            serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": { "listChanged": false } },
                "serverInfo": {
                    "name": "github-explorer-mcp",
                    "version": env!("CARGO_PKG_VERSION"),
                }
            }),
        )
    }

    fn handle_tools_list(&self, id: Option<Id>) -> Response {
        let tools = tool_descriptors(self.cfg.enable_ping);
        rpc_ok(id, serde_json::json!({ "tools": tools }))
    }

    async fn handle_tools_call(&self, id: Option<Id>, params: Value) -> Response {
        let call: ToolCallParams = match serde_json::from_value(params) {
            Ok(c) => c,
            Err(_) => return rpc_error(id, -32602, "Invalid params"),
        };
        debug!("tools/call name={}", call.name);
        let args = call.arguments;
        let outcome = match call.name.as_str() {
            "ping" if self.cfg.enable_ping => self.ping(args),
            "find_repo" => self.find_repo(args).await,
            "search_code" => self.search_code(args).await,
            "get_file" => self.get_file(args).await,
            "list_directory" => self.list_directory(args).await,
            "get_repo_info" => self.get_repo_info(args).await,
            "get_issue" => self.get_issue(args).await,
            "get_pull_request" => self.get_pull_request(args).await,
            "get_commit" => self.get_commit(args).await,
            _ => return rpc_error(id, -32601, &format!("Tool not found: {}", call.name)),
        };
        match outcome {
            Ok((text, structured)) => rpc_ok(id, mcp_wrap(structured, text, false)),
            Err(e @ Error::InvalidParams(_)) => rpc_error(id, -32602, &e.to_string()),
            Err(e) => {
                warn!("tool {} failed: {}", call.name, e);
                rpc_ok(id, mcp_error(&e))
            }
        }
    }

    fn ping(&self, args: Value) -> Result<ToolOutput> {
        let input: PingInput = parse_args(args).unwrap_or(PingInput { message: None });
        let message = input.message.unwrap_or_else(|| "pong".to_string());
        let out = PingOutput {
            message: message.clone(),
        };
        output(message, &out)
    }

    async fn find_repo(&self, args: Value) -> Result<ToolOutput> {
        let input: FindRepoInput = parse_args(args)?;
        require_non_empty("query", &input.query)?;
        let limit = enforce_limit(input.limit)?;
        let raw = self
            .gateway
            .search_repositories(&input.query, limit)
            .await?;
        let results = normalize::normalize_repo_search(&input.query, raw);
        output(render::render_repo_search(&results), &results)
    }

    async fn search_code(&self, args: Value) -> Result<ToolOutput> {
        let input: SearchCodeInput = parse_args(args)?;
        let repo = RepoRef::parse(&input.repo)?;
        require_non_empty("query", &input.query)?;
        let limit = enforce_limit(input.limit)?;
        let raw = self.gateway.search_code(&repo, &input.query, limit).await?;
        let results = normalize::normalize_code_search(&input.query, &repo.to_string(), raw);
        output(render::render_code_search(&results), &results)
    }

    async fn get_file(&self, args: Value) -> Result<ToolOutput> {
        let input: GetFileInput = parse_args(args)?;
        let repo = RepoRef::parse(&input.repo)?;
        require_non_empty("path", &input.path)?;
        let file = self
            .gateway
            .get_file(&repo, &input.path, input.git_ref.as_deref())
            .await?;
        output(render::render_file(&file), &file)
    }

    async fn list_directory(&self, args: Value) -> Result<ToolOutput> {
        let input: ListDirectoryInput = parse_args(args)?;
        let repo = RepoRef::parse(&input.repo)?;
        let raw = self.gateway.list_directory(&repo, &input.path).await?;
        let listing = normalize::normalize_directory(&repo.to_string(), &input.path, raw);
        output(render::render_directory(&listing), &listing)
    }

    async fn get_repo_info(&self, args: Value) -> Result<ToolOutput> {
        let input: RepoInput = parse_args(args)?;
        let repo = RepoRef::parse(&input.repo)?;
        let info = normalize::normalize_repo(self.gateway.get_repo(&repo).await?);
        output(render::render_repo_info(&info), &info)
    }

    async fn get_issue(&self, args: Value) -> Result<ToolOutput> {
        let input: NumberInput = parse_args(args)?;
        let repo = RepoRef::parse(&input.repo)?;
        let raw = self.gateway.get_issue(&repo, input.number).await?;
        let report = normalize::normalize_issue(raw.issue, &raw.timeline);
        output(render::render_issue(&report), &report)
    }

    async fn get_pull_request(&self, args: Value) -> Result<ToolOutput> {
        let input: NumberInput = parse_args(args)?;
        let repo = RepoRef::parse(&input.repo)?;
        let raw = self.gateway.get_pull_request(&repo, input.number).await?;
        let report =
            normalize::normalize_pull_request(raw.pull, raw.diff, raw.reviews, &raw.timeline);
        output(render::render_pull_request(&report), &report)
    }

    async fn get_commit(&self, args: Value) -> Result<ToolOutput> {
        let input: GetCommitInput = parse_args(args)?;
        let repo = RepoRef::parse(&input.repo)?;
        require_non_empty("sha", &input.sha)?;
        let raw = self.gateway.get_commit(&repo, &input.sha).await?;
        let report = normalize::normalize_commit(raw.commit, raw.diff);
        output(render::render_commit(&report), &report)
    }
}

async fn write_response<W: AsyncWriteExt + Unpin>(out: &mut W, resp: &Response) -> anyhow::Result<()> {
    let mut payload = serde_json::to_string(resp)?;
    payload.push('\n');
    out.write_all(payload.as_bytes()).await?;
    out.flush().await?;
    Ok(())
}

/// Serve newline-delimited JSON-RPC on stdin/stdout until stdin closes.
pub async fn run_stdio_server(cfg: Config) -> anyhow::Result<()> {
    info!(
        "Starting github-explorer-mcp stdio server; protocol={}",
        PROTOCOL_VERSION
    );
    let server = Server::new(cfg)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut out = tokio::io::stdout();
    while let Some(line) = lines.next_line().await? {
        if let Some(resp) = server.handle_line(&line).await {
            write_response(&mut out, &resp).await?;
        }
    }
    info!("stdin closed; shutting down");
    Ok(())
}
