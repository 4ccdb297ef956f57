use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

fn repo_schema() -> serde_json::Value {
    serde_json::json!({"type": "string", "description": "Repository as owner/name, e.g. vercel/ai"})
}

pub fn tool_descriptors(include_ping: bool) -> Vec<ToolDescriptor> {
    let ping = ToolDescriptor {
        name: "ping".into(),
        description: "Health check; echoes a message.".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "message": {"type": "string"}
            }
        }),
    };

    let find_repo = ToolDescriptor {
        name: "find_repo".into(),
        description: "Search GitHub repositories by keyword or GitHub search syntax".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "query": {"type": "string"},
                "limit": {"type": "integer", "minimum": 1, "maximum": 100}
            },
            "required": ["query"]
        }),
    };

    let search_code = ToolDescriptor {
        name: "search_code".into(),
        description: "Search code inside one repository".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "repo": repo_schema(),
                "query": {"type": "string"},
                "limit": {"type": "integer", "minimum": 1, "maximum": 100}
            },
            "required": ["repo", "query"]
        }),
    };

    let get_file = ToolDescriptor {
        name: "get_file".into(),
        description: "Read a file's contents at an optional branch, tag or commit".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "repo": repo_schema(),
                "path": {"type": "string"},
                "ref": {"type": "string"}
            },
            "required": ["repo", "path"]
        }),
    };

    let list_directory = ToolDescriptor {
        name: "list_directory".into(),
        description: "List a directory (repository root when path is omitted)".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "repo": repo_schema(),
                "path": {"type": "string"}
            },
            "required": ["repo"]
        }),
    };

    let get_repo_info = ToolDescriptor {
        name: "get_repo_info".into(),
        description: "Repository metadata: description, stars, language, license, topics".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {"repo": repo_schema()},
            "required": ["repo"]
        }),
    };

    let get_issue = ToolDescriptor {
        name: "get_issue".into(),
        description: "Issue details with labels, assignees and the full timeline".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "repo": repo_schema(),
                "number": {"type": "integer", "minimum": 0}
            },
            "required": ["repo", "number"]
        }),
    };

    let get_pull_request = ToolDescriptor {
        name: "get_pull_request".into(),
        description: "Pull request details with reviews, review comments, timeline and diff".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "repo": repo_schema(),
                "number": {"type": "integer", "minimum": 0}
            },
            "required": ["repo", "number"]
        }),
    };

    let get_commit = ToolDescriptor {
        name: "get_commit".into(),
        description: "Commit details with changed files and diff".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "repo": repo_schema(),
                "sha": {"type": "string"}
            },
            "required": ["repo", "sha"]
        }),
    };

    let mut tools = Vec::new();
    if include_ping {
        tools.push(ping);
    }
    tools.extend([
        find_repo,
        search_code,
        get_file,
        list_directory,
        get_repo_info,
        get_issue,
        get_pull_request,
        get_commit,
    ]);
    tools
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PingInput {
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PingOutput {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FindRepoInput {
    pub query: String,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchCodeInput {
    pub repo: String,
    pub query: String,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetFileInput {
    pub repo: String,
    pub path: String,
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListDirectoryInput {
    pub repo: String,
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoInput {
    pub repo: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NumberInput {
    pub repo: String,
    pub number: u64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetCommitInput {
    pub repo: String,
    pub sha: String,
}
