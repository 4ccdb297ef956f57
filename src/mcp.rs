use serde_json::Value;

use crate::error::Error;

// Build an MCP-compliant result envelope for tools/call outputs.
// - content: always a single text block so clients can render something.
// - structuredContent: the normalized report (or error shape) as JSON.
// - isError: included only when true to keep payloads small.
pub fn mcp_wrap(structured: Value, text: String, is_error: bool) -> Value {
    let mut obj = serde_json::json!({
        "content": [{ "type": "text", "text": text }],
        "structuredContent": structured,
    });
    if is_error {
        if let Some(map) = obj.as_object_mut() {
            map.insert("isError".to_string(), Value::Bool(true));
        }
    }
    obj
}

pub fn mcp_error(err: &Error) -> Value {
    let message = err.to_string();
    let structured = serde_json::json!({
        "error": {
            "code": err.code(),
            "message": message,
            "retriable": err.retriable(),
        }
    });
    mcp_wrap(structured, message, true)
}
