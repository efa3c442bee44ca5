//! Tool-protocol client / 工具协议客户端
//!
//! Runs the server as a child process, feeds it a whole session on stdin and
//! picks the tool reply out of its stdout.

use std::path::PathBuf;
use std::process::Stdio;

use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::protocol::{JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION};
use super::server::TOOL_NAME;
use super::McpError;

const CALL_ID: i64 = 1;

pub struct McpClient {
    program: PathBuf,
    args: Vec<String>,
}

impl McpClient {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Re-launch the running binary in `mcp` mode / 以 mcp 模式启动自身
    pub fn current_exe(extra_args: Vec<String>) -> Result<Self, McpError> {
        let mut args = extra_args;
        args.push("mcp".to_string());
        Ok(Self::new(std::env::current_exe()?, args))
    }

    /// Run one `search_xiaomi_jobs` call and return its text
    pub async fn search_jobs(
        &self,
        keyword: &str,
        limit: u32,
        offset: u32,
        location_codes: &[String],
    ) -> Result<String, McpError> {
        let arguments = json!({
            "keyword": keyword,
            "limit": limit,
            "offset": offset,
            "location_codes": location_codes,
        });
        let input = build_session_input(arguments)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            // A server that died early shows up through its exit status
            match stdin.write_all(input.as_bytes()).await {
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e.into()),
                _ => {}
            }
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(McpError::Server(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        extract_tool_text(&String::from_utf8_lossy(&output.stdout))
    }
}

/// initialize, initialized notification, then the tool call; one per line
pub fn build_session_input(arguments: Value) -> Result<String, McpError> {
    let messages = [
        JsonRpcRequest::new(
            0,
            "initialize",
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {"name": "xiaomi-jobs-client", "version": env!("CARGO_PKG_VERSION")}
            }),
        ),
        JsonRpcRequest::notification("notifications/initialized"),
        JsonRpcRequest::new(
            CALL_ID,
            "tools/call",
            json!({"name": TOOL_NAME, "arguments": arguments}),
        ),
    ];

    let mut input = String::new();
    for message in &messages {
        input.push_str(&serde_json::to_string(message)?);
        input.push('\n');
    }
    Ok(input)
}

/// Find the reply to the tool call among the server's output lines
pub fn extract_tool_text(stdout: &str) -> Result<String, McpError> {
    for line in stdout.lines() {
        let Ok(response) = serde_json::from_str::<JsonRpcResponse>(line) else {
            continue;
        };
        if response.id != json!(CALL_ID) {
            continue;
        }
        if let Some(error) = response.error {
            return Err(McpError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        let text = response
            .result
            .as_ref()
            .and_then(|r| r.get("content"))
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("text"))
            .and_then(Value::as_str);
        if let Some(text) = text {
            return Ok(text.to_string());
        }
    }
    Err(McpError::NoResponse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_input_is_three_lines() {
        let input = build_session_input(json!({"keyword": "AI"})).unwrap();
        let lines: Vec<Value> = input.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["method"], "initialize");
        assert!(lines[1].get("id").is_none());
        assert_eq!(lines[2]["id"], 1);
        assert_eq!(lines[2]["params"]["name"], TOOL_NAME);
        assert_eq!(lines[2]["params"]["arguments"]["keyword"], "AI");
    }

    #[test]
    fn test_extract_skips_other_replies() {
        let stdout = concat!(
            r#"{"jsonrpc":"2.0","id":0,"result":{"protocolVersion":"2024-11-05"}}"#, "\n",
            "garbage\n",
            r#"{"jsonrpc":"2.0","id":1,"result":{"content":[{"type":"text","text":"📭 No job postings found (Total: 0)"}],"isError":false}}"#, "\n",
        );
        assert_eq!(extract_tool_text(stdout).unwrap(), "📭 No job postings found (Total: 0)");
    }

    #[test]
    fn test_extract_errors() {
        assert!(matches!(extract_tool_text(""), Err(McpError::NoResponse)));
        let err = extract_tool_text(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"bad limit"}}"#)
            .unwrap_err();
        assert!(matches!(err, McpError::Rpc { code: -32602, .. }));
        assert_eq!(err.to_string(), "MCP Error: bad limit");
    }

    #[tokio::test]
    async fn test_failing_child_reports_stderr() {
        let client = McpClient::new("sh", vec!["-c".into(), "cat > /dev/null; echo boom >&2; exit 3".into()]);
        let err = client.search_jobs("AI", 1, 0, &[]).await.unwrap_err();
        assert_eq!(err.to_string(), "MCP Error: boom");
    }

    #[tokio::test]
    async fn test_silent_child_has_no_response() {
        let client = McpClient::new("sh", vec!["-c".into(), "cat > /dev/null".into()]);
        let err = client.search_jobs("AI", 1, 0, &[]).await.unwrap_err();
        assert_eq!(err.to_string(), "No valid response from MCP server");
    }
}
