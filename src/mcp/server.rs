//! Tool-protocol server / 工具协议服务端
//!
//! Exposes `search_xiaomi_jobs` over line-delimited JSON-RPC. The serve loop
//! is generic over the byte streams so tests can drive it from memory.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::protocol::*;
use super::McpError;
use crate::client::JobSource;
use crate::format::render_outcome;
use crate::models::{string_list, SearchQuery, DEFAULT_LIMIT};

pub const SERVER_NAME: &str = "xiaomi-jobs";
pub const TOOL_NAME: &str = "search_xiaomi_jobs";
pub const MAX_TOOL_LIMIT: u32 = 50;

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

/// Arguments of `search_xiaomi_jobs` / 工具参数
#[derive(Debug, Deserialize)]
pub struct SearchToolArgs {
    #[serde(default)]
    pub keyword: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default, deserialize_with = "string_list")]
    pub location_codes: Vec<String>,
}

impl SearchToolArgs {
    fn into_query(self) -> Result<SearchQuery, JsonRpcError> {
        if self.limit < 1 || self.limit > MAX_TOOL_LIMIT {
            return Err(JsonRpcError::new(
                INVALID_PARAMS,
                format!("limit must be between 1 and {}", MAX_TOOL_LIMIT),
            ));
        }
        Ok(SearchQuery::new(self.keyword)
            .with_limit(self.limit)
            .with_offset(self.offset)
            .with_locations(self.location_codes))
    }
}

/// Tool descriptor returned by `tools/list`
pub fn tool_definition() -> Value {
    json!({
        "name": TOOL_NAME,
        "description": "Search for job postings on Xiaomi careers website",
        "inputSchema": {
            "type": "object",
            "properties": {
                "keyword": {
                    "type": "string",
                    "description": "Search keyword for job titles or descriptions",
                    "default": ""
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of results to return (default: 10)",
                    "default": DEFAULT_LIMIT,
                    "minimum": 1,
                    "maximum": MAX_TOOL_LIMIT
                },
                "offset": {
                    "type": "integer",
                    "description": "Number of results to skip for pagination (default: 0)",
                    "default": 0,
                    "minimum": 0
                },
                "location_codes": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "List of location codes to filter by (e.g., ['CN_110000'] for Beijing)"
                }
            },
            "required": []
        }
    })
}

pub struct McpServer {
    source: Arc<dyn JobSource>,
}

impl McpServer {
    pub fn new(source: Arc<dyn JobSource>) -> Self {
        Self { source }
    }

    /// Serve stdin/stdout until stdin closes / 通过标准输入输出提供服务
    pub async fn serve_stdio(&self) -> Result<(), McpError> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<(), McpError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(&line).await {
                let mut out = serde_json::to_string(&response)?;
                out.push('\n');
                writer.write_all(out.as_bytes()).await?;
                writer.flush().await?;
            }
        }
        tracing::info!("Input closed, tool server exiting");
        Ok(())
    }

    /// One inbound line; `None` when no reply is due (notifications)
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    JsonRpcError::new(PARSE_ERROR, format!("Parse error: {}", e)),
                ))
            }
        };

        let request: JsonRpcRequest = match serde_json::from_value(value.clone()) {
            Ok(r) => r,
            Err(e) => {
                let id = value.get("id").cloned().unwrap_or(Value::Null);
                return Some(JsonRpcResponse::failure(
                    id,
                    JsonRpcError::new(INVALID_REQUEST, format!("Invalid request: {}", e)),
                ));
            }
        };

        if request.is_notification() {
            tracing::debug!("Notification {}", request.method);
            return None;
        }

        let id = request.id.clone().unwrap_or(Value::Null);
        Some(match self.dispatch(&request).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        })
    }

    async fn dispatch(&self, request: &JsonRpcRequest) -> Result<Value, JsonRpcError> {
        match request.method.as_str() {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {"tools": {"listChanged": false}},
                "serverInfo": {"name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION")}
            })),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({"tools": [tool_definition()]})),
            "tools/call" => self.call_tool(&request.params).await,
            other => Err(JsonRpcError::new(METHOD_NOT_FOUND, format!("Method not found: {}", other))),
        }
    }

    async fn call_tool(&self, params: &Value) -> Result<Value, JsonRpcError> {
        let name = params.get("name").and_then(Value::as_str).unwrap_or_default();
        if name != TOOL_NAME {
            return Err(JsonRpcError::new(INVALID_PARAMS, format!("Unknown tool: {}", name)));
        }

        let arguments = match params.get("arguments") {
            Some(Value::Null) | None => json!({}),
            Some(args) => args.clone(),
        };
        let args: SearchToolArgs = serde_json::from_value(arguments)
            .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("Invalid arguments: {}", e)))?;
        let query = args.into_query()?;

        tracing::info!("Tool call {} keyword={:?} limit={}", TOOL_NAME, query.keyword, query.limit);
        let outcome = self.source.search(&query).await;
        let result = ToolCallResult {
            content: vec![TextContent::text(render_outcome(&outcome))],
            is_error: false,
        };
        serde_json::to_value(result).map_err(|e| JsonRpcError::new(INVALID_PARAMS, e.to_string()))
    }
}
