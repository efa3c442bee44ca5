//! Tool-protocol (MCP) adapter / MCP 工具协议适配
//!
//! `server` answers line-delimited JSON-RPC on stdio, `client` drives a
//! server subprocess for a single search.

pub mod client;
pub mod protocol;
pub mod server;

pub use client::McpClient;
pub use server::McpServer;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpError {
    #[error("MCP Error: {0}")]
    Server(String),

    #[error("MCP Error: {message}")]
    Rpc { code: i64, message: String },

    #[error("No valid response from MCP server")]
    NoResponse,

    #[error("MCP I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MCP encoding error: {0}")]
    Json(#[from] serde_json::Error),
}
