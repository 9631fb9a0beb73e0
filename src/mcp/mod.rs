//! Minimal Model Context Protocol client.
//!
//! Speaks newline-delimited JSON-RPC 2.0 over a child process's stdio:
//! the `initialize` handshake, `tools/list` and `tools/call`. That is all
//! the agent needs from a tool server.

mod client;
mod protocol;

pub use client::McpClient;
#[allow(unused_imports)]
pub use protocol::{CallToolResult, ContentItem, McpTool};
