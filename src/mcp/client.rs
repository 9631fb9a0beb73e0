//! Stdio transport and request/response matching.

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use super::protocol::{
    CallToolResult, Incoming, InitializeResult, ListToolsResult, McpTool, Notification, Request,
    JSONRPC_VERSION, METHOD_NOT_FOUND,
};
use crate::constants::{APP_NAME, APP_VERSION, MCP_PROTOCOL_VERSION, SERVER_SHUTDOWN_GRACE_MS};
use crate::tools::ToolSession;

/// An MCP session over any byte stream pair.
///
/// [`McpClient::connect`] spawns a server process and talks to its stdio;
/// [`McpClient::new`] wraps arbitrary streams (used by tests).
pub struct McpClient<R, W> {
    reader: BufReader<R>,
    writer: W,
    next_id: u64,
    child: Option<Child>,
}

impl McpClient<ChildStdout, ChildStdin> {
    /// Launches `command args...` and completes the MCP handshake.
    ///
    /// The child's stderr is inherited so server logs stay visible. It is
    /// killed if the client is dropped without [`shutdown`](Self::shutdown).
    pub async fn connect(command: &str, args: &[String]) -> Result<Self> {
        info!("starting tool server: {command} {}", args.join(" "));
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start tool server `{command}`"))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("Failed to capture tool server stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("Failed to capture tool server stdout"))?;

        let mut client = Self::new(stdout, stdin);
        client.child = Some(child);

        let init = client
            .initialize()
            .await
            .context("MCP handshake with tool server failed")?;
        if let Some(server) = &init.server_info {
            info!(
                "connected to {} {}",
                server.name,
                server.version.as_deref().unwrap_or("")
            );
        }
        Ok(client)
    }
}

impl<R, W> McpClient<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
            next_id: 1,
            child: None,
        }
    }

    /// Sends `initialize` followed by the `notifications/initialized`
    /// notification.
    pub async fn initialize(&mut self) -> Result<InitializeResult> {
        let params = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": { "name": APP_NAME, "version": APP_VERSION },
        });
        let result = self.request("initialize", Some(params)).await?;
        let init: InitializeResult =
            serde_json::from_value(result).context("Invalid initialize result")?;
        if let Some(version) = init.protocol_version.as_deref() {
            if version != MCP_PROTOCOL_VERSION {
                debug!("server negotiated protocol version {version}");
            }
        }
        self.notify("notifications/initialized", None).await?;
        Ok(init)
    }

    /// Closes the server's stdin and waits briefly for it to exit, killing
    /// it if it lingers.
    pub async fn shutdown(mut self) -> Result<()> {
        self.writer.shutdown().await.ok();
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        let grace = Duration::from_millis(SERVER_SHUTDOWN_GRACE_MS);
        match tokio::time::timeout(grace, child.wait()).await {
            Ok(status) => {
                let status = status.context("Failed to wait for tool server")?;
                debug!("tool server exited with {status}");
            }
            Err(_) => {
                warn!("tool server did not exit in time; killing it");
                child.kill().await.context("Failed to kill tool server")?;
            }
        }
        Ok(())
    }

    async fn request(&mut self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id;
        self.next_id += 1;
        self.send_json(&Request {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        })
        .await?;

        let expected = Value::from(id);
        loop {
            let Incoming {
                id: msg_id,
                method: msg_method,
                result,
                error,
            } = self.read_message().await?;

            match (msg_id, msg_method) {
                (Some(req_id), Some(req_method)) => {
                    self.answer_server_request(req_id, &req_method).await?;
                }
                (None, Some(notification)) => {
                    debug!("server notification: {notification}");
                }
                (Some(resp_id), None) if resp_id == expected => {
                    if let Some(err) = error {
                        bail!("{method} failed: {err}");
                    }
                    return Ok(result.unwrap_or(Value::Null));
                }
                (other, None) => {
                    debug!("skipping response for unrelated id {other:?}");
                }
            }
        }
    }

    async fn notify(&mut self, method: &str, params: Option<Value>) -> Result<()> {
        self.send_json(&Notification {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
        })
        .await
    }

    /// Servers may ping; everything else they ask for is unsupported.
    async fn answer_server_request(&mut self, id: Value, method: &str) -> Result<()> {
        let reply = if method == "ping" {
            json!({ "jsonrpc": JSONRPC_VERSION, "id": id, "result": {} })
        } else {
            debug!("rejecting server request {method}");
            json!({
                "jsonrpc": JSONRPC_VERSION,
                "id": id,
                "error": { "code": METHOD_NOT_FOUND, "message": format!("Method not found: {method}") },
            })
        };
        self.send_json(&reply).await
    }

    async fn send_json<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');
        self.writer
            .write_all(&line)
            .await
            .context("Failed to write to tool server")?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn read_message(&mut self) -> Result<Incoming> {
        loop {
            let mut line = String::new();
            let read = self
                .reader
                .read_line(&mut line)
                .await
                .context("Failed to read from tool server")?;
            if read == 0 {
                bail!("tool server closed the connection");
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Incoming>(line) {
                Ok(msg) => return Ok(msg),
                Err(err) => warn!("ignoring non-JSON-RPC output from tool server ({err}): {line}"),
            }
        }
    }
}

#[async_trait::async_trait]
impl<R, W> ToolSession for McpClient<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn list_tools(&mut self) -> Result<Vec<McpTool>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let result = self.request("tools/list", params).await?;
            let page: ListToolsResult =
                serde_json::from_value(result).context("Invalid tools/list result")?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        Ok(tools)
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult> {
        let params = json!({ "name": name, "arguments": arguments });
        let result = self.request("tools/call", Some(params)).await?;
        serde_json::from_value(result).context("Invalid tools/call result")
    }
}
