//! MCP Server implementation
//!
//! Newline-delimited JSON-RPC over stdio. Each `tools/call` runs in its own
//! task so calls waiting on the knowledge base do not block the others;
//! responses funnel through a single writer task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::dispatcher::Dispatcher;
use super::error::McpError;
use super::protocol::{
    InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ToolCallParams,
    ToolsListResult,
};

/// Request counter for log correlation
static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(1);

/// MCP Server
///
/// Handles MCP protocol communication over stdio.
pub struct McpServer {
    dispatcher: Dispatcher,
    initialized: bool,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            initialized: false,
        }
    }

    /// Whether a client has sent `initialize`
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Run the MCP server, reading from stdin and writing to stdout
    pub async fn run(&mut self) -> Result<(), McpError> {
        let stdin = BufReader::new(tokio::io::stdin());
        self.serve(stdin, tokio::io::stdout()).await
    }

    /// Serve requests from `reader` until EOF
    ///
    /// Returns once every in-flight tool call has answered.
    pub async fn serve<R, W>(&mut self, reader: R, writer: W) -> Result<(), McpError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
        let writer_task = tokio::spawn(write_responses(rx, writer));
        let mut calls = JoinSet::new();
        let mut lines = reader.lines();

        info!("MCP server starting");

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let req_id = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
            debug!(req_id, raw = %line, "Received raw JSON-RPC request");

            let request: JsonRpcRequest = match serde_json::from_str(&line) {
                Ok(req) => req,
                Err(e) => {
                    error!(req_id, error = %e, "Failed to parse JSON-RPC request");
                    let _ = tx.send(JsonRpcResponse::error(
                        Value::Null,
                        JsonRpcError::new(JsonRpcError::PARSE_ERROR, e.to_string()),
                    ));
                    continue;
                }
            };

            info!(
                req_id,
                method = %request.method,
                jsonrpc_id = ?request.id,
                "Incoming JSON-RPC request"
            );

            if request.jsonrpc != "2.0" {
                error!(req_id, got_version = %request.jsonrpc, "Invalid JSON-RPC version");
                let _ = tx.send(JsonRpcResponse::error(
                    request.id,
                    JsonRpcError::with_data(
                        JsonRpcError::INVALID_REQUEST,
                        "Invalid JSON-RPC version",
                        serde_json::json!({"expected": "2.0", "got": request.jsonrpc}),
                    ),
                ));
                continue;
            }

            if request.method == "tools/call" && !request.is_notification() {
                let dispatcher = self.dispatcher.clone();
                let tx = tx.clone();
                calls.spawn(async move {
                    let start = Instant::now();
                    let result = handle_tools_call(&dispatcher, &request.params).await;
                    let response = respond(req_id, &request.method, request.id, result, start);
                    let _ = tx.send(response);
                });
                reap_finished(&mut calls);
                continue;
            }

            let start = Instant::now();
            let is_notification = request.is_notification();
            let result = self.handle_request(&request);
            if is_notification {
                if let Err(e) = result {
                    warn!(req_id, method = %request.method, error = %e, "Notification handling failed");
                } else {
                    debug!(req_id, method = %request.method, "Notification handled (no response)");
                }
                continue;
            }
            let _ = tx.send(respond(req_id, &request.method, request.id, result, start));
        }

        while let Some(joined) = calls.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Tool call task failed");
            }
        }
        drop(tx);

        match writer_task.await {
            Ok(result) => result?,
            Err(e) => return Err(McpError::Internal(format!("writer task failed: {}", e))),
        }

        info!("MCP server shutting down");
        Ok(())
    }

    /// Handle a JSON-RPC request other than `tools/call`
    fn handle_request(&mut self, request: &JsonRpcRequest) -> Result<Value, McpError> {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(),
            "initialized" | "notifications/initialized" => Ok(serde_json::json!({})),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => self.handle_tools_list(),
            // A tools/call without an id is a notification; nothing to answer
            "tools/call" => Ok(Value::Null),
            _ => Err(McpError::MethodNotFound(request.method.clone())),
        }
    }

    /// Handle initialize request
    fn handle_initialize(&mut self) -> Result<Value, McpError> {
        self.initialized = true;
        info!("MCP server initialized");

        serde_json::to_value(InitializeResult::default())
            .map_err(|e| McpError::Internal(e.to_string()))
    }

    /// Handle tools/list request
    fn handle_tools_list(&self) -> Result<Value, McpError> {
        let result = ToolsListResult {
            tools: self.dispatcher.list_capabilities(),
        };
        serde_json::to_value(result).map_err(|e| McpError::Internal(e.to_string()))
    }
}

/// Handle tools/call request
async fn handle_tools_call(dispatcher: &Dispatcher, params: &Value) -> Result<Value, McpError> {
    let params: ToolCallParams = serde_json::from_value(params.clone())
        .map_err(|e| McpError::InvalidParams(format!("Invalid tools/call params: {}", e)))?;

    info!(tool = %params.name, "Dispatching tool call");
    debug!(tool = %params.name, arguments = %params.arguments, "Tool call arguments");

    let result = dispatcher.call(&params.name, &params.arguments).await?;
    serde_json::to_value(result).map_err(|e| McpError::Internal(e.to_string()))
}

/// Collect tool call tasks that have already finished
///
/// Returns how many were reaped.
fn reap_finished(calls: &mut JoinSet<()>) -> usize {
    let mut reaped = 0;
    while let Some(joined) = calls.try_join_next() {
        if let Err(e) = joined {
            error!(error = %e, "Tool call task failed");
        }
        reaped += 1;
    }
    reaped
}

/// Build the response and log how the request completed
fn respond(
    req_id: u64,
    method: &str,
    id: Value,
    result: Result<Value, McpError>,
    start: Instant,
) -> JsonRpcResponse {
    let elapsed_ms = start.elapsed().as_millis();
    match result {
        Ok(value) => {
            info!(req_id, method, elapsed_ms = %elapsed_ms, "JSON-RPC request completed successfully");
            JsonRpcResponse::success(id, value)
        }
        Err(e) => {
            warn!(req_id, method, elapsed_ms = %elapsed_ms, kind = ?e.kind(), error = %e, "JSON-RPC request completed with error");
            JsonRpcResponse::error(id, e.into())
        }
    }
}

/// Write responses one per line until every sender is gone
async fn write_responses<W>(
    mut rx: mpsc::UnboundedReceiver<JsonRpcResponse>,
    mut writer: W,
) -> Result<(), McpError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut json = serde_json::to_string(&response)?;
        debug!(raw = %json, "Sending raw JSON-RPC response");
        json.push('\n');
        writer.write_all(json.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}
