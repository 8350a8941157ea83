use std::sync::Arc;

use clap::{Args, Subcommand};
use serde_json::{Map, Value, json};
use tokio::io::{self, AsyncBufRead, AsyncReadExt, AsyncWrite, BufReader};
use tokio::sync::mpsc;

pub mod client;
pub mod framing;
pub mod token;
pub mod tools;

use client::{AnalyticsClient, ClientError};
use framing::{Frame, Framing, read_message, write_message};
use token::{MISSING_TOKEN_MESSAGE, TokenSource};
use tools::{ToolKind, ToolResult, tool_definitions};

pub const MCP_SERVER_NAME: &str = "wb-analytics-mcp";
const MCP_PROTOCOL_VERSIONS: [&str; 3] = ["2025-06-18", "2025-03-26", "2024-11-05"];

#[derive(Subcommand, Clone, Debug)]
pub enum McpCommands {
    /// Run the WB analytics MCP server over stdio
    Serve,
    /// Invoke one tool once and print its result
    Call(McpCallArgs),
}

#[derive(Args, Clone, Debug)]
pub struct McpCallArgs {
    /// Tool name (getProductSearchTexts, getProductOrders)
    pub tool: String,
    /// Tool arguments as JSON string
    #[arg(long, short = 'd')]
    pub data: Option<String>,
    /// Read tool arguments from file (use '-' for stdin)
    #[arg(long, short = 'f', conflicts_with = "data")]
    pub data_file: Option<String>,
}

#[derive(Clone, Debug)]
pub struct McpRuntimeConfig {
    pub api_url: String,
    pub tokens: TokenSource,
}

pub async fn run(config: McpRuntimeConfig, command: McpCommands) -> i32 {
    let server = match McpServer::new(config) {
        Ok(server) => Arc::new(server),
        Err(err) => {
            tracing::error!(error = %err, "failed to start MCP server");
            return 1;
        }
    };

    match command {
        McpCommands::Serve => match server.serve_stdio().await {
            Ok(()) => 0,
            Err(err) => {
                tracing::error!(error = %err, "MCP server error");
                1
            }
        },
        McpCommands::Call(args) => server.run_single_call(&args).await,
    }
}

pub struct McpServer {
    client: AnalyticsClient,
    tokens: TokenSource,
}

impl McpServer {
    pub fn new(config: McpRuntimeConfig) -> Result<Self, ClientError> {
        Ok(Self {
            client: AnalyticsClient::new(&config.api_url)?,
            tokens: config.tokens,
        })
    }

    pub async fn serve_stdio(self: Arc<Self>) -> Result<(), String> {
        let mut reader = BufReader::new(io::stdin());
        let mut stdout = io::stdout();
        self.serve(&mut reader, &mut stdout).await
    }

    /// Reads messages until EOF. Each message is handled on its own task, so a
    /// slow tool call does not hold up later requests; replies go through one
    /// writer and may arrive out of request order.
    pub async fn serve<R, W>(self: Arc<Self>, reader: &mut R, writer: &mut W) -> Result<(), String>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!(
            server = MCP_SERVER_NAME,
            version = env!("CARGO_PKG_VERSION"),
            api_url = %self.client.base_url(),
            "WB Analytics MCP Server Running"
        );

        let (tx, mut rx) = mpsc::unbounded_channel::<(Value, Framing)>();

        let reading = async move {
            loop {
                let incoming = read_message(reader)
                    .await
                    .map_err(|e| format!("Failed to read MCP message: {e}"))?;
                let Some((frame, framing)) = incoming else {
                    break;
                };

                match frame {
                    Frame::Message(message) => {
                        let server = Arc::clone(&self);
                        let tx = tx.clone();
                        tokio::spawn(async move {
                            if let Some(response) = server.handle_incoming_message(message).await {
                                let _ = tx.send((response, framing));
                            }
                        });
                    }
                    Frame::Malformed(reason) => {
                        let response = error_response(Value::Null, RpcError::parse_error(reason));
                        let _ = tx.send((response, framing));
                    }
                }
            }
            tracing::info!("stdin closed, waiting for in-flight requests");
            Ok::<(), String>(())
        };

        // Ends once the reader and every in-flight handler have dropped their senders.
        let writing = async {
            while let Some((response, framing)) = rx.recv().await {
                write_message(writer, &response, framing)
                    .await
                    .map_err(|e| format!("Failed to write MCP response: {e}"))?;
            }
            Ok::<(), String>(())
        };

        let (read_result, write_result) = tokio::join!(reading, writing);
        read_result?;
        write_result?;
        tracing::info!("shutting down");
        Ok(())
    }

    async fn run_single_call(&self, args: &McpCallArgs) -> i32 {
        let Some(kind) = ToolKind::from_name(&args.tool) else {
            print_cli_error(
                &format!("Unknown tool: {}", args.tool),
                "Available tools: getProductSearchTexts, getProductOrders",
            );
            return 1;
        };
        let arguments = match read_call_arguments(args).await {
            Ok(arguments) => arguments,
            Err(message) => {
                print_cli_error(&message, "Provide a JSON object via --data or --data-file");
                return 1;
            }
        };

        let result = self.call_tool(kind, &arguments).await;
        println!("{}", result.text);
        if result.is_error { 2 } else { 0 }
    }

    async fn handle_incoming_message(&self, incoming: Value) -> Option<Value> {
        if let Some(batch) = incoming.as_array() {
            if batch.is_empty() {
                return Some(error_response(
                    Value::Null,
                    RpcError::invalid_request("Batch request must not be empty"),
                ));
            }
            let mut responses = Vec::new();
            for item in batch {
                if let Some(response) = self.handle_single_message(item.clone()).await {
                    responses.push(response);
                }
            }
            return (!responses.is_empty()).then_some(Value::Array(responses));
        }

        self.handle_single_message(incoming).await
    }

    async fn handle_single_message(&self, incoming: Value) -> Option<Value> {
        let Some(obj) = incoming.as_object() else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };

        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            let id = obj.get("id").cloned().unwrap_or(Value::Null);
            return Some(error_response(
                id,
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        let Some(method) = obj.get("method").and_then(Value::as_str) else {
            // Most likely a client response; server does not issue outbound requests.
            return None;
        };

        let params = obj.get("params").cloned().unwrap_or(Value::Null);
        if let Some(id) = obj.get("id").cloned() {
            let result = self.handle_request(method, params).await;
            Some(match result {
                Ok(payload) => success_response(id, payload),
                Err(err) => error_response(id, err),
            })
        } else {
            self.handle_notification(method);
            None
        }
    }

    fn handle_notification(&self, method: &str) {
        if matches!(
            method,
            "notifications/initialized" | "notifications/cancelled"
        ) {
            return;
        }
        tracing::debug!(method, "ignoring unknown notification");
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(self.initialize_payload(&params)),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.tools_list_payload()),
            "tools/call" => self.handle_tools_call(params).await,
            "resources/list" => Ok(json!({ "resources": [] })),
            "prompts/list" => Ok(json!({ "prompts": [] })),
            "logging/setLevel" => Ok(json!({})),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    fn initialize_payload(&self, params: &Value) -> Value {
        let requested = params.get("protocolVersion").and_then(Value::as_str);
        let protocol_version = requested
            .filter(|version| MCP_PROTOCOL_VERSIONS.contains(version))
            .unwrap_or(MCP_PROTOCOL_VERSIONS[0]);
        json!({
            "protocolVersion": protocol_version,
            "capabilities": {
                "tools": {
                    "listChanged": false
                },
                "logging": {}
            },
            "serverInfo": {
                "name": MCP_SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    fn tools_list_payload(&self) -> Value {
        let tools: Vec<Value> = tool_definitions()
            .into_iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "inputSchema": tool.input_schema,
                })
            })
            .collect();
        json!({ "tools": tools })
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;

        let kind = ToolKind::from_name(name)
            .ok_or_else(|| RpcError::invalid_params(format!("Unknown tool: {name}")))?;

        let args = match params.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::Null) | None => Map::new(),
            Some(_) => {
                return Err(RpcError::invalid_params(
                    "tools/call 'arguments' must be an object",
                ));
            }
        };

        Ok(self.call_tool(kind, &Value::Object(args)).await.to_value())
    }

    /// Runs one tool invocation. Every failure, including a missing token,
    /// comes back as an error result rather than a protocol error.
    pub async fn call_tool(&self, kind: ToolKind, args: &Value) -> ToolResult {
        tracing::info!(tool = kind.name(), "tool call");
        let Some(token) = self.tokens.resolve() else {
            tracing::warn!(tool = kind.name(), "no access token configured");
            return ToolResult::error_text(MISSING_TOKEN_MESSAGE);
        };
        tools::invoke(kind, args, &self.client, &token).await
    }
}

#[derive(Debug)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: -32700,
            message: message.into(),
        }
    }

    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
        }
    }
}

fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn error_response(id: Value, error: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": error.code,
            "message": error.message
        }
    })
}

async fn read_call_arguments(args: &McpCallArgs) -> Result<Value, String> {
    let raw = if let Some(data) = &args.data {
        data.clone()
    } else if let Some(path) = &args.data_file {
        if path == "-" {
            let mut raw = String::new();
            io::stdin()
                .read_to_string(&mut raw)
                .await
                .map_err(|e| format!("Failed to read stdin: {e}"))?;
            raw
        } else {
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| format!("Failed to read '{path}': {e}"))?
        }
    } else {
        return Err("Tool arguments are required".to_string());
    };

    let value: Value =
        serde_json::from_str(&raw).map_err(|e| format!("Invalid JSON arguments: {e}"))?;
    if !value.is_object() {
        return Err("Tool arguments must be a JSON object".to_string());
    }
    Ok(value)
}

fn print_cli_error(message: &str, docs_hint: &str) {
    let payload = json!({
        "error": "cli_error",
        "message": message,
        "docs_hint": docs_hint,
    });
    eprintln!("{}", to_pretty_json(&payload));
}

fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
