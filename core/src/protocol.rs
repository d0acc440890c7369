//! MCP JSON-RPC methods: `initialize`, `ping`, `tools/list`, `tools/call`.
//!
//! Transport-agnostic: the gateway hands in raw request bodies and writes
//! back whatever comes out. Requests without an `id` are notifications and
//! get no response.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::dispatch::{Dispatcher, ToolRequest};

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Standard JSON-RPC error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    ParseError = -32700,
    InvalidRequest = -32600,
    MethodNotFound = -32601,
    InvalidParams = -32602,
    InternalError = -32603,
}

impl ErrorCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// MCP JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpRequest {
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

fn default_version() -> String {
    JSONRPC_VERSION.to_string()
}

impl McpRequest {
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }
}

/// MCP JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl McpError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(ErrorCode::MethodNotFound, format!("Method not found: {method}"))
    }
}

impl McpResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Value>, error: McpError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

pub struct McpHandler {
    dispatcher: Arc<Dispatcher>,
    server_name: String,
    server_version: String,
}

impl McpHandler {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            server_name: "poem-generator".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn with_server_info(mut self, name: &str, version: &str) -> Self {
        self.server_name = name.to_string();
        self.server_version = version.to_string();
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Handles a raw request body.
    pub async fn handle_bytes(&self, body: &[u8]) -> Option<McpResponse> {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => self.handle_value(value).await,
            Err(e) => Some(McpResponse::error(
                None,
                McpError::new(ErrorCode::ParseError, format!("Parse error: {e}")),
            )),
        }
    }

    pub async fn handle_value(&self, value: Value) -> Option<McpResponse> {
        let id = value.get("id").cloned();
        match serde_json::from_value::<McpRequest>(value) {
            Ok(request) => self.handle(request).await,
            Err(e) => Some(McpResponse::error(
                id,
                McpError::new(ErrorCode::InvalidRequest, format!("Invalid request: {e}")),
            )),
        }
    }

    pub async fn handle(&self, request: McpRequest) -> Option<McpResponse> {
        let Some(id) = request.id else {
            debug!("Notification received: {}", request.method);
            return None;
        };
        let id = Some(id);

        let response = match request.method.as_str() {
            "initialize" => self.initialize(id),
            "ping" => McpResponse::success(id, json!({})),
            "tools/list" | "listTools" => self.list_tools(id),
            "tools/call" | "callTool" => self.call_tool(id, &request.params).await,
            other => McpResponse::error(id, McpError::method_not_found(other)),
        };
        Some(response)
    }

    fn initialize(&self, id: Option<Value>) -> McpResponse {
        McpResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": { "listChanged": false }
                },
                "serverInfo": {
                    "name": self.server_name,
                    "version": self.server_version
                }
            }),
        )
    }

    fn list_tools(&self, id: Option<Value>) -> McpResponse {
        McpResponse::success(id, json!({ "tools": self.dispatcher.registry().tools() }))
    }

    async fn call_tool(&self, id: Option<Value>, params: &Value) -> McpResponse {
        let request = match ToolRequest::from_params(params) {
            Ok(request) => request,
            Err(msg) => {
                return McpResponse::error(id, McpError::new(ErrorCode::InvalidParams, msg))
            }
        };

        debug!("Tool call: {}", request.tool_name);
        let result = self.dispatcher.dispatch(&request).await;
        match serde_json::to_value(&result) {
            Ok(value) => McpResponse::success(id, value),
            Err(e) => {
                error!("Failed to encode tool result: {e}");
                McpResponse::error(id, McpError::new(ErrorCode::InternalError, e.to_string()))
            }
        }
    }
}
