//! MCP tool server
//!
//! Exposes the personal library to agents as two tools, `list_prompts`
//! and `add_prompt`. Transport independent: the SSE and stdio transports
//! both feed it parsed messages.

use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::protocol::*;
use crate::config::{MCP_PROTOCOL_VERSION, MCP_SERVER_NAME};
use crate::gist::models::NewPrompt;
use crate::remote::RemoteLibrary;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddPromptArgs {
    title: String,
    content: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    is_public: bool,
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Clone)]
pub struct ToolServer {
    library: Arc<dyn RemoteLibrary>,
}

impl ToolServer {
    pub fn new(library: Arc<dyn RemoteLibrary>) -> Self {
        Self { library }
    }

    /// Handle one raw line or request body; `None` for notifications
    pub async fn handle_raw(&self, raw: &str) -> Option<Value> {
        match serde_json::from_str::<IncomingMessage>(raw) {
            Ok(message) => self.handle(message).await,
            Err(e) => {
                tracing::warn!("MCP parse error: {}", e);
                let code = if serde_json::from_str::<Value>(raw).is_ok() {
                    INVALID_REQUEST
                } else {
                    PARSE_ERROR
                };
                to_value(JsonRpcError::new(RequestId::Null, code, e.to_string()))
            }
        }
    }

    pub async fn handle(&self, message: IncomingMessage) -> Option<Value> {
        tracing::debug!(method = %message.method, "MCP message");

        let Some(id) = message.id else {
            // Notifications never get a response
            return None;
        };

        let result = match message.method.as_str() {
            "initialize" => Ok(json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": MCP_SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                },
            })),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(tool_definitions()),
            "tools/call" => match message
                .params
                .map(serde_json::from_value::<CallParams>)
                .transpose()
            {
                Ok(Some(params)) => {
                    let result = self.call_tool(&params.name, params.arguments).await;
                    serde_json::to_value(result).map_err(|e| (INVALID_PARAMS, e.to_string()))
                }
                Ok(None) => Err((INVALID_PARAMS, "Missing params".to_string())),
                Err(e) => Err((INVALID_PARAMS, e.to_string())),
            },
            other => Err((METHOD_NOT_FOUND, format!("Method not found: {other}"))),
        };

        match result {
            Ok(value) => to_value(JsonRpcResponse::new(id, value)),
            Err((code, message)) => to_value(JsonRpcError::new(id, code, message)),
        }
    }

    /// Run a tool; failures become `isError` content
    pub async fn call_tool(&self, name: &str, arguments: Option<Value>) -> ToolResult {
        match name {
            "list_prompts" => match self.library.fetch_index().await {
                Ok(index) => {
                    let prompts = index.map(|i| i.prompts).unwrap_or_default();
                    match serde_json::to_string_pretty(&prompts) {
                        Ok(text) => ToolResult::text(text),
                        Err(e) => ToolResult::error(e.to_string()),
                    }
                }
                Err(e) => ToolResult::error(e.to_string()),
            },
            "add_prompt" => {
                let args = match serde_json::from_value::<AddPromptArgs>(
                    arguments.unwrap_or_else(|| json!({})),
                ) {
                    Ok(args) => args,
                    Err(e) => return ToolResult::error(format!("Invalid arguments: {e}")),
                };

                let prompt = NewPrompt {
                    title: args.title,
                    content: args.content,
                    category: args.category,
                    tags: args.tags,
                    collections: Vec::new(),
                    is_public: args.is_public,
                };

                match self.library.create_prompt(prompt).await {
                    Ok(gist_id) => {
                        tracing::info!("MCP add_prompt created {}", gist_id);
                        ToolResult::text(format!("Prompt added successfully! Gist ID: {gist_id}"))
                    }
                    Err(e) => ToolResult::error(e.to_string()),
                }
            }
            other => ToolResult::error(format!("Unknown tool: {other}")),
        }
    }
}

fn to_value<T: serde::Serialize>(message: T) -> Option<Value> {
    match serde_json::to_value(message) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!("Failed to serialize MCP response: {}", e);
            None
        }
    }
}

fn tool_definitions() -> Value {
    json!({
        "tools": [
            {
                "name": "list_prompts",
                "description": "List all prompts in your personal Favored Prompts library",
                "inputSchema": { "type": "object", "properties": {} }
            },
            {
                "name": "add_prompt",
                "description": "Add a new prompt to your Favored Prompts library",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "description": "Title of the prompt" },
                        "content": { "type": "string", "description": "Markdown content of the prompt" },
                        "category": { "type": "string", "description": "Optional category (e.g. CODE, WRITING)" },
                        "tags": { "type": "array", "items": { "type": "string" }, "description": "Optional tags" },
                        "isPublic": { "type": "boolean", "description": "Whether to share with the community (default: false)" }
                    },
                    "required": ["title", "content"]
                }
            }
        ]
    })
}
