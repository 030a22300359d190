//! JSON-RPC-over-HTTP MCP client.
//!
//! One instance per (endpoint, token) pair; every public operation runs the
//! `initialize` handshake first because the remote may require it before
//! serving `tools/*` calls. Responses arrive either as a single JSON object
//! or as an SSE stream of `data:` lines; both framings are handled here.

use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use crate::mcp::tools;
use crate::mcp::types::{
    JsonRpcRequest, McpDocument, McpTranscript, PROTOCOL_VERSION, is_rpc_message,
    normalize_documents,
};

#[derive(Debug, Error)]
pub enum McpError {
    #[error(
        "MCP endpoint rejected the request (401): sign in with the provider via OAuth, or set PROJECTOS_GRANOLA_MCP_TOKEN to a static bearer token"
    )]
    AuthenticationRequired,
    #[error(
        "MCP endpoint rejected the request (406): the server requires 'Accept: application/json, text/event-stream'"
    )]
    NotAcceptable,
    #[error("MCP endpoint returned status {status} {status_text}")]
    Transport { status: u16, status_text: String },
    #[error("MCP protocol error: {0}")]
    Protocol(String),
    #[error("no suitable {role} tool found; available tools: {}", available.join(", "))]
    NoSuitableTool {
        role: &'static str,
        available: Vec<String>,
    },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

pub struct McpClient {
    http: reqwest::Client,
    url: String,
    token: Option<String>,
    next_id: AtomicU64,
}

impl McpClient {
    pub fn new(http: reqwest::Client, url: String, token: Option<String>) -> Self {
        Self {
            http,
            url,
            token,
            next_id: AtomicU64::new(1),
        }
    }

    /// POST one JSON-RPC request and decode the matching response message.
    async fn post_message(&self, request: &JsonRpcRequest) -> Result<Value, McpError> {
        let mut builder = self
            .http
            .post(&self.url)
            .header("Accept", "application/json, text/event-stream")
            .json(request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();

        if status.as_u16() == 401 {
            return Err(McpError::AuthenticationRequired);
        }
        if status.as_u16() == 406 {
            return Err(McpError::NotAcceptable);
        }
        if !status.is_success() {
            return Err(McpError::Transport {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        let is_event_stream = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("text/event-stream"));

        let body = response.text().await?;

        if is_event_stream {
            Self::parse_sse_body(&body, request.id)
        } else {
            serde_json::from_str(&body)
                .map_err(|_| McpError::Protocol("invalid JSON response".to_string()))
        }
    }

    /// Scan an SSE body for JSON-RPC messages.
    ///
    /// Prefers the candidate whose id matches the request; some servers do
    /// not echo ids faithfully, so the last syntactically valid candidate is
    /// the best-effort fallback.
    fn parse_sse_body(body: &str, request_id: u64) -> Result<Value, McpError> {
        let mut last_candidate = None;

        for line in body.lines() {
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let Ok(value) = serde_json::from_str::<Value>(data.trim()) else {
                continue;
            };
            if !is_rpc_message(&value) {
                continue;
            }

            if value.get("id").and_then(Value::as_u64) == Some(request_id) {
                return Ok(value);
            }
            last_candidate = Some(value);
        }

        match last_candidate {
            Some(value) => {
                // Signals a non-conforming server; silent reliance on this
                // path could mask protocol drift.
                counter!("mcp_sse_id_fallback_total").increment(1);
                warn!(request_id, "no SSE message matched the request id, using last candidate");
                Ok(value)
            }
            None => Err(McpError::Protocol(
                "no valid JSON-RPC message in SSE response".to_string(),
            )),
        }
    }

    /// Issue a method call and unwrap the JSON-RPC result.
    async fn call(&self, method: &str, params: Value) -> Result<Value, McpError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(id, method, params);
        let message = self.post_message(&request).await?;

        if let Some(error) = message.get("error") {
            let text = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(McpError::Protocol(text));
        }

        Ok(message.get("result").cloned().unwrap_or(Value::Null))
    }

    /// Run the `initialize` handshake, discarding the result.
    ///
    /// Confirms reachability and satisfies servers that refuse `tools/*`
    /// calls before initialization.
    pub async fn ensure_initialized(&self) -> Result<(), McpError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "projectos-integrations",
                "version": env!("CARGO_PKG_VERSION"),
            },
        });
        self.call("initialize", params).await?;
        Ok(())
    }

    /// List the names of the tools the server exposes.
    pub async fn list_tool_names(&self) -> Result<Vec<String>, McpError> {
        let result = self.call("tools/list", json!({})).await?;
        let names = result
            .get("tools")
            .and_then(Value::as_array)
            .map(|tools| {
                tools
                    .iter()
                    .filter_map(|tool| tool.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(names)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, McpError> {
        self.call(
            "tools/call",
            json!({"name": name, "arguments": arguments}),
        )
        .await
    }

    /// List meeting documents via whichever list-like tool the catalog offers.
    pub async fn list_documents(
        &self,
        preferred_tool: Option<&str>,
    ) -> Result<Vec<McpDocument>, McpError> {
        self.ensure_initialized().await?;

        let names = self.list_tool_names().await?;
        let tool = tools::pick_list_tool(&names, preferred_tool)
            .ok_or(McpError::NoSuitableTool {
                role: "meeting-list",
                available: names.clone(),
            })?
            .to_string();

        debug!(tool = %tool, "listing documents via MCP");
        let result = self.call_tool(&tool, tools::list_tool_arguments(&tool)).await?;

        let Some(text) = extract_text_content(&result) else {
            return Ok(Vec::new());
        };

        // Operator tool outputs are heterogeneous; undecodable content is
        // treated as "no documents found" rather than an error.
        match serde_json::from_str::<Value>(&text) {
            Ok(decoded) => Ok(normalize_documents(&decoded)),
            Err(e) => {
                warn!(tool = %tool, error = %e, "list tool returned non-JSON content");
                Ok(Vec::new())
            }
        }
    }

    /// Fetch a single transcript by document id.
    pub async fn get_transcript(&self, document_id: &str) -> Result<McpTranscript, McpError> {
        self.ensure_initialized().await?;

        let names = self.list_tool_names().await?;
        let tool = tools::pick_transcript_tool(&names)
            .ok_or(McpError::NoSuitableTool {
                role: "transcript",
                available: names.clone(),
            })?
            .to_string();

        debug!(tool = %tool, document_id, "fetching transcript via MCP");
        let result = self
            .call_tool(&tool, tools::transcript_tool_arguments(&tool, document_id))
            .await?;

        let text = extract_text_content(&result).ok_or_else(|| {
            McpError::Protocol("transcript response contained no text content block".to_string())
        })?;

        let decoded: Value = serde_json::from_str(&text).map_err(|_| {
            McpError::Protocol("failed to decode transcript content".to_string())
        })?;

        if let Some(error) = decoded.get("error") {
            return Err(McpError::Protocol(format!(
                "transcript tool reported an error: {}",
                error
            )));
        }

        let content = match &decoded {
            Value::String(s) => s.clone(),
            object => object
                .get("content")
                .or_else(|| object.get("transcript"))
                .or_else(|| object.get("text"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    McpError::Protocol("transcript content is missing".to_string())
                })?,
        };

        let title = decoded
            .get("title")
            .or_else(|| decoded.get("name"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("Meeting transcript")
            .to_string();

        Ok(McpTranscript {
            title,
            content,
            created_at: decoded
                .get("created_at")
                .and_then(Value::as_str)
                .map(str::to_string),
            updated_at: decoded
                .get("updated_at")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

impl From<McpError> for crate::error::ApiError {
    fn from(error: McpError) -> Self {
        use crate::error::ApiError;
        use axum::http::StatusCode;
        use serde_json::json;

        match &error {
            McpError::AuthenticationRequired => ApiError::new(
                StatusCode::BAD_REQUEST,
                "PROVIDER_AUTH_REQUIRED",
                error.to_string(),
            ),
            McpError::NoSuitableTool { available, .. } => ApiError::new(
                StatusCode::BAD_GATEWAY,
                "NO_SUITABLE_TOOL",
                error.to_string(),
            )
            .with_details(json!({ "available_tools": available })),
            McpError::NotAcceptable
            | McpError::Transport { .. }
            | McpError::Protocol(_)
            | McpError::Network(_) => ApiError::new(
                StatusCode::BAD_GATEWAY,
                "PROVIDER_ERROR",
                error.to_string(),
            ),
        }
    }
}

/// First content block of type `text` from a `tools/call` result.
fn extract_text_content(result: &Value) -> Option<String> {
    result
        .get("content")
        .and_then(Value::as_array)?
        .iter()
        .find(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .and_then(|block| block.get("text"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
