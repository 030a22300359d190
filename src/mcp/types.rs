//! JSON-RPC envelope and document types for the MCP client.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Outgoing JSON-RPC request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// Whether a decoded JSON value looks like a JSON-RPC response message.
pub fn is_rpc_message(value: &Value) -> bool {
    value.is_object() && (value.get("result").is_some() || value.get("error").is_some())
}

/// A meeting document listed by the remote server.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct McpDocument {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// A fetched meeting transcript.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct McpTranscript {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Normalize whatever shape the list tool returned into documents.
///
/// Accepts a bare array or an object wrapping the array under one of the
/// common keys; items use first-present-wins for id and title fields.
/// Items without any id are dropped.
pub fn normalize_documents(value: &Value) -> Vec<McpDocument> {
    let items = if let Some(array) = value.as_array() {
        array.as_slice()
    } else {
        let mut found: &[Value] = &[];
        for key in ["documents", "transcripts", "meetings", "results"] {
            if let Some(array) = value.get(key).and_then(Value::as_array) {
                found = array.as_slice();
                break;
            }
        }
        found
    };

    items
        .iter()
        .filter_map(|item| {
            let id = first_string(item, &["id", "meeting_id", "document_id"])?;
            Some(McpDocument {
                id,
                title: first_string(item, &["title", "name", "subject"]),
                doc_type: first_string(item, &["type"]),
                created_at: first_string(item, &["created_at"]),
                updated_at: first_string(item, &["updated_at"]),
            })
        })
        .collect()
}

fn first_string(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| item.get(key).and_then(Value::as_str))
        .map(str::to_string)
}
