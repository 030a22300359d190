//! Minimal MCP (Model Context Protocol) client.
//!
//! Speaks JSON-RPC 2.0 over HTTP POST against a remote MCP endpoint using
//! the `initialize` / `tools/list` / `tools/call` subset, with support for
//! both plain-JSON and Server-Sent-Event response framing. Tool catalogs
//! are operator-defined, so tool selection is a heuristic kept as pure
//! functions in [`tools`].

pub mod client;
pub mod tools;
pub mod types;

pub use client::{McpClient, McpError};
pub use types::{McpDocument, McpTranscript};
