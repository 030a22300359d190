//! # Project OS Integrations
//!
//! Third-party OAuth connection and protocol-bridging service: Granola
//! OAuth2+PKCE with dynamic client registration, Google Calendar OAuth2 with
//! token refresh, and a minimal JSON-RPC/MCP client for meeting transcripts.

pub mod auth;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod handlers;
pub mod mcp;
pub mod models;
pub mod oauth;
pub mod pkce;
pub mod repositories;
pub mod server;
pub mod sweeper;
pub mod telemetry;
pub mod transcript;
pub use migration;
