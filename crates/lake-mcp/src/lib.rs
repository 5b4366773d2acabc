//! MCP Server for the content lake
//!
//! This crate exposes document and release management over the Model Context
//! Protocol, so agents can read, edit, version and publish content.
//!
//! # Architecture
//!
//! ```text
//! [ MCP Client ]
//!        | (JSON-RPC over stdio)
//!        v
//! [ lake-mcp (tools, session gate) ]
//!        |
//!        v
//! [ lake-core::Orchestrator ]
//!        |
//!        v
//! [ lake-store::HttpStore ] --> content store HTTP API
//! ```
//!
//! Every tool except `get_initial_context` is refused until
//! `get_initial_context` has run once on the same server.

pub mod error;
pub mod handlers;
pub mod protocol;
pub mod server;
pub mod session;
pub mod tools;

pub use error::{Error, Result};
pub use handlers::ProjectInfo;
pub use server::LakeMcpServer;
pub use session::Session;
pub use tools::{ToolContent, ToolDefinition, ToolResult, get_tool_definitions};
