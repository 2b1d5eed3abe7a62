//! MCP (Model Context Protocol) server
//!
//! Exposes the knowledge base as four tools over JSON-RPC on stdio.

pub mod dispatcher;
pub mod error;
mod handlers;
pub mod protocol;
pub mod server;
pub mod tools;

pub use dispatcher::Dispatcher;
pub use server::McpServer;
