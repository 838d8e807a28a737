//! Model Context Protocol (MCP) server handling and JSON-RPC implementations
//!
//! Covers JSON-RPC validation, version negotiation, result/error formatting, and routing.

pub mod rpc;
pub mod server;
