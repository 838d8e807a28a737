//! HTTP Transport layer for the Model Context Protocol
//!
//! Routes the configurable MCP endpoint (default `/mcp`) and the liveness checks.

pub mod handlers;
