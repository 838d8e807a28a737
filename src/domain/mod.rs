//! Weather tool registry exposed over the MCP protocol

pub mod tools;
