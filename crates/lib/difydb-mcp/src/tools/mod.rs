//! MCP tool modules.

pub mod search;
