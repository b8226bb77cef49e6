//! Storage models and schema helpers for difydb-mcp.
//!
//! This crate defines the row values, query descriptors, workflow graph model,
//! and result envelopes shared by the search core and the MCP surface.

pub mod graph;
pub mod models;
pub mod schema;

pub use models::*;
