//! Core search services for difydb-mcp.
//!
//! This crate owns the keyword search control plane over the Dify database,
//! the row normalizer and workflow graph matcher it relies on, the query
//! executor implementations (`PostgreSQL` and in-memory), and the connection
//! lifecycle manager.

pub mod control;
pub mod matcher;
pub mod normalize;
pub mod services;
pub mod store;
