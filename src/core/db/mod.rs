//! Database Module
//!
//! This module provides connection-scoped command execution for docket,
//! organized into focused submodules.
//!
//! ## Architecture
//!
//! - **Connection Management** (`connection.rs`): the provider seam and the SQLite handle
//! - **Command Runner** (`runner.rs`): scoped execution and the query helpers built on it
//! - **Query Types** (`query.rs`): commands, deserializers and typed row sequences
//! - **Schema Introspection** (`schema.rs`): managed table and routine enumeration
//!
//! ## Error Handling
//!
//! All database operations use the standardized `DocketError` type. Engine
//! errors pass through unchanged inside `DocketError::Database`.
pub mod connection;
pub mod query;
pub mod runner;
pub mod schema;

pub use connection::*;
pub use query::*;
pub use runner::*;
pub use schema::*;
