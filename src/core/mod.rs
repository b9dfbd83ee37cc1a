//! Core Module for Docket
//!
//! This module contains the connection lifecycle, the command runner and the
//! query helpers layered on top of it, plus the shared error type.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{DocketError, Result};
