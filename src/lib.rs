// Core infrastructure modules
pub mod core;

pub mod config;

#[cfg(test)]
mod test_utils;

pub use crate::config::Config;
pub use crate::core::db::{
    Command, CommandRunner, ConnectionFactory, ConnectionHandle, Deserializer, JsonDeserializer,
    NamingConvention, SqliteConnectionFactory, SqliteHandle, TypedRows,
};
pub use crate::core::{DocketError, Result};
