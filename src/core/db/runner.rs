//! Command Runner Module
//!
//! Scoped execution over connections produced by a `ConnectionFactory`, and
//! the query helpers built as units of work on top of it.

use super::connection::{ConnectionFactory, ConnectionHandle, SqliteConnectionFactory};
use super::query::{Command, Deserializer, TypedRows};
use super::schema::NamingConvention;
use crate::config::Config;
use crate::core::Result;
use rusqlite::types::{FromSql, Type, ValueRef};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// An opened handle that is closed when it goes out of scope.
///
/// `close` reports the close result; dropping without `close` (an error
/// return or a panic in the unit of work) closes quietly and logs failures.
struct OpenConnection<H: ConnectionHandle> {
    handle: H,
    closed: bool,
}

impl<H: ConnectionHandle> OpenConnection<H> {
    fn open(mut handle: H) -> Result<Self> {
        handle.open()?;
        Ok(OpenConnection {
            handle,
            closed: false,
        })
    }

    fn connection(&self) -> Result<&Connection> {
        self.handle.connection()
    }

    fn close(mut self) -> Result<()> {
        self.closed = true;
        self.handle.close()
    }
}

impl<H: ConnectionHandle> Drop for OpenConnection<H> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.handle.close() {
            warn!("Failed to close connection after unit of work failure: {}", e);
        }
    }
}

/// Executes units of work against connections it acquires and releases itself.
///
/// Every call creates one handle, opens it, runs one unit of work and closes
/// the handle before returning, on every exit path. No state is shared
/// between calls, so a runner can be used from many threads at once when its
/// factory allows it.
#[derive(Debug, Clone)]
pub struct CommandRunner<F> {
    factory: F,
    naming: NamingConvention,
}

impl CommandRunner<SqliteConnectionFactory> {
    /// Builds a runner over the configured SQLite database and naming convention.
    pub fn from_config(config: &Config) -> Self {
        CommandRunner::new(SqliteConnectionFactory::from_config(&config.database))
            .with_naming(config.schema.clone())
    }
}

impl<F: ConnectionFactory> CommandRunner<F> {
    pub fn new(factory: F) -> Self {
        CommandRunner {
            factory,
            naming: NamingConvention::default(),
        }
    }

    /// Replaces the naming convention used to recognise managed objects.
    ///
    /// The convention is taken as-is; an empty prefix makes every table
    /// managed. Use `NamingConvention::validate` to reject it.
    pub fn with_naming(mut self, naming: NamingConvention) -> Self {
        self.naming = naming;
        self
    }

    pub fn naming(&self) -> &NamingConvention {
        &self.naming
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Runs a unit of work that produces no value.
    pub fn run<W>(&self, work: W) -> Result<()>
    where
        W: FnOnce(&Connection) -> Result<()>,
    {
        self.run_with(work)
    }

    /// Runs a unit of work against a freshly opened connection and returns its
    /// value.
    ///
    /// The connection is closed before this returns. Errors from the unit of
    /// work are returned unchanged; a close failure is returned only when the
    /// unit of work itself succeeded.
    pub fn run_with<T, W>(&self, work: W) -> Result<T>
    where
        W: FnOnce(&Connection) -> Result<T>,
    {
        let handle = self.factory.create()?;
        let scope = OpenConnection::open(handle)?;

        match scope.connection().and_then(work) {
            Ok(value) => {
                scope.close()?;
                Ok(value)
            }
            Err(e) => {
                drop(scope);
                Err(e)
            }
        }
    }

    /// Executes SQL text as a non-query and returns the affected row count.
    pub fn execute(&self, sql: &str) -> Result<usize> {
        self.execute_command(&Command::new(sql))
    }

    /// Executes a parameterized non-query and returns the affected row count.
    ///
    /// Statements that produce rows fail with the engine's
    /// `ExecuteReturnedResults` error.
    pub fn execute_command(&self, command: &Command) -> Result<usize> {
        debug!("Executing non-query: {}", command.sql());
        self.run_with(|conn| {
            let mut stmt = conn.prepare(command.sql())?;
            Ok(stmt.execute(command.params())?)
        })
    }

    /// Returns the first cell of the first row converted to `T`.
    ///
    /// Any further rows and columns are ignored. An empty result converts like
    /// a NULL cell, so `Option<T>` yields `None` and other types fail with a
    /// conversion error.
    pub fn query_scalar<T: FromSql>(&self, sql: &str) -> Result<T> {
        self.query_scalar_command(&Command::new(sql))
    }

    pub fn query_scalar_command<T: FromSql>(&self, command: &Command) -> Result<T> {
        debug!("Executing scalar query: {}", command.sql());
        self.run_with(|conn| {
            let mut stmt = conn.prepare(command.sql())?;
            let mut rows = stmt.query(command.params())?;
            let value = match rows.next()? {
                Some(row) => row.get::<_, T>(0)?,
                None => T::column_result(ValueRef::Null).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(0, Type::Null, Box::new(e))
                })?,
            };
            Ok(value)
        })
    }

    /// Reads column 0 of every row as text, in cursor order.
    ///
    /// The statement is finalized before the rows are returned. A non-text
    /// column 0 fails with a conversion error.
    pub fn query_json(&self, command: &Command) -> Result<Vec<String>> {
        debug!("Executing text-row query: {}", command.sql());
        self.run_with(|conn| read_text_column(conn, command))
    }

    /// Reads the text rows of `command` and deserializes them on demand.
    ///
    /// Query errors are returned immediately. Deserialization errors surface
    /// only when the affected element is consumed.
    pub fn query<'d, T, D>(
        &self,
        command: &Command,
        deserializer: &'d D,
    ) -> Result<TypedRows<'d, T, D>>
    where
        T: DeserializeOwned,
        D: Deserializer,
    {
        let rows = self.query_json(command)?;
        Ok(TypedRows::new(rows, deserializer))
    }
}

/// Collects column 0 of every row produced by `command` as text.
pub(crate) fn read_text_column(conn: &Connection, command: &Command) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(command.sql())?;
    let rows = stmt.query_map(command.params(), |row| row.get::<_, String>(0))?;
    let values = rows.collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(values)
}
