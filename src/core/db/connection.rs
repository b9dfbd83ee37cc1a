//! Connection Management Module
//!
//! This module defines the provider seam the runner acquires connections
//! through, and the SQLite implementation of it.

use crate::config::DatabaseConfig;
use crate::core::{DocketError, Result};
use rusqlite::{Connection, OpenFlags};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default time a connection waits on a locked database before failing.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Hook run against every freshly opened connection.
pub type ConnectionInitializer = Arc<dyn Fn(&Connection) -> rusqlite::Result<()> + Send + Sync>;

/// A single-use database session.
///
/// A handle is created unopened, opened once, handed to exactly one unit of
/// work and closed once. Implementations must make `close` a no-op when the
/// handle was never opened or is already closed.
pub trait ConnectionHandle {
    /// Opens the underlying session.
    fn open(&mut self) -> Result<()>;

    /// Returns the open connection, or `DocketError::Connection` when the
    /// handle is not open.
    fn connection(&self) -> Result<&Connection>;

    /// Closes the underlying session.
    fn close(&mut self) -> Result<()>;
}

/// Produces independent, unopened connection handles.
///
/// Factories are shared between threads; every call to `create` must return a
/// handle owned exclusively by its caller.
pub trait ConnectionFactory: Send + Sync {
    type Handle: ConnectionHandle;

    fn create(&self) -> Result<Self::Handle>;
}

/// Connection factory for a SQLite database file.
#[derive(Clone)]
pub struct SqliteConnectionFactory {
    path: PathBuf,
    flags: OpenFlags,
    busy_timeout: Duration,
    foreign_keys: bool,
    initializers: Vec<ConnectionInitializer>,
}

impl SqliteConnectionFactory {
    /// Creates a read-write factory for the database at `path`, creating the
    /// file on first open.
    ///
    /// `":memory:"` is accepted, but every handle then sees its own empty
    /// database.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        SqliteConnectionFactory {
            path: path.as_ref().to_path_buf(),
            flags: OpenFlags::default(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            foreign_keys: true,
            initializers: Vec::new(),
        }
    }

    /// Builds a factory from the `[database]` configuration section.
    pub fn from_config(config: &DatabaseConfig) -> Self {
        SqliteConnectionFactory::new(&config.path)
            .read_only(config.read_only)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .foreign_keys(config.foreign_keys)
    }

    /// Opens handles read-only instead of read-write-create.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.flags = if read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
        } else {
            OpenFlags::default()
        };
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Registers a hook run after every open, before the unit of work sees
    /// the connection. Typically used to register application SQL functions.
    pub fn with_initializer<I>(mut self, initializer: I) -> Self
    where
        I: Fn(&Connection) -> rusqlite::Result<()> + Send + Sync + 'static,
    {
        self.initializers.push(Arc::new(initializer));
        self
    }

    /// Path of the database this factory opens.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for SqliteConnectionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnectionFactory")
            .field("path", &self.path)
            .field("flags", &self.flags)
            .field("busy_timeout", &self.busy_timeout)
            .field("foreign_keys", &self.foreign_keys)
            .field("initializers", &self.initializers.len())
            .finish()
    }
}

impl ConnectionFactory for SqliteConnectionFactory {
    type Handle = SqliteHandle;

    fn create(&self) -> Result<SqliteHandle> {
        Ok(SqliteHandle {
            factory: self.clone(),
            connection: None,
        })
    }
}

/// SQLite session handle produced by `SqliteConnectionFactory`.
pub struct SqliteHandle {
    factory: SqliteConnectionFactory,
    connection: Option<Connection>,
}

impl SqliteHandle {
    /// Checks if the handle currently holds an open connection
    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }
}

impl ConnectionHandle for SqliteHandle {
    fn open(&mut self) -> Result<()> {
        if self.connection.is_some() {
            return Err(DocketError::Connection("connection handle is already open".to_string()));
        }

        let factory = &self.factory;
        let conn = Connection::open_with_flags(&factory.path, factory.flags)?;
        conn.busy_timeout(factory.busy_timeout)?;
        // The bundled build enables foreign keys by default, so set it both ways
        conn.execute_batch(if factory.foreign_keys {
            "PRAGMA foreign_keys = ON;"
        } else {
            "PRAGMA foreign_keys = OFF;"
        })?;
        for initializer in &factory.initializers {
            initializer(&conn)?;
        }

        debug!("Opened connection to {:?}", factory.path);
        self.connection = Some(conn);
        Ok(())
    }

    fn connection(&self) -> Result<&Connection> {
        self.connection
            .as_ref()
            .ok_or_else(|| DocketError::Connection("connection handle is not open".to_string()))
    }

    fn close(&mut self) -> Result<()> {
        match self.connection.take() {
            Some(conn) => {
                conn.close().map_err(|(_conn, e)| DocketError::Database(e))?;
                debug!("Closed connection to {:?}", self.factory.path);
                Ok(())
            }
            None => Ok(()),
        }
    }
}
