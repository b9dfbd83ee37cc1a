//! # Test Utilities Module
//!
//! Fixtures shared by the unit tests:
//! - Temporary file databases, since every runner call opens a new connection
//! - A counting connection factory that records the handle lifecycle

use crate::core::db::{ConnectionFactory, ConnectionHandle, SqliteConnectionFactory, SqliteHandle};
use crate::core::{DocketError, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// A database file in its own temporary directory, removed on drop.
pub struct TestDatabase {
    _dir: TempDir,
    path: PathBuf,
}

impl TestDatabase {
    /// Create an empty database file
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docket_test.db");
        Connection::open(&path).unwrap();
        TestDatabase { _dir: dir, path }
    }

    /// Create a database seeded with the given statements
    pub fn with_schema(sql: &str) -> Self {
        let db = TestDatabase::new();
        Connection::open(&db.path).unwrap().execute_batch(sql).unwrap();
        db
    }

    /// A database path whose parent directory does not exist, so opening fails
    pub fn missing_directory() -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("docket_test.db");
        TestDatabase { _dir: dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Lifecycle counters shared by a `CountingFactory` and its handles.
#[derive(Debug, Default)]
pub struct LifecycleCounts {
    created: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl LifecycleCounts {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Asserts `calls` handles were created, opened and closed.
    pub fn assert_balanced(&self, calls: usize) {
        assert_eq!(self.created(), calls, "handles created");
        assert_eq!(self.opened(), calls, "handles opened");
        assert_eq!(self.closed(), calls, "handles closed");
    }
}

/// Wraps `SqliteConnectionFactory` and counts every create, open and close.
#[derive(Debug, Clone)]
pub struct CountingFactory {
    inner: SqliteConnectionFactory,
    counts: Arc<LifecycleCounts>,
    fail_close: bool,
}

impl CountingFactory {
    pub fn new(path: &Path) -> Self {
        CountingFactory {
            inner: SqliteConnectionFactory::new(path),
            counts: Arc::new(LifecycleCounts::default()),
            fail_close: false,
        }
    }

    /// Handles report a failure from `close` after releasing the connection.
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn counts(&self) -> &LifecycleCounts {
        &self.counts
    }
}

impl ConnectionFactory for CountingFactory {
    type Handle = CountingHandle;

    fn create(&self) -> Result<CountingHandle> {
        self.counts.created.fetch_add(1, Ordering::SeqCst);
        Ok(CountingHandle {
            inner: self.inner.create()?,
            counts: Arc::clone(&self.counts),
            fail_close: self.fail_close,
            open: false,
        })
    }
}

pub struct CountingHandle {
    inner: SqliteHandle,
    counts: Arc<LifecycleCounts>,
    fail_close: bool,
    open: bool,
}

impl ConnectionHandle for CountingHandle {
    fn open(&mut self) -> Result<()> {
        self.inner.open()?;
        self.open = true;
        self.counts.opened.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn connection(&self) -> Result<&Connection> {
        self.inner.connection()
    }

    fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.counts.closed.fetch_add(1, Ordering::SeqCst);
        self.inner.close()?;
        if self.fail_close {
            return Err(DocketError::Connection("injected close failure".to_string()));
        }
        Ok(())
    }
}
