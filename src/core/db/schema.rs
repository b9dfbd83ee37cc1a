//! Schema Introspection Module
//!
//! Enumerates the database objects docket manages. Managed objects are
//! recognised purely by naming convention: a configured prefix marks managed
//! tables, and a marker substring marks document-storage tables among them.
//! This is a heuristic, not a registry lookup. Objects that do not follow the
//! convention are left out silently.

use super::connection::ConnectionFactory;
use super::query::Command;
use super::runner::{read_text_column, CommandRunner};
use crate::core::{DocketError, Result};
use serde::Deserialize;
use tracing::debug;

/// Prefix carried by every table docket manages.
pub const DEFAULT_MANAGED_PREFIX: &str = "mt_";

/// Substring carried by managed tables that store documents.
pub const DEFAULT_DOCUMENT_MARKER: &str = "_doc_";

const TABLE_NAMES_SQL: &str = "SELECT name FROM sqlite_master WHERE type = 'table'";

// SQLite keeps no routine catalog of its own. Builtin functions are reported
// under the `system` schema and triggers are listed as trigger routines, so
// both are dropped by the same filter a routine catalog would apply.
const FUNCTION_NAMES_SQL: &str = "
SELECT DISTINCT routine_name
FROM (
    SELECT name AS routine_name,
           CASE WHEN builtin THEN 'system' ELSE 'main' END AS routine_schema,
           type AS routine_type
    FROM pragma_function_list
    UNION ALL
    SELECT name, 'main', 'trigger'
    FROM sqlite_master
    WHERE type = 'trigger'
)
WHERE routine_schema != 'system'
  AND routine_type != 'trigger'
ORDER BY routine_name
";

/// Naming convention used to classify schema objects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NamingConvention {
    pub managed_prefix: String,
    pub document_marker: String,
}

impl Default for NamingConvention {
    fn default() -> Self {
        NamingConvention {
            managed_prefix: DEFAULT_MANAGED_PREFIX.to_string(),
            document_marker: DEFAULT_DOCUMENT_MARKER.to_string(),
        }
    }
}

impl NamingConvention {
    /// Builds a convention from a prefix and a marker.
    ///
    /// An empty prefix matches every table; `validate` rejects it, and the
    /// configuration loader calls `validate`.
    pub fn new(managed_prefix: impl Into<String>, document_marker: impl Into<String>) -> Self {
        NamingConvention {
            managed_prefix: managed_prefix.into(),
            document_marker: document_marker.into(),
        }
    }

    /// Rejects an empty managed prefix.
    pub fn validate(&self) -> Result<()> {
        if self.managed_prefix.is_empty() {
            return Err(DocketError::Config(
                "schema.managed_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_managed(&self, name: &str) -> bool {
        name.starts_with(&self.managed_prefix)
    }

    pub fn is_document_table(&self, name: &str) -> bool {
        self.is_managed(name) && name.contains(&self.document_marker)
    }

    /// Keeps the managed names, preserving their order.
    pub fn managed<I>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        names.into_iter().filter(|n| self.is_managed(n)).collect()
    }

    /// Keeps the document table names, preserving their order.
    pub fn document_tables<I>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        names.into_iter().filter(|n| self.is_document_table(n)).collect()
    }
}

impl<F: ConnectionFactory> CommandRunner<F> {
    /// Names of managed tables, in catalog order.
    pub fn schema_table_names(&self) -> Result<Vec<String>> {
        let names = self.run_with(|conn| read_text_column(conn, &Command::new(TABLE_NAMES_SQL)))?;
        let managed = self.naming().managed(names);
        debug!("Found {} managed tables", managed.len());
        Ok(managed)
    }

    /// Names of managed tables that store documents.
    pub fn document_tables(&self) -> Result<Vec<String>> {
        let tables = self.schema_table_names()?;
        Ok(self.naming().document_tables(tables))
    }

    /// Names of user-defined routines, excluding system routines and triggers.
    ///
    /// Routines are not filtered by the managed prefix. Overloads of one name
    /// are collapsed into a single entry and names come back sorted.
    pub fn schema_function_names(&self) -> Result<Vec<String>> {
        self.run_with(|conn| read_text_column(conn, &Command::new(FUNCTION_NAMES_SQL)))
    }
}
