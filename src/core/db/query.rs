//! Query Types Module
//!
//! Commands submitted to the runner, the deserializer seam used by typed
//! queries, and the lazy sequence that applies it.

use crate::core::Result;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, ParamsFromIter};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::vec;

/// SQL text plus positional parameters, bound to one connection per execution.
///
/// The text is passed to the engine as-is; quoting and injection safety are
/// the caller's responsibility.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    sql: String,
    params: Vec<Value>,
}

impl Command {
    pub fn new(sql: impl Into<String>) -> Self {
        Command {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Appends the next positional parameter (`?1`, `?2`, ...).
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameters(&self) -> &[Value] {
        &self.params
    }

    pub(crate) fn params(&self) -> ParamsFromIter<std::slice::Iter<'_, Value>> {
        params_from_iter(self.params.iter())
    }
}

impl From<&str> for Command {
    fn from(sql: &str) -> Self {
        Command::new(sql)
    }
}

impl From<String> for Command {
    fn from(sql: String) -> Self {
        Command::new(sql)
    }
}

/// Converts a JSON text payload into a typed value.
pub trait Deserializer {
    fn from_json<T: DeserializeOwned>(&self, json: &str) -> Result<T>;
}

/// `serde_json` backed deserializer.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDeserializer;

impl Deserializer for JsonDeserializer {
    fn from_json<T: DeserializeOwned>(&self, json: &str) -> Result<T> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Lazily deserialized documents over an already materialized set of rows.
///
/// Each element is parsed only when it is requested. A malformed row yields an
/// error at its own position and does not affect the rows after it.
pub struct TypedRows<'d, T, D> {
    rows: vec::IntoIter<String>,
    deserializer: &'d D,
    _marker: PhantomData<fn() -> T>,
}

impl<'d, T, D> TypedRows<'d, T, D>
where
    T: DeserializeOwned,
    D: Deserializer,
{
    pub fn new(rows: Vec<String>, deserializer: &'d D) -> Self {
        TypedRows {
            rows: rows.into_iter(),
            deserializer,
            _marker: PhantomData,
        }
    }
}

impl<T, D> Iterator for TypedRows<'_, T, D>
where
    T: DeserializeOwned,
    D: Deserializer,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows
            .next()
            .map(|json| self.deserializer.from_json(&json))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl<T, D> ExactSizeIterator for TypedRows<'_, T, D>
where
    T: DeserializeOwned,
    D: Deserializer,
{
}

/// Formats a SQLite value for display
pub fn format_value(value: ValueRef) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).to_string(),
        ValueRef::Blob(b) => format!("<BLOB: {} bytes>", b.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DocketError;
    use serde::Deserialize;
    use std::cell::Cell;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        name: String,
    }

    /// Counts how many payloads were actually parsed.
    struct CountingDeserializer {
        calls: Cell<usize>,
    }

    impl Deserializer for CountingDeserializer {
        fn from_json<T: DeserializeOwned>(&self, json: &str) -> Result<T> {
            self.calls.set(self.calls.get() + 1);
            JsonDeserializer.from_json(json)
        }
    }

    #[test]
    fn test_command_binding() {
        let command = Command::new("SELECT data FROM mt_doc_user WHERE id = ?1 AND name = ?2")
            .bind(7i64)
            .bind("alice".to_string());

        assert_eq!(command.sql(), "SELECT data FROM mt_doc_user WHERE id = ?1 AND name = ?2");
        assert_eq!(
            command.parameters(),
            &[Value::Integer(7), Value::Text("alice".to_string())]
        );
        assert_eq!(Command::from("SELECT 1").parameters().len(), 0);
    }

    #[test]
    fn test_typed_rows_are_lazy() {
        let deserializer = CountingDeserializer { calls: Cell::new(0) };
        let rows = vec![
            r#"{"name":"a"}"#.to_string(),
            r#"{"name":"b"}"#.to_string(),
        ];

        let mut users: TypedRows<User, _> = TypedRows::new(rows, &deserializer);
        assert_eq!(deserializer.calls.get(), 0);
        assert_eq!(users.len(), 2);

        let first = users.next().unwrap().unwrap();
        assert_eq!(first.name, "a");
        assert_eq!(deserializer.calls.get(), 1);
    }

    #[test]
    fn test_malformed_row_does_not_poison_sequence() {
        let rows = vec![
            r#"{"name":"a"}"#.to_string(),
            "{ not json".to_string(),
            r#"{"name":"c"}"#.to_string(),
        ];
        let mut users: TypedRows<User, _> = TypedRows::new(rows, &JsonDeserializer);

        assert_eq!(users.next().unwrap().unwrap().name, "a");
        assert!(matches!(users.next(), Some(Err(DocketError::Json(_)))));
        assert_eq!(users.next().unwrap().unwrap().name, "c");
        assert!(users.next().is_none());
    }

    #[test]
    fn test_shape_mismatch_is_json_error() {
        let rows = vec![r#"{"title":"no name"}"#.to_string()];
        let mut users: TypedRows<User, _> = TypedRows::new(rows, &JsonDeserializer);
        assert!(matches!(users.next(), Some(Err(DocketError::Json(_)))));
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(ValueRef::Null), "NULL");
        assert_eq!(format_value(ValueRef::Integer(3)), "3");
        assert_eq!(format_value(ValueRef::Text(b"x")), "x");
        assert_eq!(format_value(ValueRef::Blob(b"Hello")), "<BLOB: 5 bytes>");
    }
}
