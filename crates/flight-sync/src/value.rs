//! Raw column values and source rows.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;

/// A single raw value read from the source database.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// Variant name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "bit",
            SqlValue::I64(_) => "integer",
            SqlValue::F64(_) => "float",
            SqlValue::String(_) => "text",
            SqlValue::Date(_) => "date",
            SqlValue::DateTime(_) => "datetime",
            SqlValue::Bytes(_) => "binary",
        }
    }
}

/// One row of the source extraction query.
///
/// Column lookups are case-insensitive; names are folded to lowercase on
/// insert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRow {
    columns: HashMap<String, SqlValue>,
}

impl SourceRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: SqlValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: SqlValue) {
        self.columns.insert(name.to_lowercase(), value);
    }

    /// Value of a column, `None` when the column is not part of the row.
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns.get(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// One row of the crew aggregate query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrewCountRow {
    pub flight_date: NaiveDate,
    pub flight_code: String,
    pub origin: String,
    pub crew_count: i64,
}
