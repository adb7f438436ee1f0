//! This module provides the record table engine used by the server.
//! The only implementation is [`CsvTable`], an in-memory table mirrored into a comma delimited
//! text file.
use std::sync::Arc;

use crate::schema::Schema;
use crate::Result;

/// A trait for the functionality of a table holding records of a single kind
pub trait TableEngine: Clone + Send + Sync + 'static {
    /// the record kind this table holds
    fn kind(&self) -> &str;

    /// the field layout of the records in this table
    fn schema(&self) -> &Arc<Schema>;

    /// inserts a new record with the given `identity` and default values for every other field
    ///
    /// # Errors
    ///
    /// Returns `TableError::DuplicateIdentity` if the identity is already present.
    fn insert(&self, identity: &str) -> Result<()>;

    /// Gets values of the record with the given `identity`.
    ///
    /// - a single field name equal to the kind name returns every non-identity field as
    ///   `name:value` pairs, joined by commas
    /// - a single field name returns that field's value
    /// - several field names return their values, joined by commas, in the requested order
    ///
    /// # Errors
    ///
    /// Returns `TableError::NotFound` or `TableError::UnknownField`.
    fn get(&self, identity: &str, fields: &[&str]) -> Result<String>;

    /// Gets the value of `field` for every record, in row order
    fn get_all(&self, field: &str) -> Result<Vec<String>>;

    /// sets `field` of the record with the given `identity` to `value`, then persists the table
    fn update(&self, identity: &str, field: &str, value: &str) -> Result<()>;

    /// Removes the record with the given `identity`, then persists the table
    ///
    /// # Errors
    ///
    /// Returns `TableError::NotFound` if the given `identity` is not found.
    fn delete(&self, identity: &str) -> Result<()>;

    /// returns true if a record with the given `identity` is present
    fn contains(&self, identity: &str) -> bool;

    /// number of records in the table
    fn len(&self) -> usize;

    /// true if the table holds no records
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

mod csv;

pub use self::csv::CsvTable;
