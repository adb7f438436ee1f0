use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};

use super::TableEngine;
use crate::error::{Result, TableError};
use crate::persist;
use crate::schema::{Schema, Value};

/// The values of one record, aligned with the field order of its [`Schema`]
type Record = Vec<Value>;

/// An in-memory table of records of one kind, mirrored into a comma delimited text file.
///
/// The table keeps two views of the same data:
/// - `rows`, the table as it is written to disk. Row 0 is the header, every other row is one
///   record in insertion order
/// - `records`, maps identities to their typed values. It is ordered by identity, which is what
///   makes identity lookups logarithmic
///
/// Both views are updated under the same write lock, and every mutation rewrites the whole file
/// before the lock is released. Cloning a `CsvTable` is cheap, clones share the same table.
#[derive(Debug, Clone)]
pub struct CsvTable {
    schema: Arc<Schema>,
    path: Arc<PathBuf>,
    data: Arc<RwLock<TableData>>,
}

#[derive(Debug, Default)]
struct TableData {
    rows: Vec<Vec<String>>,
    records: BTreeMap<String, Record>,
}

impl TableData {
    /// position of the row holding `identity`, never the header
    fn row_index(&self, identity: &str) -> Option<usize> {
        self.rows
            .iter()
            .skip(1)
            .position(|row| row.first().map(String::as_str) == Some(identity))
            .map(|i| i + 1)
    }
}

impl CsvTable {
    /// opens the table for `schema` kept in the file at `path`.
    /// If the file does not exist yet it is created, holding just the header row.
    #[instrument(skip(path, schema), fields(kind = schema.kind()))]
    pub fn open(path: impl Into<PathBuf>, schema: Arc<Schema>) -> Result<CsvTable> {
        let path = path.into();
        persist::ensure_file(&path, &schema.header())?;
        let data = load(&path, &schema)?;
        info!(records = data.records.len(), "opened table");

        Ok(CsvTable {
            schema,
            path: Arc::new(path),
            data: Arc::new(RwLock::new(data)),
        })
    }

    /// discards the in-memory table and reads it again from its file
    pub fn load(&self) -> Result<()> {
        let mut data = self.data.write();
        *data = load(&self.path, &self.schema)?;
        debug!(kind = self.kind(), records = data.records.len(), "table reloaded");
        Ok(())
    }

    /// path of the file backing this table
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// a snapshot of the table as it is persisted, header row first
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.data.read().rows.clone()
    }

    fn persist(&self, data: &TableData) -> Result<()> {
        persist::write_all(&self.path, &data.rows).map_err(|e| {
            warn!(kind = self.kind(), "could not persist table: {}", e);
            e
        })
    }
}

impl TableEngine for CsvTable {
    fn kind(&self) -> &str {
        self.schema.kind()
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn insert(&self, identity: &str) -> Result<()> {
        if identity.is_empty() {
            return Err(TableError::InvalidArgument("identity is empty".to_string()));
        }

        let mut data = self.data.write();
        if data.records.contains_key(identity) {
            return Err(TableError::DuplicateIdentity(identity.to_string()));
        }

        let record = self.schema.default_values(identity);
        data.rows.push(record.iter().map(Value::to_string).collect());
        data.records.insert(identity.to_string(), record);
        debug!(kind = self.kind(), identity, "record inserted");

        self.persist(&data)
    }

    fn get(&self, identity: &str, fields: &[&str]) -> Result<String> {
        let data = self.data.read();
        let record = data
            .records
            .get(identity)
            .ok_or_else(|| TableError::NotFound(identity.to_string()))?;

        match fields {
            [] => Ok(String::new()),
            [only] if *only == self.kind() => Ok(self
                .schema
                .fields()
                .iter()
                .zip(record)
                .skip(1)
                .map(|(field, value)| format!("{}:{}", field.name, value))
                .collect::<Vec<_>>()
                .join(",")),
            _ => {
                let values = fields
                    .iter()
                    .map(|name| {
                        self.schema
                            .index_of(name)
                            .map(|i| record[i].to_string())
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(values.join(","))
            }
        }
    }

    fn get_all(&self, field: &str) -> Result<Vec<String>> {
        let index = self.schema.index_of(field)?;
        let data = self.data.read();
        Ok(data
            .rows
            .iter()
            .skip(1)
            .map(|row| row[index].clone())
            .collect())
    }

    fn update(&self, identity: &str, field: &str, value: &str) -> Result<()> {
        let index = self.schema.index_of(field)?;
        if index == 0 {
            return Err(TableError::InvalidArgument(
                "the identity field cannot be updated".to_string(),
            ));
        }
        let value = Value::parse_for(&self.schema.fields()[index], value)?;

        let mut data = self.data.write();
        let row = data
            .row_index(identity)
            .ok_or_else(|| TableError::NotFound(identity.to_string()))?;

        data.rows[row][index] = value.to_string();
        if let Some(record) = data.records.get_mut(identity) {
            record[index] = value;
        }
        debug!(kind = self.kind(), identity, field, "record updated");

        self.persist(&data)
    }

    fn delete(&self, identity: &str) -> Result<()> {
        let mut data = self.data.write();
        if data.records.remove(identity).is_none() {
            return Err(TableError::NotFound(identity.to_string()));
        }
        if let Some(row) = data.row_index(identity) {
            data.rows.remove(row);
        }
        debug!(kind = self.kind(), identity, "record deleted");

        self.persist(&data)
    }

    fn contains(&self, identity: &str) -> bool {
        let data = self.data.read();
        if data.records.is_empty() {
            return false;
        }
        data.records.contains_key(identity)
    }

    fn len(&self) -> usize {
        self.data.read().records.len()
    }
}

/// reads the table file at `path` and converts every row into a record of `schema`
///
/// # Errors
/// returns [`TableError::MalformedRow`] if the header does not match the schema, a row has the
/// wrong number of cells, an Integer field holds text, or an identity is empty or repeated
fn load(path: &Path, schema: &Schema) -> Result<TableData> {
    let mut lines = persist::read_all(path)?.into_iter().enumerate();
    let expected = schema.header();

    let header = match lines.next() {
        Some((_, line)) => persist::split_row(&line),
        None => expected.clone(),
    };
    if header != expected {
        return Err(TableError::MalformedRow {
            line: 0,
            reason: format!(
                "header {:?} does not match the {} fields {:?}",
                header,
                schema.kind(),
                expected
            ),
        });
    }

    let mut data = TableData {
        rows: vec![header],
        records: BTreeMap::new(),
    };

    for (line, text) in lines {
        if text.trim().is_empty() {
            continue;
        }
        let malformed = |reason: String| TableError::MalformedRow { line, reason };

        let cells = persist::split_row(&text);
        if cells.len() != schema.len() {
            return Err(malformed(format!(
                "expected {} cells but found {}",
                schema.len(),
                cells.len()
            )));
        }

        let identity = cells[0].clone();
        if identity.is_empty() {
            return Err(malformed("identity is empty".to_string()));
        }
        if data.records.contains_key(&identity) {
            return Err(malformed(format!("identity {} appears twice", identity)));
        }

        let mut record = Vec::with_capacity(cells.len());
        record.push(Value::Text(identity.clone()));
        for (field, cell) in schema.fields().iter().zip(&cells).skip(1) {
            record.push(Value::parse_for(field, cell).map_err(|e| malformed(e.to_string()))?);
        }

        data.rows.push(record.iter().map(Value::to_string).collect());
        data.records.insert(identity, record);
    }

    Ok(data)
}
