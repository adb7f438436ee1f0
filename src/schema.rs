//! Record kinds and their field layouts.
//!
//! A [`Schema`] describes one record kind: the ordered field names and the kind of value each
//! field holds. The identity field, [`IDENTITY_FIELD`], is always the first field of every
//! schema. Schemas are resolved by kind name through a [`SchemaRegistry`], which builds each
//! descriptor once and hands out shared references to it afterwards.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TableError};

/// name of the identity field that every record kind carries as its first field
pub const IDENTITY_FIELD: &str = "UserID";

/// the delimiter used between fields of a persisted row
pub const DELIMITER: char = ',';

/// placeholder written into Text fields of a freshly inserted record
pub const TEXT_PLACEHOLDER: &str = "sample";

/// The kind of value a field holds
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// a signed 64-bit integer
    Integer,
    /// free text, must not contain the delimiter or a line break
    Text,
}

impl FieldKind {
    /// the value a field of this kind holds in a freshly inserted record
    pub fn default_value(self) -> Value {
        match self {
            FieldKind::Integer => Value::Integer(0),
            FieldKind::Text => Value::Text(TEXT_PLACEHOLDER.to_string()),
        }
    }
}

/// A single typed cell of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// an integer value
    Integer(i64),
    /// a text value
    Text(String),
}

impl Value {
    /// parses a raw cell, as an Integer if it parses cleanly, otherwise as Text
    pub fn parse(raw: &str) -> Value {
        match raw.parse::<i64>() {
            Ok(n) => Value::Integer(n),
            Err(_) => Value::Text(raw.to_string()),
        }
    }

    /// converts a raw cell into a value of `field`.
    ///
    /// Text fields keep `raw` exactly as given, even when it looks like a number. Integer fields
    /// hold the parsed number, so `+5` is stored as `5`.
    ///
    /// # Errors
    /// returns [`TableError::InvalidValue`] if `field` is Integer but `raw` is not an integer
    pub fn parse_for(field: &Field, raw: &str) -> Result<Value> {
        match field.kind {
            FieldKind::Text => Ok(Value::Text(raw.to_string())),
            FieldKind::Integer => {
                raw.parse::<i64>()
                    .map(Value::Integer)
                    .map_err(|_| TableError::InvalidValue {
                        field: field.name.clone(),
                        value: raw.to_string(),
                    })
            }
        }
    }

    /// returns the integer held by this value, if it is one
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Text(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// A named, typed field of a record kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// the field name, as it appears in the table header
    pub name: String,
    /// the kind of values this field holds
    pub kind: FieldKind,
}

impl Field {
    /// builder method to construct a new `Field`
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Field {
            name: name.into(),
            kind,
        }
    }
}

/// The ordered field layout of one record kind. The identity field is always at index 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    kind: String,
    fields: Vec<Field>,
}

impl Schema {
    /// builds a schema for `kind` from its declared (non-identity) fields. The identity field
    /// is prepended automatically.
    ///
    /// # Errors
    /// returns [`TableError::InvalidSchema`] if a field name is empty, duplicated, contains the
    /// delimiter or a line break, or redeclares the identity field
    pub fn new(kind: impl Into<String>, declared: Vec<Field>) -> Result<Schema> {
        let kind = kind.into();
        let invalid = |reason: String| TableError::InvalidSchema {
            kind: kind.clone(),
            reason,
        };

        if kind.is_empty() {
            return Err(invalid("the kind name is empty".to_string()));
        }

        let mut fields = Vec::with_capacity(declared.len() + 1);
        fields.push(Field::new(IDENTITY_FIELD, FieldKind::Text));
        for field in declared {
            if field.name.is_empty() {
                return Err(invalid("a field name is empty".to_string()));
            }
            if field.name.contains(DELIMITER) || field.name.contains('\n') {
                return Err(invalid(format!("field {:?} contains a delimiter", field.name)));
            }
            if fields.iter().any(|f| f.name == field.name) {
                return Err(invalid(format!("field {} is declared twice", field.name)));
            }
            fields.push(field);
        }

        Ok(Schema { kind, fields })
    }

    /// the record kind name
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// every field, identity field first
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// number of fields, identity field included
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// always false, a schema carries at least the identity field
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// position of the field named `name`
    ///
    /// # Errors
    /// returns [`TableError::UnknownField`] if the kind does not declare `name`
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| TableError::UnknownField(name.to_string()))
    }

    /// the field named `name`
    pub fn field(&self, name: &str) -> Result<&Field> {
        self.index_of(name).map(|i| &self.fields[i])
    }

    /// true if the kind declares a field named `name`
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// the header row of a table holding this kind
    pub fn header(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// the values of a freshly inserted record with the given `identity`
    pub fn default_values(&self, identity: &str) -> Vec<Value> {
        self.fields
            .iter()
            .enumerate()
            .map(|(i, f)| {
                if i == 0 {
                    Value::Text(identity.to_string())
                } else {
                    f.kind.default_value()
                }
            })
            .collect()
    }
}

/// Resolves record kind names into [`Schema`]s.
///
/// The registry is seeded with the built-in kinds `DemoData`, `ScoreData` and `VersionData`.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    kinds: HashMap<String, Arc<Schema>>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        SchemaRegistry::new()
    }
}

impl SchemaRegistry {
    /// creates a registry holding the built-in record kinds
    pub fn new() -> Self {
        let builtins = [
            (
                "DemoData",
                vec![
                    Field::new("Name", FieldKind::Text),
                    Field::new("Score", FieldKind::Integer),
                ],
            ),
            ("ScoreData", vec![Field::new("Score", FieldKind::Integer)]),
            ("VersionData", vec![Field::new("Version", FieldKind::Integer)]),
        ];

        let kinds = builtins
            .into_iter()
            .filter_map(|(kind, fields)| Schema::new(kind, fields).ok())
            .map(|schema| (schema.kind().to_string(), Arc::new(schema)))
            .collect();

        SchemaRegistry { kinds }
    }

    /// registers a record kind, replacing any earlier kind of the same name
    ///
    /// # Errors
    /// returns [`TableError::InvalidSchema`] if the field list is not usable
    pub fn register(&mut self, kind: &str, fields: Vec<Field>) -> Result<Arc<Schema>> {
        let schema = Arc::new(Schema::new(kind, fields)?);
        debug!(kind, fields = schema.len(), "registered record kind");
        self.kinds.insert(kind.to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    /// resolves `kind` into its schema
    ///
    /// # Errors
    /// returns [`TableError::UnknownKind`] if no kind of that name is registered
    pub fn resolve(&self, kind: &str) -> Result<Arc<Schema>> {
        self.kinds
            .get(kind)
            .cloned()
            .ok_or_else(|| TableError::UnknownKind(kind.to_string()))
    }

    /// names of every registered kind, sorted
    pub fn kinds(&self) -> Vec<String> {
        let mut names: Vec<String> = self.kinds.keys().cloned().collect();
        names.sort();
        names
    }
}
