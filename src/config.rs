//! Server configuration.
//!
//! A configuration can be read from a JSON file, every field is optional:
//!
//! ```json
//! {
//!   "addr": "0.0.0.0:7000",
//!   "max_sessions": 5,
//!   "grace_period_secs": 10,
//!   "data_dir": "data",
//!   "tables": [ { "kind": "DemoData" }, { "kind": "VersionData", "path": "versions.csv" } ],
//!   "kinds": { "PlayerData": [ { "name": "Level", "kind": "integer" } ] }
//! }
//! ```
//!
//! The server binary applies its command line flags on top of the file.
use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::CsvTable;
use crate::error::{Result, TableError};
use crate::schema::{Field, SchemaRegistry};

/// One table served by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    /// the record kind held by the table
    pub kind: String,
    /// the file backing the table, defaults to `<data_dir>/<kind>.csv`
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl TableConfig {
    /// a table of `kind` kept at the default path
    pub fn new(kind: impl Into<String>) -> Self {
        TableConfig {
            kind: kind.into(),
            path: None,
        }
    }

    /// the file backing the table, relative paths are resolved against `data_dir`
    pub fn resolve_path(&self, data_dir: &Path) -> PathBuf {
        match &self.path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => data_dir.join(path),
            None => data_dir.join(format!("{}.csv", self.kind)),
        }
    }
}

/// Settings of a tabledb server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// the address the server listens on
    pub addr: String,
    /// maximum number of concurrently admitted sessions
    pub max_sessions: usize,
    /// seconds without sessions before the server shuts down
    pub grace_period_secs: f64,
    /// number of worker threads, defaults to `max_sessions`
    pub threads: Option<u32>,
    /// directory table files are kept in
    pub data_dir: PathBuf,
    /// the tables to serve, the first one is the primary table
    pub tables: Vec<TableConfig>,
    /// record kinds in addition to the built-in ones, mapped to their fields
    pub kinds: BTreeMap<String, Vec<Field>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            addr: ServerConfig::DEFAULT_ADDR.to_string(),
            max_sessions: 5,
            grace_period_secs: 10.0,
            threads: None,
            data_dir: PathBuf::from("."),
            tables: vec![TableConfig::new("DemoData")],
            kinds: BTreeMap::new(),
        }
    }
}

impl ServerConfig {
    /// the address used when none is configured
    pub const DEFAULT_ADDR: &'static str = "127.0.0.1:7000";

    /// reads a configuration from the JSON file at `path`
    pub fn from_file(path: &Path) -> Result<ServerConfig> {
        let config: ServerConfig = serde_json::from_str(&fs::read_to_string(path)?)?;
        debug!(?path, ?config, "configuration read");
        Ok(config)
    }

    /// checks the configuration is usable
    ///
    /// # Errors
    /// returns [`TableError::Config`] describing the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.max_sessions == 0 {
            return Err(TableError::Config("max_sessions must be at least 1".to_string()));
        }
        if !self.grace_period_secs.is_finite() || self.grace_period_secs < 0.0 {
            return Err(TableError::Config(format!(
                "grace_period_secs must be a non-negative number, got {}",
                self.grace_period_secs
            )));
        }
        if self.threads == Some(0) {
            return Err(TableError::Config("threads must be at least 1".to_string()));
        }
        if self.tables.is_empty() {
            return Err(TableError::Config("at least one table is required".to_string()));
        }
        for (i, table) in self.tables.iter().enumerate() {
            if self.tables[..i].iter().any(|t| t.kind == table.kind) {
                return Err(TableError::Config(format!(
                    "the {} table is configured twice",
                    table.kind
                )));
            }
        }
        self.socket_addr()?;
        Ok(())
    }

    /// the listening address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.addr.parse().map_err(|_| {
            TableError::Parsing(format!(
                "could not parse {} into an IP address and port",
                &self.addr
            ))
        })
    }

    /// the idle shutdown grace period
    pub fn grace_period(&self) -> Duration {
        Duration::try_from_secs_f64(self.grace_period_secs).unwrap_or_default()
    }

    /// number of worker threads to run
    pub fn worker_threads(&self) -> u32 {
        self.threads
            .unwrap_or_else(|| u32::try_from(self.max_sessions).unwrap_or(u32::MAX))
    }

    /// a registry holding the built-in kinds and every kind declared in this configuration
    pub fn registry(&self) -> Result<SchemaRegistry> {
        let mut registry = SchemaRegistry::new();
        for (kind, fields) in &self.kinds {
            registry.register(kind, fields.clone())?;
        }
        Ok(registry)
    }

    /// opens every configured table, primary table first, creating missing table files
    pub fn open_tables(&self) -> Result<Vec<CsvTable>> {
        let registry = self.registry()?;
        self.tables
            .iter()
            .map(|table| {
                let schema = registry.resolve(&table.kind)?;
                CsvTable::open(table.resolve_path(&self.data_dir), schema)
            })
            .collect()
    }
}
