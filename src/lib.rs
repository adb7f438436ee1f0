#![deny(missing_docs)]
//! A multithreaded, persistent record store (tabledb) that keeps typed records in tables backed
//! by comma delimited text files, and serves them over HTTP.
//!
//! This crate provides the [`CsvTable`] implementation itself, the [`TableServer`] that serves
//! tables to clients, the [`TableClient`] that talks to it, as well as a [`tabledb-client`]
//! and [`tabledb-server`] executable that can be used to interact with the server.
//!
//! ## Records and tables
//! Every table holds records of a single "kind". A kind is described by a [`Schema`]: an
//! ordered list of named fields, each holding either an Integer or Text value. The first field
//! of every kind is the identity field, `UserID`, which is unique within its table.
//!
//! The built-in kinds are:
//!
//! - `DemoData`: `UserID`, `Name` (text), `Score` (integer)
//! - `ScoreData`: `UserID`, `Score` (integer)
//! - `VersionData`: `UserID`, `Version` (integer)
//!
//! Further kinds can be declared in the server configuration.
//!
//! ## CsvTable
//! [`CsvTable`] is the implementor of the [`TableEngine`] trait. It is responsible for:
//! - loading a table from its file at start-up, creating the file with just a header row if it
//!   does not exist yet
//! - keeping the table both as rows (the way it is written to disk) and as a map from identity to
//!   typed record, consistent with each other
//! - rewriting the whole file after every insert, update and delete
//!
//! ## Supported Operations
//! Clients talk to the server with three HTTP verbs:
//!
//! - `GET` asks to be admitted as a new session. At most a configured number of sessions may be
//!   active at once
//! - `POST` carries an operation keyed by a user identity: `CloseClient`, `DeleteUserData`,
//!   `GetName`, `GetScore` and `GenerateID`
//! - `PUT` carries an operation with a comma delimited payload: `GetRanking`, `GetUserData`,
//!   `SetName` and `SetScore`
//!
//! See [`Request`] and [`Operation`] for the exact layout of each request. Mutating operations
//! answer `Request Success` or `Request Failed`, reads answer with the data itself.
//!
//! ## Idle shutdown
//! The [`AdmissionController`] counts active sessions. Once the last session closes, a timer is
//! armed, and if no new session is admitted within the grace period the server shuts down.
//!
//! ## Table files
//! A table file is UTF-8 text with one record per line and fields separated by commas. The
//! first line is the header, holding the field names. Values are not quoted, so they must not
//! contain commas or line breaks.
//!
//! [`tabledb-server`]: ./bin/tabledb-server.rs
//! [`tabledb-client`]: ./bin/tabledb-client.rs

pub use admission::{AdmissionController, SessionState};
pub use client::TableClient;
pub use command::{Operation, Request, Verb, FAILED, SUCCESS};
pub use config::{ServerConfig, TableConfig};
pub use engine::{CsvTable, TableEngine};
pub use error::{Result, TableError};
pub use router::Router;
pub use schema::{Field, FieldKind, Schema, SchemaRegistry, Value, IDENTITY_FIELD};
pub use server::{ServerEvent, ShutdownHandle, TableServer};
pub use thread_pool::{RayonThreadPool, SharedQueueThreadPool, ThreadPool};

pub mod admission;
mod client;
mod command;
pub mod config;
mod engine;
mod error;
pub mod http;
pub mod idgen;
pub mod persist;
pub mod ranking;
mod router;
pub mod schema;
mod server;
pub mod thread_pool;
