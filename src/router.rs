//! Carries out decoded requests against the configured tables.
use dashmap::DashSet;
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{debug, error, info, instrument, warn};

use crate::admission::AdmissionController;
use crate::command::{Operation, Request, Verb, FAILED, SUCCESS};
use crate::engine::TableEngine;
use crate::error::{Result, TableError};
use crate::idgen::{self, ID_ALPHABET, ID_LENGTH};
use crate::ranking;
use crate::schema::IDENTITY_FIELD;

/// field read by `GetName` and written by `SetName`
pub const NAME_FIELD: &str = "Name";

/// field read by `GetScore` and `GetRanking` and written by `SetScore`
pub const SCORE_FIELD: &str = "Score";

/// Decodes requests and carries them out against a set of tables.
///
/// The first table is the primary table. Its identity column seeds the set of registered
/// identities, which `GenerateID` checks new identities against and `DeleteUserData` removes
/// identities from.
///
/// Routine failures (unknown identities, duplicate identities, unknown fields or kinds, values of
/// the wrong kind, failed file writes) never escape the router as errors. They are logged and
/// answered with [`FAILED`] or an empty string.
pub struct Router<E: TableEngine> {
    tables: Vec<E>,
    identities: DashSet<String>,
    admission: AdmissionController,
    rng: Mutex<SmallRng>,
}

impl<E: TableEngine> Router<E> {
    /// Create a new `Router` over `tables`, gating sessions through `admission`.
    ///
    /// # Errors
    /// returns [`TableError::Config`] if `tables` is empty or two tables hold the same kind
    pub fn new(tables: Vec<E>, admission: AdmissionController) -> Result<Self> {
        let primary = tables
            .first()
            .ok_or_else(|| TableError::Config("at least one table is required".to_string()))?;
        for (i, table) in tables.iter().enumerate() {
            if tables[..i].iter().any(|t| t.kind() == table.kind()) {
                return Err(TableError::Config(format!(
                    "the {} table is configured twice",
                    table.kind()
                )));
            }
        }

        let identities = DashSet::new();
        for id in primary.get_all(IDENTITY_FIELD)? {
            identities.insert(id);
        }
        info!(
            primary = primary.kind(),
            identities = identities.len(),
            "router ready"
        );

        Ok(Router {
            tables,
            identities,
            admission,
            rng: Mutex::new(SmallRng::from_entropy()),
        })
    }

    /// the tables this router works on, primary table first
    pub fn tables(&self) -> &[E] {
        &self.tables
    }

    /// the table holding records of `kind`
    pub fn table(&self, kind: &str) -> Option<&E> {
        self.tables.iter().find(|t| t.kind() == kind)
    }

    /// the admission controller gating sessions
    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    /// true if `id` is a registered identity
    pub fn is_registered(&self, id: &str) -> bool {
        self.identities.contains(id)
    }

    /// decodes a request from its `verb` and `body` and carries it out.
    ///
    /// # Errors
    /// returns [`TableError::MalformedRequest`] or [`TableError::UnrecognizedOperation`] if the
    /// request could not be decoded. Every decoded request produces a response body.
    pub fn handle(&self, verb: Verb, body: &str) -> Result<String> {
        let request = Request::parse(verb, body).map_err(|e| {
            warn!(%verb, "rejected request: {}", e);
            e
        })?;
        Ok(self.dispatch(&request))
    }

    /// carries out a decoded request and returns the response body
    #[instrument(skip(self))]
    pub fn dispatch(&self, request: &Request) -> String {
        let op = match request {
            Request::Probe => return self.probe(),
            Request::Command(op) => op,
        };

        let response = match op {
            Operation::CloseClient { id } => self.close_client(id),
            Operation::DeleteUserData { id } => self.delete_user_data(id),
            Operation::GetName { id } => self.read_field(id, NAME_FIELD),
            Operation::GetScore { id } => self.read_field(id, SCORE_FIELD),
            Operation::GenerateId => self.generate_id(),
            Operation::GetRanking { from, to } => self.ranking(*from, *to),
            Operation::GetUserData { id, kind } => self.user_data(id, kind),
            Operation::SetName { id, name } => self.write_field(id, NAME_FIELD, name),
            Operation::SetScore { id, score } => self.write_field(id, SCORE_FIELD, score),
        };
        debug!(op = op.name(), %response, "request handled");
        response
    }

    fn primary(&self) -> &E {
        // never empty, checked by `new`
        &self.tables[0]
    }

    fn probe(&self) -> String {
        match self.admission.try_admit() {
            Ok(_) => SUCCESS.to_string(),
            Err(e) => {
                info!("{}", e);
                FAILED.to_string()
            }
        }
    }

    fn close_client(&self, id: &str) -> String {
        if !self.primary().contains(id) {
            debug!(id, "close requested by an unknown identity");
            return FAILED.to_string();
        }
        self.admission.release();
        SUCCESS.to_string()
    }

    fn delete_user_data(&self, id: &str) -> String {
        if !self.identities.contains(id) {
            debug!(id, "delete requested for an unregistered identity");
            return FAILED.to_string();
        }

        for table in &self.tables {
            match table.delete(id) {
                Ok(()) | Err(TableError::NotFound(_)) => {}
                Err(e) => {
                    error!(kind = table.kind(), id, "delete failed: {}", e);
                    return FAILED.to_string();
                }
            }
        }

        self.identities.remove(id);
        self.admission.release();
        SUCCESS.to_string()
    }

    /// the value of `field` from the first table that declares it and holds `id`
    fn read_field(&self, id: &str, field: &str) -> String {
        self.tables
            .iter()
            .filter(|t| t.schema().has_field(field))
            .find_map(|t| match t.get(id, &[field]) {
                Ok(value) => Some(value),
                Err(e) => {
                    debug!(kind = t.kind(), "{}", e);
                    None
                }
            })
            .unwrap_or_default()
    }

    fn write_field(&self, id: &str, field: &str, value: &str) -> String {
        let targets: Vec<&E> = self
            .tables
            .iter()
            .filter(|t| t.schema().has_field(field))
            .collect();
        if targets.is_empty() {
            warn!(field, "no table declares the field");
            return FAILED.to_string();
        }

        for table in targets {
            if let Err(e) = table.update(id, field, value) {
                warn!(kind = table.kind(), id, field, "update failed: {}", e);
                return FAILED.to_string();
            }
        }
        SUCCESS.to_string()
    }

    fn generate_id(&self) -> String {
        let id = {
            // an identity is generated and registered under the same lock
            let mut rng = self.rng.lock();
            let generated = idgen::generate_unique(&mut *rng, ID_LENGTH, ID_ALPHABET, |candidate| {
                self.identities.contains(candidate)
                    || self.tables.iter().any(|t| t.contains(candidate))
            });
            match generated {
                Ok(id) => {
                    self.identities.insert(id.clone());
                    id
                }
                Err(e) => {
                    error!("{}", e);
                    return FAILED.to_string();
                }
            }
        };

        for (i, table) in self.tables.iter().enumerate() {
            if let Err(e) = table.insert(&id) {
                error!(kind = table.kind(), %id, "insert failed, rolling back: {}", e);
                for written in &self.tables[..i] {
                    if let Err(e) = written.delete(&id) {
                        warn!(kind = written.kind(), %id, "rollback failed: {}", e);
                    }
                }
                self.identities.remove(&id);
                return FAILED.to_string();
            }
        }

        info!(%id, "generated new identity");
        id
    }

    fn ranking(&self, from: usize, to: usize) -> String {
        let table = match self.tables.iter().find(|t| t.schema().has_field(SCORE_FIELD)) {
            Some(table) => table,
            None => {
                warn!("no table declares the {} field", SCORE_FIELD);
                return FAILED.to_string();
            }
        };

        let scores = table.get_all(SCORE_FIELD).and_then(|raw| {
            raw.iter()
                .map(|s| {
                    s.parse::<i64>().map_err(|_| TableError::InvalidValue {
                        field: SCORE_FIELD.to_string(),
                        value: s.clone(),
                    })
                })
                .collect::<Result<Vec<_>>>()
        });

        match scores.and_then(|scores| ranking::top_k(&scores, from, to)) {
            Ok(ranking) => ranking,
            Err(e) => {
                warn!("ranking failed: {}", e);
                FAILED.to_string()
            }
        }
    }

    fn user_data(&self, id: &str, kind: &str) -> String {
        let table = match self.table(kind) {
            Some(table) => table,
            None => {
                warn!("{}", TableError::UnknownKind(kind.to_string()));
                return FAILED.to_string();
            }
        };

        match table.get(id, &[kind]) {
            Ok(data) => data,
            Err(TableError::NotFound(_)) => String::new(),
            Err(e) => {
                warn!(kind, id, "{}", e);
                FAILED.to_string()
            }
        }
    }
}
