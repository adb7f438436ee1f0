//! Request decoding: turns a verb and body into a [`Request`].
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TableError};

/// body returned when a request was carried out
pub const SUCCESS: &str = "Request Success";

/// body returned when a request could not be carried out
pub const FAILED: &str = "Request Failed";

/// The HTTP verbs the server understands
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Verb {
    /// asks the server to admit a new session
    Get,
    /// an operation keyed by a single identity
    Post,
    /// an operation carrying a comma delimited payload
    Put,
}

impl Verb {
    /// the verb as it appears on the request line
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
        }
    }
}

impl FromStr for Verb {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "GET" => Ok(Verb::Get),
            "POST" => Ok(Verb::Post),
            "PUT" => Ok(Verb::Put),
            other => Err(TableError::MalformedRequest(format!("unsupported method {}", other))),
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// These are the named operations a client can ask the server to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// ends the session of a known user
    CloseClient {
        /// the user's identity
        id: String,
    },
    /// removes a user from every table and ends their session
    DeleteUserData {
        /// the user's identity
        id: String,
    },
    /// gets the `Name` field of a user
    GetName {
        /// the user's identity
        id: String,
    },
    /// gets the `Score` field of a user
    GetScore {
        /// the user's identity
        id: String,
    },
    /// creates a new user with a fresh identity in every table
    GenerateId,
    /// gets a slice of the descending score ranking
    GetRanking {
        /// first rank, 1-based
        from: usize,
        /// last rank, inclusive
        to: usize,
    },
    /// gets every field of a user in the table of the given record kind
    GetUserData {
        /// the user's identity
        id: String,
        /// the record kind to read
        kind: String,
    },
    /// sets the `Name` field of a user
    SetName {
        /// the user's identity
        id: String,
        /// the new name
        name: String,
    },
    /// sets the `Score` field of a user
    SetScore {
        /// the user's identity
        id: String,
        /// the new score
        score: String,
    },
}

impl Operation {
    /// the operation name as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Operation::CloseClient { .. } => "CloseClient",
            Operation::DeleteUserData { .. } => "DeleteUserData",
            Operation::GetName { .. } => "GetName",
            Operation::GetScore { .. } => "GetScore",
            Operation::GenerateId => "GenerateID",
            Operation::GetRanking { .. } => "GetRanking",
            Operation::GetUserData { .. } => "GetUserData",
            Operation::SetName { .. } => "SetName",
            Operation::SetScore { .. } => "SetScore",
        }
    }
}

/// A decoded client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// a GET probe asking to be admitted as a new session
    Probe,
    /// a named operation
    Command(Operation),
}

impl Request {
    /// decodes a request from its `verb` and `body`.
    ///
    /// - `GET` bodies are ignored
    /// - `POST` bodies look like `UserID=<id>&Request=<operation>`
    /// - `PUT` bodies look like `<payload>^<operation>`, the payload being comma delimited
    ///
    /// # Errors
    /// returns [`TableError::MalformedRequest`] if the body does not follow the layout of its
    /// verb, and [`TableError::UnrecognizedOperation`] if the operation name is not known for it
    pub fn parse(verb: Verb, body: &str) -> Result<Request> {
        match verb {
            Verb::Get => Ok(Request::Probe),
            Verb::Post => parse_keyed(body).map(Request::Command),
            Verb::Put => parse_payload(body).map(Request::Command),
        }
    }

    /// encodes this request into the verb and body that carry it
    pub fn encode(&self) -> (Verb, String) {
        let op = match self {
            Request::Probe => return (Verb::Get, String::new()),
            Request::Command(op) => op,
        };

        let keyed = |id: &str| (Verb::Post, format!("UserID={}&Request={}", id, op.name()));
        let payload = |fields: &[&str]| (Verb::Put, format!("{}^{}", fields.join(","), op.name()));

        match op {
            Operation::CloseClient { id }
            | Operation::DeleteUserData { id }
            | Operation::GetName { id }
            | Operation::GetScore { id } => keyed(id.as_str()),
            Operation::GenerateId => keyed(""),
            Operation::GetRanking { from, to } => {
                payload(&[from.to_string().as_str(), to.to_string().as_str()])
            }
            Operation::GetUserData { id, kind } => payload(&[id.as_str(), kind.as_str()]),
            Operation::SetName { id, name } => payload(&[id.as_str(), name.as_str()]),
            Operation::SetScore { id, score } => payload(&[id.as_str(), score.as_str()]),
        }
    }
}

fn parse_keyed(body: &str) -> Result<Operation> {
    // anything after a comma is not part of the envelope
    let envelope = body.split(',').next().unwrap_or_default().trim();
    let mut pairs = envelope.split('&');
    let (id, name) = match (pairs.next(), pairs.next()) {
        (Some(id), Some(name)) => (form_value(id)?, form_value(name)?),
        _ => {
            return Err(TableError::MalformedRequest(format!(
                "expected <id>&<operation> but got {:?}",
                envelope
            )))
        }
    };

    let id = id.to_string();
    match name {
        "CloseClient" => Ok(Operation::CloseClient { id }),
        "DeleteUserData" => Ok(Operation::DeleteUserData { id }),
        "GetName" => Ok(Operation::GetName { id }),
        "GetScore" => Ok(Operation::GetScore { id }),
        "GenerateID" => Ok(Operation::GenerateId),
        other => Err(TableError::UnrecognizedOperation(other.to_string())),
    }
}

fn parse_payload(body: &str) -> Result<Operation> {
    let (payload, name) = body.trim().split_once('^').ok_or_else(|| {
        TableError::MalformedRequest(format!("expected <payload>^<operation> but got {:?}", body))
    })?;
    let fields: Vec<&str> = payload.split(',').collect();

    match name {
        "GetRanking" => {
            // a leading identity is accepted and ignored
            let (from, to) = match fields.as_slice() {
                [from, to] | [_, from, to] => (parse_rank(from)?, parse_rank(to)?),
                _ => return Err(malformed_payload(name, payload)),
            };
            Ok(Operation::GetRanking { from, to })
        }
        "GetUserData" => {
            let (id, kind) = two_fields(name, payload, &fields)?;
            Ok(Operation::GetUserData { id, kind })
        }
        "SetName" => {
            let (id, name) = two_fields(name, payload, &fields)?;
            Ok(Operation::SetName { id, name })
        }
        "SetScore" => {
            let (id, score) = two_fields(name, payload, &fields)?;
            Ok(Operation::SetScore { id, score })
        }
        other => Err(TableError::UnrecognizedOperation(other.to_string())),
    }
}

/// the value of a `key=value` form pair
fn form_value(pair: &str) -> Result<&str> {
    pair.split_once('=')
        .map(|(_, value)| value)
        .ok_or_else(|| TableError::MalformedRequest(format!("expected key=value but got {:?}", pair)))
}

fn two_fields(name: &str, payload: &str, fields: &[&str]) -> Result<(String, String)> {
    match fields {
        [a, b] => Ok((a.to_string(), b.to_string())),
        _ => Err(malformed_payload(name, payload)),
    }
}

fn parse_rank(raw: &str) -> Result<usize> {
    raw.trim()
        .parse()
        .map_err(|_| TableError::MalformedRequest(format!("{:?} is not a rank", raw)))
}

fn malformed_payload(name: &str, payload: &str) -> TableError {
    TableError::MalformedRequest(format!("unexpected payload {:?} for {}", payload, name))
}
