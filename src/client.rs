//! A blocking client for the tabledb HTTP protocol.
use std::net::ToSocketAddrs;
use std::time::Duration;

use tracing::debug;
use ureq::{Agent, AgentBuilder};

use crate::command::{Operation, Request, FAILED, SUCCESS};
use crate::error::{Result, TableError};

/// `TableClient` contains the functionality for communication with a [`TableServer`]
///
/// Every call sends one request and reads one response. The server closes the connection after
/// each response, so nothing is pooled between calls.
///
/// [`TableServer`]: ./struct.TableServer.html
#[derive(Debug, Clone)]
pub struct TableClient {
    url: String,
    agent: Agent,
}

impl TableClient {
    /// creates a client for the server at the given `addr`
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| TableError::Parsing("no address to connect to".to_string()))?;
        Ok(TableClient {
            url: format!("http://{}/", addr),
            agent: AgentBuilder::new().build(),
        })
    }

    /// sets a read timeout for every response
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = AgentBuilder::new().timeout_read(timeout).build();
        self
    }

    /// sends `request` and returns the response body
    ///
    /// # Errors
    /// `Err<TableError::Protocol>` if the server answered with anything but 200,
    /// `Err<TableError::Transport>` if the server could not be reached or the connection failed
    pub fn send(&self, request: &Request) -> Result<String> {
        let (verb, body) = request.encode();
        let response = self
            .agent
            .request(verb.as_str(), &self.url)
            .set("Content-Type", "text/plain; charset=utf-8")
            .send_string(&body);

        match response {
            Ok(response) => {
                let status = response.status();
                let reply = read_body(response)?;
                debug!("{} {:?} -> {} {:?}", verb, body, status, reply);
                Ok(reply)
            }
            Err(ureq::Error::Status(status, response)) => {
                let reply = read_body(response)?;
                debug!("{} {:?} -> {} {:?}", verb, body, status, reply);
                Err(TableError::Protocol(format!(
                    "server answered {}: {}",
                    status, reply
                )))
            }
            Err(ureq::Error::Transport(e)) => Err(TableError::Transport(e.to_string())),
        }
    }

    /// asks the server to admit a new session
    /// ## Returns
    /// `Ok<true>` if the session was admitted, `Ok<false>` if the server is at capacity
    pub fn probe(&self) -> Result<bool> {
        self.send(&Request::Probe).map(|body| body == SUCCESS)
    }

    /// ends the session of the user `id`
    pub fn close_client(&self, id: &str) -> Result<bool> {
        self.command(Operation::CloseClient { id: id.to_string() })
            .map(|body| body == SUCCESS)
    }

    /// removes the user `id` from every table and ends their session
    pub fn delete_user_data(&self, id: &str) -> Result<bool> {
        self.command(Operation::DeleteUserData { id: id.to_string() })
            .map(|body| body == SUCCESS)
    }

    /// gets the name of the user `id`, `Ok<None>` if the user is not known
    pub fn get_name(&self, id: &str) -> Result<Option<String>> {
        self.command(Operation::GetName { id: id.to_string() })
            .map(non_empty)
    }

    /// gets the score of the user `id`, `Ok<None>` if the user is not known
    pub fn get_score(&self, id: &str) -> Result<Option<String>> {
        self.command(Operation::GetScore { id: id.to_string() })
            .map(non_empty)
    }

    /// creates a new user and returns its identity
    pub fn generate_id(&self) -> Result<String> {
        self.command(Operation::GenerateId).and_then(data)
    }

    /// gets ranks `from` through `to` of the score ranking, highest score first
    pub fn get_ranking(&self, from: usize, to: usize) -> Result<String> {
        self.command(Operation::GetRanking { from, to })
            .and_then(data)
    }

    /// gets every field of the user `id` from the table of record `kind`
    pub fn get_user_data(&self, id: &str, kind: &str) -> Result<Option<String>> {
        self.command(Operation::GetUserData {
            id: id.to_string(),
            kind: kind.to_string(),
        })
        .and_then(data)
        .map(non_empty)
    }

    /// sets the name of the user `id`
    pub fn set_name(&self, id: &str, name: &str) -> Result<bool> {
        self.command(Operation::SetName {
            id: id.to_string(),
            name: name.to_string(),
        })
        .map(|body| body == SUCCESS)
    }

    /// sets the score of the user `id`
    pub fn set_score(&self, id: &str, score: &str) -> Result<bool> {
        self.command(Operation::SetScore {
            id: id.to_string(),
            score: score.to_string(),
        })
        .map(|body| body == SUCCESS)
    }

    fn command(&self, op: Operation) -> Result<String> {
        self.send(&Request::Command(op))
    }
}

/// a data response, unless the server reported a failure
fn data(body: String) -> Result<String> {
    if body == FAILED {
        return Err(TableError::Protocol("the server could not carry out the request".to_string()));
    }
    Ok(body)
}

fn read_body(response: ureq::Response) -> Result<String> {
    response
        .into_string()
        .map_err(|e| TableError::Transport(e.to_string()))
}

fn non_empty(body: String) -> Option<String> {
    if body.is_empty() {
        None
    } else {
        Some(body)
    }
}
