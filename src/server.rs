//! The TCP front end: accepts connections and hands each one to a thread pool, which reads one
//! HTTP request, routes it, and writes the reply.
use std::io::{BufReader, BufWriter};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::Sender;
use tracing::{debug, error, info, warn};

use crate::command::{Verb, FAILED};
use crate::engine::TableEngine;
use crate::error::{Result, TableError};
use crate::http;
use crate::router::Router;
use crate::thread_pool::ThreadPool;

/// how long a worker waits for a client to finish sending its request
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Events published by a running [`TableServer`] for whoever displays its state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// a request was answered
    Responded {
        /// the request method
        method: String,
        /// the HTTP status of the response
        status: u16,
        /// the response body
        body: String,
        /// sessions active after the request
        active_sessions: usize,
        /// records held by the primary table after the request
        records: usize,
    },
    /// the accept loop has stopped
    Stopped,
}

/// Stops the accept loop of a running [`TableServer`].
///
/// Triggering it sets a flag and then connects to the server once, so that the blocking accept
/// call returns and the flag is seen.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
    addr: SocketAddr,
}

impl ShutdownHandle {
    /// creates a handle for a server listening on `addr`
    pub fn new(addr: SocketAddr) -> Self {
        ShutdownHandle {
            requested: Arc::new(AtomicBool::new(false)),
            addr,
        }
    }

    /// asks the server to stop accepting connections
    pub fn trigger(&self) {
        if self.requested.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("shutdown requested");

        let mut wake = self.addr;
        if wake.ip().is_unspecified() {
            wake.set_ip(match wake.ip() {
                IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
            });
        }
        if let Err(e) = TcpStream::connect_timeout(&wake, Duration::from_secs(1)) {
            warn!("could not wake the accept loop: {}", e);
        }
    }

    /// true once [`trigger`](#method.trigger) has been called
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// An HTTP server over a set of record tables.
/// It accepts connections on a [`TcpListener`], and hands every connection to a thread from the
/// pool. The thread reads one request, lets the [`Router`] carry it out and writes the response.
///
/// # Example
/// Create and run a new server listening on "127.0.0.1:7000", with 5 threads running on a
/// shared queue thread pool, serving a single `DemoData` table
/// ```rust
/// use std::net::TcpListener;
/// use std::time::Duration;
/// use tabledb::{AdmissionController, CsvTable, Router, SchemaRegistry, ShutdownHandle, TableServer};
/// use tabledb::thread_pool::{SharedQueueThreadPool, ThreadPool};
/// # fn main() -> tabledb::Result<()> {
/// let listener = TcpListener::bind("127.0.0.1:7000")?;
/// let shutdown = ShutdownHandle::new(listener.local_addr()?);
/// let on_idle = shutdown.clone();
/// let admission = AdmissionController::new(5, Duration::from_secs(10), move || on_idle.trigger())?;
///
/// let schema = SchemaRegistry::new().resolve("DemoData")?;
/// let table = CsvTable::open("DemoData.csv", schema)?;
/// let router = Router::new(vec![table], admission)?;
///
/// let server = TableServer::new(router, SharedQueueThreadPool::new(5)?);
/// // server.run(listener, shutdown)?;
/// # Ok(())
/// # }
/// ```
pub struct TableServer<E: TableEngine, P: ThreadPool> {
    router: Arc<Router<E>>,
    pool: P,
    events: Option<Sender<ServerEvent>>,
}

impl<E: TableEngine, P: ThreadPool> TableServer<E, P> {
    /// Create a new `TableServer` carrying out requests with `router` on the threads of `pool`.
    pub fn new(router: Router<E>, pool: P) -> Self {
        TableServer {
            router: Arc::new(router),
            pool,
            events: None,
        }
    }

    /// publishes a [`ServerEvent`] on `events` after every response
    pub fn with_events(mut self, events: Sender<ServerEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// the router requests are handed to
    pub fn router(&self) -> &Arc<Router<E>> {
        &self.router
    }

    /// accepts connections on `listener` until `shutdown` is triggered.
    ///
    /// # Errors
    /// returns [`TableError`] if the listener's address cannot be read
    pub fn run(self, listener: TcpListener, shutdown: ShutdownHandle) -> Result<()> {
        info!("accepting connections on {}", listener.local_addr()?);
        for stream in listener.incoming() {
            if shutdown.is_requested() {
                break;
            }
            match stream {
                Ok(stream) => {
                    let router = Arc::clone(&self.router);
                    let events = self.events.clone();
                    self.pool.spawn(move || {
                        if let Err(e) = serve(&router, stream, events.as_ref()) {
                            error!("Error on serving client: {}", e);
                        }
                    });
                }
                Err(e) => error!("Connection failed: {}", e),
            }
        }

        info!("server stopped");
        if let Some(events) = &self.events {
            if events.send(ServerEvent::Stopped).is_err() {
                debug!("no one is listening for server events");
            }
        }
        Ok(())
    }
}

/// Reads one request from the given `tcp` stream, carries it out through `router` and writes
/// the response back to the stream.
///
/// - `GET`, `POST` and `PUT` requests answer 200, or 400 if the body could not be decoded
/// - any other method answers 405
/// - a request head that cannot be parsed answers 400
fn serve<E: TableEngine>(
    router: &Router<E>,
    tcp: TcpStream,
    events: Option<&Sender<ServerEvent>>,
) -> Result<()> {
    let peer_addr = tcp.peer_addr()?;
    tcp.set_read_timeout(Some(READ_TIMEOUT))?;
    let mut reader = BufReader::new(&tcp);
    let mut writer = BufWriter::new(&tcp);

    let request = match http::read_request(&mut reader) {
        Ok(request) => request,
        Err(TableError::Protocol(msg)) => {
            debug!("Bad request from {}: {}", peer_addr, msg);
            return http::write_response(&mut writer, 400, FAILED);
        }
        Err(e) => return Err(e),
    };
    debug!("Receive request from {}: {:?}", peer_addr, request);

    let (status, body) = match request.method.parse::<Verb>() {
        Ok(verb) => match router.handle(verb, &request.body) {
            Ok(body) => (200, body),
            Err(_) => (400, FAILED.to_string()),
        },
        Err(_) => (405, String::new()),
    };

    http::write_response(&mut writer, status, &body)?;
    debug!("Response sent to {}: {} {:?}", peer_addr, status, body);

    if let Some(events) = events {
        let event = ServerEvent::Responded {
            method: request.method,
            status,
            body,
            active_sessions: router.admission().active(),
            records: router.tables().first().map_or(0, |t| t.len()),
        };
        if events.send(event).is_err() {
            debug!("no one is listening for server events");
        }
    }
    Ok(())
}
