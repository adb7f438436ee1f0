//! Server side HTTP/1.1 framing for the tabledb protocol.
//!
//! Every connection carries exactly one request and one response (`Connection: close`).
//! Request heads are parsed with [`httparse`], bodies are framed by `Content-Length` and must be
//! UTF-8.
use std::io::{BufRead, Read, Write};

use httparse::Status;

use crate::error::{Result, TableError};

/// largest request head accepted, in bytes
pub const MAX_HEAD_BYTES: usize = 8 * 1024;

/// largest body accepted, in bytes
pub const MAX_BODY_BYTES: usize = 64 * 1024;

const MAX_HEADERS: usize = 32;

/// A request as read off the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// the request method, e.g. `GET`
    pub method: String,
    /// the request target
    pub path: String,
    /// the decoded body
    pub body: String,
}

/// reads a single request from `reader`
///
/// # Errors
/// returns [`TableError::Protocol`] if the head cannot be parsed, the body is too large or is
/// not UTF-8, and [`TableError::PersistenceIo`] if reading fails
pub fn read_request<R: BufRead>(reader: &mut R) -> Result<HttpRequest> {
    let head = read_head(reader)?;
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut headers);
    match req.parse(&head) {
        Ok(Status::Complete(_)) => {}
        Ok(Status::Partial) => return Err(protocol("incomplete request head")),
        Err(e) => return Err(protocol(&format!("bad request head: {}", e))),
    }

    let method = req.method.unwrap_or_default().to_string();
    let path = req.path.unwrap_or("/").to_string();
    let length = content_length(req.headers)?;
    let body = read_body(reader, length)?;
    Ok(HttpRequest { method, path, body })
}

/// writes a response with the given `status` carrying `body`
pub fn write_response<W: Write>(writer: &mut W, status: u16, body: &str) -> Result<()> {
    write!(
        writer,
        "HTTP/1.1 {} {}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason(status),
        body.len(),
        body
    )?;
    writer.flush()?;
    Ok(())
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// reads up to and including the blank line that ends a head
fn read_head<R: BufRead>(reader: &mut R) -> Result<Vec<u8>> {
    let mut head = Vec::new();
    loop {
        let read = reader.read_until(b'\n', &mut head)?;
        if read == 0 {
            return Err(protocol("connection closed before the head was complete"));
        }
        if head.ends_with(b"\r\n\r\n") || head.ends_with(b"\n\n") {
            return Ok(head);
        }
        if head.len() > MAX_HEAD_BYTES {
            return Err(protocol("head too large"));
        }
    }
}

fn content_length(headers: &[httparse::Header<'_>]) -> Result<usize> {
    let header = match headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case("content-length"))
    {
        Some(header) => header,
        None => return Ok(0),
    };

    let length = std::str::from_utf8(header.value)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .ok_or_else(|| protocol("invalid Content-Length"))?;
    if length > MAX_BODY_BYTES {
        return Err(protocol("body too large"));
    }
    Ok(length)
}

fn read_body<R: Read>(reader: &mut R, length: usize) -> Result<String> {
    let mut body = vec![0; length];
    reader.read_exact(&mut body)?;
    String::from_utf8(body).map_err(|_| protocol("body is not valid UTF-8"))
}

fn protocol(msg: &str) -> TableError {
    TableError::Protocol(msg.to_string())
}
