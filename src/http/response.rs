//! Response header assembly (§4.E/§4.G).
//!
//! The teacher's `Response` is a fluent, state-machine-guarded builder for a
//! general-purpose framework with an open-ended header set. This server
//! only ever emits one of a handful of fixed header shapes, so the builder
//! collapses to a small set of free functions that write directly into a
//! caller-supplied buffer — no header API surface is needed.

use std::fmt::Write as _;

use super::types::{StatusCode, Version};

/// `Connection` header value, decided once per response per the keep-alive
/// policy table in §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    KeepAlive,
    Close,
}

impl Connection {
    #[inline(always)]
    const fn as_bytes(self) -> &'static [u8] {
        match self {
            Connection::KeepAlive => b"Connection: keep-alive\r\n",
            Connection::Close => b"Connection: close\r\n",
        }
    }
}

/// §7/§4.G: every status this server emits is keep-alive-eligible except
/// these, which always terminate the connection; an `HTTP/1.0` request
/// closes regardless of status, since this server never negotiates
/// persistent connections for 1.0 clients.
pub fn connection_for(status: StatusCode, version: Version) -> Connection {
    if version == Version::Http10 {
        return Connection::Close;
    }

    match status {
        StatusCode::BadRequest
        | StatusCode::Forbidden
        | StatusCode::InternalServerError
        | StatusCode::NotImplemented
        | StatusCode::ServiceUnavailable => Connection::Close,
        _ => Connection::KeepAlive,
    }
}

/// `Content-Range` value for a satisfied range (§4.F) or a `416` rejection.
#[derive(Debug, Clone, Copy)]
pub enum ContentRange {
    Bytes { start: u64, end: u64, total: u64 },
    Unsatisfiable { total: u64 },
}

/// Builds the full header block (status line through the blank line) for a
/// response carrying `content_length` bytes of `content_type` body.
///
/// `date` is the caller-supplied RFC 1123 `Date` value (module L is
/// responsible for formatting "now"; this function only writes bytes).
pub fn write_headers(
    out: &mut Vec<u8>,
    status: StatusCode,
    version: Version,
    date: &str,
    content_type: Option<&str>,
    content_length: u64,
    range: Option<ContentRange>,
) {
    out.extend_from_slice(status.status_line());
    out.extend_from_slice(b"Server: ConcurrentHTTP/1.0\r\n");
    let _ = write!(out, "Date: {date}\r\n");

    if let Some(content_type) = content_type {
        let _ = write!(out, "Content-Type: {content_type}\r\n");
    }
    let _ = write!(out, "Content-Length: {content_length}\r\n");

    match range {
        Some(ContentRange::Bytes { start, end, total }) => {
            let _ = write!(out, "Content-Range: bytes {start}-{end}/{total}\r\n");
            out.extend_from_slice(b"Accept-Ranges: bytes\r\n");
        }
        Some(ContentRange::Unsatisfiable { total }) => {
            let _ = write!(out, "Content-Range: bytes */{total}\r\n");
        }
        None => {}
    }

    out.extend_from_slice(connection_for(status, version).as_bytes());
    out.extend_from_slice(b"\r\n");
}
