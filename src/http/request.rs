//! Request-line and header parsing (§4.E).
//!
//! Grounded in the teacher's `memchr`/`memchr_iter`-driven `Parser` in this
//! same file's prior revision: no UTF-8 validation, scan for `\r\n`
//! terminators with `memchr`, slice directly out of the read buffer. Only
//! `Host` and `Range` are extracted; every other header is skipped.

use memchr::memchr;
use std::time::Duration;
use tokio::{
    io::AsyncReadExt,
    net::TcpStream,
    time::{error::Elapsed, timeout},
};

use super::types::{Method, Version};

/// Fixed request-line/header buffer. Headers that don't fit are a 400,
/// not a silent truncation (§4.E edge cases).
pub const BUFFER_SIZE: usize = 1024;

const MAX_METHOD_LEN: usize = 15;
const MAX_PATH_LEN: usize = 511;
const MAX_VERSION_LEN: usize = 15;

#[derive(Debug, PartialEq, Eq)]
pub enum RequestError {
    /// The peer closed the connection before sending a complete request.
    ConnectionClosed,
    /// No terminating blank line arrived before the idle timeout elapsed.
    Timeout,
    /// The request line or headers don't fit `BUFFER_SIZE`, or are malformed.
    BadRequest,
}

impl From<Elapsed> for RequestError {
    fn from(_: Elapsed) -> Self {
        RequestError::Timeout
    }
}

/// A `Range: bytes=...` header, already validated for syntax (§4.E) but not
/// yet resolved against a concrete file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// `bytes=start-end`, both bounds given.
    Explicit { start: u64, end: u64 },
    /// `bytes=start-`, open-ended.
    Prefix { start: u64 },
    /// `bytes=-suffix_len`, last N bytes.
    Suffix { len: u64 },
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParsedRequest {
    pub method: Method,
    /// The verbatim method token, kept alongside the classified [`Method`]
    /// so the access log (§4.J) can record e.g. `PUT` instead of just
    /// "unsupported".
    pub method_token: String,
    pub path: String,
    pub version: Version,
    pub host: Option<String>,
    /// `Some(Err(()))` means a `Range` header was present but malformed,
    /// which per §4.E is treated as "no range" rather than a 400.
    pub range: Option<Result<RangeSpec, ()>>,
}

/// Reads and parses one request line plus headers off `stream`.
///
/// Stops at the first blank line (`\r\n\r\n` or `\n\n`), on buffer
/// exhaustion, on peer close, or on `idle_timeout` elapsing with no data.
pub async fn read_request(
    stream: &mut TcpStream,
    idle_timeout: Duration,
) -> Result<ParsedRequest, RequestError> {
    let mut buf = [0u8; BUFFER_SIZE];
    let mut filled = 0usize;

    let header_end = loop {
        if let Some(pos) = find_header_end(&buf[..filled]) {
            break pos;
        }

        if filled == buf.len() {
            return Err(RequestError::BadRequest);
        }

        let n = timeout(idle_timeout, stream.read(&mut buf[filled..])).await??;
        if n == 0 {
            return Err(RequestError::ConnectionClosed);
        }
        filled += n;
    };

    parse(&buf[..filled], header_end)
}

/// Returns the index right after the blank line terminating the headers.
fn find_header_end(buf: &[u8]) -> Option<usize> {
    let mut search_from = 0;
    while let Some(rel) = memchr(b'\n', &buf[search_from..]) {
        let pos = search_from + rel;
        let line_start = buf[..pos]
            .iter()
            .rposition(|&b| b == b'\n')
            .map(|p| p + 1)
            .unwrap_or(0);
        let line = &buf[line_start..pos];
        if line.is_empty() || line == b"\r" {
            return Some(pos + 1);
        }
        search_from = pos + 1;
    }
    None
}

fn parse(buf: &[u8], header_end: usize) -> Result<ParsedRequest, RequestError> {
    let header_block = &buf[..header_end];
    let mut lines = split_lines(header_block);

    let request_line = lines.next().ok_or(RequestError::BadRequest)?;
    let (method, method_token, path, version) = parse_request_line(request_line)?;

    let mut host = None;
    let mut range = None;

    for line in lines {
        if line.is_empty() {
            continue;
        }
        let Some(colon) = line.iter().position(|&b| b == b':') else {
            continue;
        };
        let (name, value) = (&line[..colon], trim_ascii(&line[colon + 1..]));

        if host.is_none() && name.eq_ignore_ascii_case(b"Host") {
            host = Some(String::from_utf8_lossy(value).into_owned());
        } else if range.is_none() && name.eq_ignore_ascii_case(b"Range") {
            range = Some(parse_range(value));
        }
    }

    Ok(ParsedRequest {
        method,
        method_token,
        path,
        version,
        host,
        range,
    })
}

fn split_lines(block: &[u8]) -> impl Iterator<Item = &[u8]> {
    block.split(|&b| b == b'\n').map(trim_ascii)
}

fn trim_ascii(mut bytes: &[u8]) -> &[u8] {
    while let [b'\r', rest @ ..] = bytes {
        bytes = rest;
    }
    while matches!(bytes.last(), Some(b'\r')) {
        bytes = &bytes[..bytes.len() - 1];
    }
    bytes
}

fn parse_request_line(line: &[u8]) -> Result<(Method, String, String, Version), RequestError> {
    let mut parts = line.splitn(3, |&b| b == b' ');
    let method_bytes = parts.next().ok_or(RequestError::BadRequest)?;
    let path_bytes = parts.next().ok_or(RequestError::BadRequest)?;
    let version_bytes = parts.next().ok_or(RequestError::BadRequest)?;

    if method_bytes.is_empty()
        || method_bytes.len() > MAX_METHOD_LEN
        || path_bytes.is_empty()
        || path_bytes.len() > MAX_PATH_LEN
        || !path_bytes.starts_with(b"/")
        || version_bytes.len() > MAX_VERSION_LEN
    {
        return Err(RequestError::BadRequest);
    }

    let version = Version::parse(version_bytes).ok_or(RequestError::BadRequest)?;
    let method = Method::parse(method_bytes);
    let method_token = String::from_utf8_lossy(method_bytes).into_owned();
    let path = String::from_utf8_lossy(path_bytes).into_owned();

    Ok((method, method_token, path, version))
}

/// Parses `bytes=s-e` / `bytes=s-` / `bytes=-k`. Anything else, including a
/// non-`bytes` unit or multiple ranges, is "malformed" (§4.E: treated as no
/// range, not a 400).
fn parse_range(value: &[u8]) -> Result<RangeSpec, ()> {
    let value = value.strip_prefix(b"bytes=").ok_or(())?;
    if value.contains(&b',') {
        return Err(());
    }
    let dash = memchr(b'-', value).ok_or(())?;
    let (start_s, end_s) = (&value[..dash], &value[dash + 1..]);

    match (start_s.is_empty(), end_s.is_empty()) {
        (true, true) => Err(()),
        (true, false) => {
            let len = parse_u64(end_s)?;
            Ok(RangeSpec::Suffix { len })
        }
        (false, true) => {
            let start = parse_u64(start_s)?;
            Ok(RangeSpec::Prefix { start })
        }
        (false, false) => {
            let start = parse_u64(start_s)?;
            let end = parse_u64(end_s)?;
            if end < start {
                return Err(());
            }
            Ok(RangeSpec::Explicit { start, end })
        }
    }
}

fn parse_u64(bytes: &[u8]) -> Result<u64, ()> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_get_request() {
        let raw = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let end = find_header_end(raw).unwrap();
        let parsed = parse(raw, end).unwrap();

        assert_eq!(parsed.method, Method::Get);
        assert_eq!(parsed.path, "/index.html");
        assert_eq!(parsed.version, Version::Http11);
        assert_eq!(parsed.host.as_deref(), Some("example.com"));
        assert!(parsed.range.is_none());
    }

    #[test]
    fn host_header_preserves_port_suffix() {
        let raw = b"GET / HTTP/1.1\r\nHost: example.com:8080\r\n\r\n";
        let end = find_header_end(raw).unwrap();
        let parsed = parse(raw, end).unwrap();
        assert_eq!(parsed.host.as_deref(), Some("example.com:8080"));
    }

    #[test]
    fn header_name_matching_is_case_insensitive() {
        let raw = b"GET / HTTP/1.1\r\nhOsT: example.com\r\n\r\n";
        let end = find_header_end(raw).unwrap();
        let parsed = parse(raw, end).unwrap();
        assert_eq!(parsed.host.as_deref(), Some("example.com"));
    }

    #[test]
    fn range_explicit_prefix_and_suffix_forms() {
        assert_eq!(
            parse_range(b"bytes=0-499"),
            Ok(RangeSpec::Explicit { start: 0, end: 499 })
        );
        assert_eq!(parse_range(b"bytes=500-"), Ok(RangeSpec::Prefix { start: 500 }));
        assert_eq!(parse_range(b"bytes=-500"), Ok(RangeSpec::Suffix { len: 500 }));
    }

    #[test]
    fn malformed_range_is_an_error_not_a_panic() {
        assert!(parse_range(b"bytes=").is_err());
        assert!(parse_range(b"items=0-10").is_err());
        assert!(parse_range(b"bytes=10-5").is_err());
        assert!(parse_range(b"bytes=a-b").is_err());
        assert!(parse_range(b"bytes=0-10,20-30").is_err());
    }

    #[test]
    fn request_line_rejects_path_without_leading_slash() {
        let raw = b"GET index.html HTTP/1.1\r\n\r\n";
        let end = find_header_end(raw).unwrap();
        assert_eq!(parse(raw, end), Err(RequestError::BadRequest));
    }

    #[test]
    fn request_line_rejects_unknown_version() {
        let raw = b"GET / HTTP/2.0\r\n\r\n";
        let end = find_header_end(raw).unwrap();
        assert_eq!(parse(raw, end), Err(RequestError::BadRequest));
    }

    #[test]
    fn unterminated_headers_are_not_found() {
        let raw = b"GET / HTTP/1.1\r\nHost: example.com\r\n";
        assert!(find_header_end(raw).is_none());
    }

    #[test]
    fn non_get_head_method_still_parses_for_later_501_handling() {
        let raw = b"PUT / HTTP/1.1\r\n\r\n";
        let end = find_header_end(raw).unwrap();
        let parsed = parse(raw, end).unwrap();
        assert_eq!(parsed.method, Method::Other);
    }
}
