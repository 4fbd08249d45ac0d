//! Full and partial file transmission (§4.F).
//!
//! Small cacheable files round-trip through [`Cache`]; everything else is
//! read straight off disk in fixed-size chunks so a large file is never
//! buffered whole in memory, mirroring the teacher's preference for
//! bounded, pre-sized buffers over unbounded allocation.

use std::{path::Path, sync::Arc};

use tokio::{
    fs::File,
    io::{self, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, SeekFrom},
    net::TcpStream,
};

use crate::{
    cache::Cache,
    clock::http_date_now,
    error_pages::ErrorPages,
    http::{
        request::RangeSpec,
        response::{write_headers, ContentRange},
        types::{mime_type_for, StatusCode, Version},
    },
};

const STREAM_CHUNK: usize = 64 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct ServeOutcome {
    pub status: StatusCode,
    pub bytes_sent: u64,
}

/// Serves `path` onto `stream`. `include_body` is false for HEAD requests.
/// `range` is the already-parsed `Range` header, if any (an `Err(())`
/// inside means the header was malformed and is treated as no range, per
/// §4.E).
pub async fn serve(
    stream: &mut TcpStream,
    path: &Path,
    include_body: bool,
    range: Option<Result<RangeSpec, ()>>,
    version: Version,
    cache: &Cache,
    error_pages: &ErrorPages,
) -> io::Result<ServeOutcome> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => meta,
        Ok(_) => return send_error(stream, StatusCode::NotFound, version, error_pages, include_body).await,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return send_error(stream, StatusCode::NotFound, version, error_pages, include_body).await;
        }
        Err(_) => return send_error(stream, StatusCode::Forbidden, version, error_pages, include_body).await,
    };

    let size = metadata.len();

    match range {
        Some(Ok(spec)) => {
            serve_range(stream, path, size, spec, version, include_body, error_pages).await
        }
        _ => serve_full(stream, path, size, version, include_body, cache, error_pages).await,
    }
}

async fn serve_full(
    stream: &mut TcpStream,
    path: &Path,
    size: u64,
    version: Version,
    include_body: bool,
    cache: &Cache,
    error_pages: &ErrorPages,
) -> io::Result<ServeOutcome> {
    let key = path.to_string_lossy().into_owned();
    let content_type = mime_type_for(&key);
    let cacheable = Cache::is_cacheable_size(size);

    if cacheable && cache.enabled() {
        if let Some(bytes) = cache.get(&key) {
            let sent = write_full_response(stream, version, content_type, &bytes, include_body).await?;
            return Ok(ServeOutcome {
                status: StatusCode::Ok,
                bytes_sent: sent,
            });
        }
    }

    let mut file = match File::open(path).await {
        Ok(file) => file,
        Err(_) => return send_error(stream, StatusCode::Forbidden, version, error_pages, include_body).await,
    };

    if cacheable {
        let mut buf = vec![0u8; size as usize];
        if file.read_exact(&mut buf).await.is_err() {
            return send_error(stream, StatusCode::InternalServerError, version, error_pages, include_body)
                .await;
        }

        if cache.enabled() {
            cache.put(&key, Arc::from(buf.clone().into_boxed_slice()));
        }

        let sent = write_full_response(stream, version, content_type, &buf, include_body).await?;
        return Ok(ServeOutcome {
            status: StatusCode::Ok,
            bytes_sent: sent,
        });
    }

    let mut headers = Vec::with_capacity(256);
    write_headers(
        &mut headers,
        StatusCode::Ok,
        version,
        &http_date_now(),
        Some(content_type),
        size,
        None,
    );
    stream.write_all(&headers).await?;

    let mut sent = headers.len() as u64;
    if include_body {
        sent += stream_chunks(stream, &mut file, size).await?;
    }

    Ok(ServeOutcome {
        status: StatusCode::Ok,
        bytes_sent: sent,
    })
}

async fn serve_range(
    stream: &mut TcpStream,
    path: &Path,
    size: u64,
    spec: RangeSpec,
    version: Version,
    include_body: bool,
    error_pages: &ErrorPages,
) -> io::Result<ServeOutcome> {
    let resolved = resolve_range(spec, size);

    let Some((start, end)) = resolved else {
        let body = if include_body {
            error_pages.get(StatusCode::RangeNotSatisfiable)
        } else {
            &[]
        };
        let mut headers = Vec::with_capacity(256);
        write_headers(
            &mut headers,
            StatusCode::RangeNotSatisfiable,
            version,
            &http_date_now(),
            None,
            body.len() as u64,
            Some(ContentRange::Unsatisfiable { total: size }),
        );
        stream.write_all(&headers).await?;
        stream.write_all(body).await?;
        return Ok(ServeOutcome {
            status: StatusCode::RangeNotSatisfiable,
            bytes_sent: headers.len() as u64 + body.len() as u64,
        });
    };

    let mut file = match File::open(path).await {
        Ok(file) => file,
        Err(_) => return send_error(stream, StatusCode::Forbidden, version, error_pages, include_body).await,
    };

    let content_type = mime_type_for(&path.to_string_lossy());
    let len = end - start + 1;

    let mut headers = Vec::with_capacity(256);
    write_headers(
        &mut headers,
        StatusCode::PartialContent,
        version,
        &http_date_now(),
        Some(content_type),
        len,
        Some(ContentRange::Bytes { start, end, total: size }),
    );
    stream.write_all(&headers).await?;

    let mut sent = headers.len() as u64;
    if include_body {
        file.seek(SeekFrom::Start(start)).await?;
        sent += stream_chunks(stream, &mut file, len).await?;
    }

    Ok(ServeOutcome {
        status: StatusCode::PartialContent,
        bytes_sent: sent,
    })
}

/// Resolves a [`RangeSpec`] against the file's actual size, returning
/// `None` when the range is unsatisfiable (§4.F step 5).
fn resolve_range(spec: RangeSpec, size: u64) -> Option<(u64, u64)> {
    let (start, end) = match spec {
        RangeSpec::Suffix { len } => {
            if len == 0 || size == 0 {
                return None;
            }
            (size.saturating_sub(len), size - 1)
        }
        RangeSpec::Prefix { start } => (start, size.saturating_sub(1)),
        RangeSpec::Explicit { start, end } => (start, end),
    };

    if size == 0 || start > end || end >= size {
        return None;
    }
    Some((start, end))
}

async fn write_full_response(
    stream: &mut TcpStream,
    version: Version,
    content_type: &str,
    body: &[u8],
    include_body: bool,
) -> io::Result<u64> {
    let mut headers = Vec::with_capacity(256);
    write_headers(
        &mut headers,
        StatusCode::Ok,
        version,
        &http_date_now(),
        Some(content_type),
        body.len() as u64,
        None,
    );
    stream.write_all(&headers).await?;

    let mut sent = headers.len() as u64;
    if include_body {
        stream.write_all(body).await?;
        sent += body.len() as u64;
    }
    Ok(sent)
}

async fn stream_chunks(stream: &mut TcpStream, file: &mut File, len: u64) -> io::Result<u64> {
    let mut remaining = len;
    let mut buf = vec![0u8; STREAM_CHUNK];

    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        let n = file.read(&mut buf[..want]).await?;
        if n == 0 {
            break;
        }
        stream.write_all(&buf[..n]).await?;
        remaining -= n as u64;
    }
    Ok(len - remaining)
}

/// Writes a deterministic error response (status line, headers, and
/// pre-loaded error body) and reports its byte count.
pub async fn send_error(
    stream: &mut TcpStream,
    status: StatusCode,
    version: Version,
    error_pages: &ErrorPages,
    include_body: bool,
) -> io::Result<ServeOutcome> {
    let body = error_pages.get(status);
    let mut headers = Vec::with_capacity(256);
    write_headers(
        &mut headers,
        status,
        version,
        &http_date_now(),
        Some("text/html"),
        body.len() as u64,
        None,
    );
    stream.write_all(&headers).await?;

    let mut sent = headers.len() as u64;
    if include_body {
        stream.write_all(body).await?;
        sent += body.len() as u64;
    }

    Ok(ServeOutcome {
        status,
        bytes_sent: sent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_range_within_bounds_resolves() {
        assert_eq!(resolve_range(RangeSpec::Explicit { start: 0, end: 9 }, 100), Some((0, 9)));
    }

    #[test]
    fn explicit_range_beyond_size_is_unsatisfiable() {
        assert_eq!(resolve_range(RangeSpec::Explicit { start: 0, end: 100 }, 100), None);
    }

    #[test]
    fn suffix_range_clamps_to_file_start() {
        assert_eq!(resolve_range(RangeSpec::Suffix { len: 1000 }, 100), Some((0, 99)));
    }

    #[test]
    fn suffix_zero_is_unsatisfiable() {
        assert_eq!(resolve_range(RangeSpec::Suffix { len: 0 }, 100), None);
    }

    #[test]
    fn prefix_range_runs_to_end_of_file() {
        assert_eq!(resolve_range(RangeSpec::Prefix { start: 90 }, 100), Some((90, 99)));
    }

    #[test]
    fn zero_length_file_has_no_satisfiable_range() {
        assert_eq!(resolve_range(RangeSpec::Explicit { start: 0, end: 0 }, 0), None);
    }

    #[test]
    fn single_byte_range_is_satisfiable() {
        assert_eq!(resolve_range(RangeSpec::Explicit { start: 0, end: 0 }, 100), Some((0, 0)));
    }
}
