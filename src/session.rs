//! Per-connection keep-alive request loop (§4.G).

use std::{sync::Arc, time::Duration, time::Instant};

use tokio::{io::AsyncWriteExt, net::TcpStream};

use crate::{
    cache::Cache,
    config::ServerConfig,
    dashboard::{stats_json, DASHBOARD_HTML},
    error_pages::ErrorPages,
    http::{
        request::{read_request, ParsedRequest, RequestError},
        response::{connection_for, write_headers, Connection},
        types::{Method, StatusCode, Version},
    },
    logger::Logger,
    responder,
    stats::Stats,
};

/// §4.G: at most 50 requests per connection.
const MAX_REQUESTS_PER_CONNECTION: u32 = 50;
/// §5: idle read timeout between requests in an already-open keep-alive
/// session (distinct from the configurable initial-read timeout).
const KEEP_ALIVE_IDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything a session needs, shared read-only (or interior-mutable)
/// across every worker. Owned by the supervisor (module I).
pub struct SessionContext {
    pub config: Arc<ServerConfig>,
    pub cache: Arc<Cache>,
    pub stats: Arc<Stats>,
    pub logger: Arc<Logger>,
    pub error_pages: Arc<ErrorPages>,
}

/// Drains one accepted connection to completion: reads and serves requests
/// until the peer disconnects, the idle timeout elapses, a terminal status
/// closes the connection, or the per-connection request cap is reached.
pub async fn run_session(mut stream: TcpStream, ctx: Arc<SessionContext>) {
    ctx.stats.record_connection_started();

    let mut request_count: u32 = 0;

    loop {
        let read_timeout = if request_count == 0 {
            ctx.config.idle_timeout()
        } else {
            KEEP_ALIVE_IDLE_TIMEOUT
        };

        match read_request(&mut stream, read_timeout).await {
            Ok(request) => {
                request_count += 1;
                let started = Instant::now();

                let outcome = dispatch(&mut stream, &request, &ctx).await;

                let Ok(outcome) = outcome else {
                    break;
                };

                ctx.stats
                    .record_response(outcome.status, outcome.bytes_sent, started.elapsed());
                ctx.logger.log_request(
                    &request.method_token,
                    &request.path,
                    request.version,
                    outcome.status,
                    outcome.bytes_sent,
                );

                let terminal = connection_for(outcome.status, request.version) == Connection::Close;
                let exhausted = request_count >= MAX_REQUESTS_PER_CONNECTION;

                if terminal || exhausted {
                    break;
                }
            }
            Err(RequestError::BadRequest) => {
                let started = Instant::now();
                if let Ok(outcome) = responder::send_error(
                    &mut stream,
                    StatusCode::BadRequest,
                    Version::Http11,
                    &ctx.error_pages,
                    true,
                )
                .await
                {
                    ctx.stats
                        .record_response(outcome.status, outcome.bytes_sent, started.elapsed());
                    ctx.logger.log_request(
                        "-",
                        "-",
                        Version::Http11,
                        outcome.status,
                        outcome.bytes_sent,
                    );
                }
                break;
            }
            Err(RequestError::Timeout) | Err(RequestError::ConnectionClosed) => break,
        }
    }

    ctx.stats.record_connection_closed();
}

async fn dispatch(
    stream: &mut TcpStream,
    request: &ParsedRequest,
    ctx: &SessionContext,
) -> std::io::Result<responder::ServeOutcome> {
    if request.path.contains("..") {
        return responder::send_error(
            stream,
            StatusCode::Forbidden,
            request.version,
            &ctx.error_pages,
            request.method != Method::Head,
        )
        .await;
    }

    if request.method != Method::Get && request.method != Method::Head {
        return responder::send_error(
            stream,
            StatusCode::NotImplemented,
            request.version,
            &ctx.error_pages,
            request.method != Method::Head,
        )
        .await;
    }

    let include_body = request.method != Method::Head;

    match request.path.as_str() {
        "/stats" => respond_bytes(
            stream,
            StatusCode::Ok,
            request.version,
            "application/json",
            stats_json(&ctx.stats.snapshot()).into_bytes(),
            include_body,
        )
        .await,
        "/dashboard" => respond_bytes(
            stream,
            StatusCode::Ok,
            request.version,
            "text/html",
            DASHBOARD_HTML.as_bytes().to_vec(),
            include_body,
        )
        .await,
        "/cause400" => {
            responder::send_error(stream, StatusCode::BadRequest, request.version, &ctx.error_pages, include_body)
                .await
        }
        "/cause500" => {
            responder::send_error(
                stream,
                StatusCode::InternalServerError,
                request.version,
                &ctx.error_pages,
                include_body,
            )
            .await
        }
        "/cause501" => {
            responder::send_error(
                stream,
                StatusCode::NotImplemented,
                request.version,
                &ctx.error_pages,
                include_body,
            )
            .await
        }
        path => {
            let doc_root = ctx.config.resolve_doc_root(request.host.as_deref());
            let file_path = resolve_file_path(doc_root, path);

            responder::serve(
                stream,
                &file_path,
                include_body,
                request.range,
                request.version,
                &ctx.cache,
                &ctx.error_pages,
            )
            .await
        }
    }
}

/// §4.G: a path ending in `/` (including the bare `/`) serves `index.html`
/// from that directory.
fn resolve_file_path(doc_root: &std::path::Path, request_path: &str) -> std::path::PathBuf {
    let relative = request_path.trim_start_matches('/');
    if request_path.ends_with('/') || relative.is_empty() {
        doc_root.join(relative).join("index.html")
    } else {
        doc_root.join(relative)
    }
}

async fn respond_bytes(
    stream: &mut TcpStream,
    status: StatusCode,
    version: Version,
    content_type: &str,
    body: Vec<u8>,
    include_body: bool,
) -> std::io::Result<responder::ServeOutcome> {
    let mut headers = Vec::with_capacity(256);
    write_headers(
        &mut headers,
        status,
        version,
        &crate::clock::http_date_now(),
        Some(content_type),
        body.len() as u64,
        None,
    );
    stream.write_all(&headers).await?;

    let mut sent = headers.len() as u64;
    if include_body {
        stream.write_all(&body).await?;
        sent += body.len() as u64;
    }

    Ok(responder::ServeOutcome {
        status,
        bytes_sent: sent,
    })
}
