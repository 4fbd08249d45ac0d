//! End-to-end scenarios driving a real server over a real TCP socket.
//!
//! Each test starts a full `Supervisor` against a `tempfile`-backed
//! document root and config file, talks to it over loopback, then signals
//! shutdown. Ports are fixed per test (rather than ephemeral) since
//! `ServerConfig` rejects `PORT=0` and the supervisor itself only exposes
//! the port it was told to bind, not the one the OS actually chose.

use std::time::Duration;

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::oneshot,
    time::sleep,
};

use concurrent_http_server::{config::ServerConfig, logger::Logger, Supervisor};

async fn start_server(config_text: &str) -> (oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let config_dir = tempfile::tempdir().unwrap();
    let config_path = config_dir.path().join("server.conf");
    std::fs::write(&config_path, config_text).unwrap();

    let config = ServerConfig::load(&config_path).unwrap();
    let logger = Logger::open(&config.log_path).unwrap();

    let (tx, rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
        Supervisor::new(config, logger)
            .run(async move {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });

    (tx, handle)
}

async fn connect_with_retry(port: u16) -> TcpStream {
    for _ in 0..50 {
        if let Ok(stream) = TcpStream::connect(("127.0.0.1", port)).await {
            return stream;
        }
        sleep(Duration::from_millis(20)).await;
    }
    panic!("server on port {port} never became reachable");
}

async fn send_and_read(stream: &mut TcpStream, request: &str) -> String {
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut buf = vec![0u8; 8192];
    let mut total = 0;
    // Give the server a moment to respond before the read would block
    // forever on a keep-alive connection with no more data coming.
    loop {
        tokio::select! {
            result = stream.read(&mut buf[total..]) => {
                let n = result.unwrap();
                if n == 0 {
                    break;
                }
                total += n;
                if total >= 4 && buf[..total].windows(4).any(|w| w == b"\r\n\r\n") {
                    // Headers are in; for these fixed small bodies this is
                    // enough to have the full response too in one read.
                    break;
                }
            }
            _ = sleep(Duration::from_millis(300)) => break,
        }
    }

    String::from_utf8_lossy(&buf[..total]).into_owned()
}

async fn shutdown(tx: oneshot::Sender<()>, handle: tokio::task::JoinHandle<()>) {
    let _ = tx.send(());
    let _ = handle.await;
}

fn base_config(port: u16, doc_root: &std::path::Path, log_path: &std::path::Path) -> String {
    format!(
        "\
PORT={port}
DOCUMENT_ROOT={}
NUM_WORKERS=1
THREADS_PER_WORKER=2
MAX_QUEUE_SIZE=8
LOG_FILE={}
CACHE_SIZE_MB=4
TIMEOUT_SECONDS=5
",
        doc_root.display(),
        log_path.display(),
    )
}

#[tokio::test]
async fn hit_cache_after_miss() {
    let doc_root = tempfile::tempdir().unwrap();
    std::fs::write(doc_root.path().join("index.html"), "hello world").unwrap();
    let log_dir = tempfile::tempdir().unwrap();
    let log_path = log_dir.path().join("access.log");

    let port = 18381;
    let (tx, handle) = start_server(&base_config(port, doc_root.path(), &log_path)).await;

    for _ in 0..2 {
        let mut stream = connect_with_retry(port).await;
        let response = send_and_read(&mut stream, "GET / HTTP/1.1\r\nHost: x\r\n\r\n").await;

        assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
        assert!(response.contains("Content-Type: text/html"));
        assert!(response.contains("Content-Length: 11"));
        assert!(response.ends_with("hello world"));
    }

    shutdown(tx, handle).await;
}

#[tokio::test]
async fn range_suffix_returns_partial_content() {
    let doc_root = tempfile::tempdir().unwrap();
    let body = vec![b'x'; 1000];
    std::fs::write(doc_root.path().join("a.bin"), &body).unwrap();
    let log_dir = tempfile::tempdir().unwrap();
    let log_path = log_dir.path().join("access.log");

    let port = 18382;
    let (tx, handle) = start_server(&base_config(port, doc_root.path(), &log_path)).await;

    let mut stream = connect_with_retry(port).await;
    let response = send_and_read(
        &mut stream,
        "GET /a.bin HTTP/1.1\r\nHost: x\r\nRange: bytes=-100\r\n\r\n",
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 206 Partial Content"), "{response}");
    assert!(response.contains("Content-Length: 100"));
    assert!(response.contains("Content-Range: bytes 900-999/1000"));

    shutdown(tx, handle).await;
}

#[tokio::test]
async fn unsatisfiable_range_reports_content_length_matching_the_body_sent() {
    let doc_root = tempfile::tempdir().unwrap();
    let body = vec![b'x'; 100];
    std::fs::write(doc_root.path().join("a.bin"), &body).unwrap();
    let log_dir = tempfile::tempdir().unwrap();
    let log_path = log_dir.path().join("access.log");

    let port = 18387;
    let (tx, handle) = start_server(&base_config(port, doc_root.path(), &log_path)).await;

    let mut stream = connect_with_retry(port).await;
    let response = send_and_read(
        &mut stream,
        "GET /a.bin HTTP/1.1\r\nHost: x\r\nRange: bytes=200-300\r\n\r\n",
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 416 Range Not Satisfiable"), "{response}");
    assert!(response.contains("Content-Range: bytes */100"));

    let header_end = response.find("\r\n\r\n").unwrap() + 4;
    let headers = &response[..header_end];
    let actual_body_len = response.len() - header_end;
    let declared_len: usize = headers
        .lines()
        .find_map(|line| line.strip_prefix("Content-Length: "))
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert_eq!(declared_len, actual_body_len, "{response}");

    // 416 preserves keep-alive: a desynced Content-Length would make this
    // second request on the same connection fail to parse cleanly.
    let second = send_and_read(&mut stream, "GET / HTTP/1.1\r\nHost: x\r\n\r\n").await;
    assert!(second.starts_with("HTTP/1.1 404 Not Found"), "{second}");

    shutdown(tx, handle).await;
}

#[tokio::test]
async fn traversal_path_is_rejected() {
    let doc_root = tempfile::tempdir().unwrap();
    let log_dir = tempfile::tempdir().unwrap();
    let log_path = log_dir.path().join("access.log");

    let port = 18383;
    let (tx, handle) = start_server(&base_config(port, doc_root.path(), &log_path)).await;

    let mut stream = connect_with_retry(port).await;
    let response = send_and_read(&mut stream, "GET /../etc/passwd HTTP/1.1\r\nHost: x\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 403 Forbidden"), "{response}");

    shutdown(tx, handle).await;
}

#[tokio::test]
async fn unsupported_method_yields_501() {
    let doc_root = tempfile::tempdir().unwrap();
    let log_dir = tempfile::tempdir().unwrap();
    let log_path = log_dir.path().join("access.log");

    let port = 18384;
    let (tx, handle) = start_server(&base_config(port, doc_root.path(), &log_path)).await;

    let mut stream = connect_with_retry(port).await;
    let response = send_and_read(&mut stream, "PUT / HTTP/1.1\r\nHost: x\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 501 Not Implemented"), "{response}");

    shutdown(tx, handle).await;
}

#[tokio::test]
async fn queue_saturation_yields_503() {
    let doc_root = tempfile::tempdir().unwrap();
    std::fs::write(doc_root.path().join("index.html"), "hello world").unwrap();
    let log_dir = tempfile::tempdir().unwrap();
    let log_path = log_dir.path().join("access.log");

    // One worker thread and a queue capacity of one: hold the worker busy
    // with a connection that never sends a request, fill the queue with a
    // second connection, then a third must be rejected inline.
    let port = 18385;
    let config_text = format!(
        "\
PORT={port}
DOCUMENT_ROOT={}
NUM_WORKERS=1
THREADS_PER_WORKER=1
MAX_QUEUE_SIZE=1
LOG_FILE={}
CACHE_SIZE_MB=4
TIMEOUT_SECONDS=5
",
        doc_root.path().display(),
        log_path.display(),
    );
    let (tx, handle) = start_server(&config_text).await;

    let _occupant = connect_with_retry(port).await;
    sleep(Duration::from_millis(50)).await;
    let _queued = connect_with_retry(port).await;
    sleep(Duration::from_millis(50)).await;

    let mut rejected = connect_with_retry(port).await;
    let response = send_and_read(&mut rejected, "GET / HTTP/1.1\r\nHost: x\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 503 Service Unavailable"), "{response}");

    shutdown(tx, handle).await;
}

#[tokio::test]
async fn keep_alive_serves_two_requests_on_one_connection() {
    let doc_root = tempfile::tempdir().unwrap();
    std::fs::write(doc_root.path().join("index.html"), "hello world").unwrap();
    let log_dir = tempfile::tempdir().unwrap();
    let log_path = log_dir.path().join("access.log");

    let port = 18386;
    let (tx, handle) = start_server(&base_config(port, doc_root.path(), &log_path)).await;

    let mut stream = connect_with_retry(port).await;

    let first = send_and_read(
        &mut stream,
        "GET / HTTP/1.1\r\nHost: x\r\nConnection: keep-alive\r\n\r\n",
    )
    .await;
    assert!(first.starts_with("HTTP/1.1 200 OK"), "{first}");
    assert!(!first.contains("Connection: close"));

    let second = send_and_read(
        &mut stream,
        "GET / HTTP/1.1\r\nHost: x\r\nConnection: keep-alive\r\n\r\n",
    )
    .await;
    assert!(second.starts_with("HTTP/1.1 200 OK"), "{second}");

    shutdown(tx, handle).await;
}
