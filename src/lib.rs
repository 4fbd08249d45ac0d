//! concurrent-http-server — a concurrent static-content HTTP/1.x origin
//! server.
//!
//! Accepts TCP connections on a configured port and serves byte-identical
//! file contents from one or more on-disk document roots, subject to
//! method, path, range, and virtual-host rules. The hard engineering lives
//! in the request dispatch and serving core: a bounded connection queue fed
//! by an [`server::acceptor`], drained by a pool of workers owned by the
//! [`server::supervisor`], an in-memory LRU [`cache::Cache`] with precisely
//! defined concurrent access, [`session`] keep-alive connection
//! multiplexing with timeouts, and a unified [`stats::Stats`] counter
//! aggregated across every worker.
//!
//! # Non-goals
//!
//! HTTPS, HTTP/2+, CGI or any dynamic execution, request bodies larger than
//! the header buffer, chunked transfer encoding, content negotiation,
//! compression, authentication.
//!
//! # Module map
//!
//! | Module | Responsibility |
//! |---|---|
//! | [`config`] | Immutable `ServerConfig`, loaded from a `KEY=VALUE` file. |
//! | [`cache`] | Bounded-byte LRU content cache. |
//! | [`queue`] | Bounded FIFO connection queue. |
//! | [`stats`] | Process-wide counters and timing accumulators. |
//! | [`http`] | Request parsing and response header assembly. |
//! | [`responder`] | Full/partial file transmission and error responses. |
//! | [`session`] | Per-connection keep-alive request loop. |
//! | [`server::acceptor`] | The accept loop feeding the connection queue. |
//! | [`server::supervisor`] | Worker pool startup and graceful shutdown. |
//! | [`logger`] | Serialized, size-rotated access logger. |
//! | [`error_pages`] | Disk-backed (or synthesized) error response bodies. |
//! | [`dashboard`] | `/stats` JSON and `/dashboard` HTML bodies. |
//! | [`clock`] | GMT timestamp formatting for `Date` and the access log. |
//! | [`error`] | Crate-wide operational error taxonomy. |

pub mod cache;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod error_pages;
pub mod http {
    pub mod request;
    pub mod response;
    pub mod types;
}
pub mod logger;
pub mod queue;
pub mod responder;
pub mod server {
    pub mod acceptor;
    pub mod supervisor;
}
pub mod session;
pub mod stats;

pub use crate::{config::ServerConfig, error::ServerError, logger::Logger, server::supervisor::Supervisor};
