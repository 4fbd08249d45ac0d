//! Process-wide statistics aggregator.
//!
//! Grounded in the original `stats.c` counter set, superseding its
//! shared-memory/semaphore implementation (see DESIGN.md) with plain
//! atomics owned by a single in-process [`Stats`] value.

use std::{
    sync::atomic::{AtomicI64, AtomicU64, Ordering},
    time::{Duration, Instant},
};

use crate::http::types::StatusCode;

const RELAXED: Ordering = Ordering::Relaxed;

/// Process-wide counters and timing accumulators.
///
/// All fields are independently atomic; no cross-counter atomicity is
/// promised beyond what the testable properties in §8 require.
#[derive(Debug)]
pub struct Stats {
    total_requests: AtomicU64,
    completed_requests: AtomicU64,
    bytes_transferred: AtomicU64,
    response_time_nanos: AtomicU64,

    status_200: AtomicU64,
    status_206: AtomicU64,
    status_400: AtomicU64,
    status_403: AtomicU64,
    status_404: AtomicU64,
    status_416: AtomicU64,
    status_500: AtomicU64,
    status_501: AtomicU64,
    status_503: AtomicU64,

    active_connections: AtomicI64,
    server_start_time: Instant,
}

/// An owned, point-in-time snapshot; the out-of-scope `/stats` formatter
/// consumes this to render JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub completed_requests: u64,
    pub bytes_transferred: u64,
    pub total_response_time_seconds: f64,
    pub status_200: u64,
    pub status_206: u64,
    pub status_400: u64,
    pub status_403: u64,
    pub status_404: u64,
    pub status_416: u64,
    pub status_500: u64,
    pub status_501: u64,
    pub status_503: u64,
    pub active_connections: i64,
    pub uptime_seconds: u64,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            completed_requests: AtomicU64::new(0),
            bytes_transferred: AtomicU64::new(0),
            response_time_nanos: AtomicU64::new(0),

            status_200: AtomicU64::new(0),
            status_206: AtomicU64::new(0),
            status_400: AtomicU64::new(0),
            status_403: AtomicU64::new(0),
            status_404: AtomicU64::new(0),
            status_416: AtomicU64::new(0),
            status_500: AtomicU64::new(0),
            status_501: AtomicU64::new(0),
            status_503: AtomicU64::new(0),

            active_connections: AtomicI64::new(0),
            server_start_time: Instant::now(),
        }
    }

    /// §4.H: the acceptor counts every successfully `accept`ed TCP
    /// connection toward `total_requests`, whether or not it is later
    /// enqueued — a connection that gets a direct 503 was still accepted.
    #[inline]
    pub fn record_accepted(&self) {
        self.total_requests.fetch_add(1, RELAXED);
    }

    /// A worker has dequeued a connection and begun its keep-alive session.
    #[inline]
    pub fn record_connection_started(&self) {
        self.active_connections.fetch_add(1, RELAXED);
    }

    #[inline]
    pub fn record_connection_closed(&self) {
        self.active_connections.fetch_sub(1, RELAXED);
    }

    /// Records one completed request/response exchange: status counter,
    /// bytes sent, and elapsed wall-clock response time.
    #[inline]
    pub fn record_response(&self, status: StatusCode, bytes: u64, elapsed: Duration) {
        self.completed_requests.fetch_add(1, RELAXED);
        self.bytes_transferred.fetch_add(bytes, RELAXED);
        self.response_time_nanos
            .fetch_add(elapsed.as_nanos() as u64, RELAXED);

        self.status_counter(status).fetch_add(1, RELAXED);
    }

    /// §4.H: the acceptor increments `status_503` directly on queue-full,
    /// bypassing the per-request accounting above (no response was ever
    /// dispatched to a worker).
    #[inline]
    pub fn record_queue_full(&self) {
        self.status_503.fetch_add(1, RELAXED);
    }

    fn status_counter(&self, status: StatusCode) -> &AtomicU64 {
        match status {
            StatusCode::Ok => &self.status_200,
            StatusCode::PartialContent => &self.status_206,
            StatusCode::BadRequest => &self.status_400,
            StatusCode::Forbidden => &self.status_403,
            StatusCode::NotFound => &self.status_404,
            StatusCode::RangeNotSatisfiable => &self.status_416,
            StatusCode::InternalServerError => &self.status_500,
            StatusCode::NotImplemented => &self.status_501,
            StatusCode::ServiceUnavailable => &self.status_503,
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_requests: self.total_requests.load(RELAXED),
            completed_requests: self.completed_requests.load(RELAXED),
            bytes_transferred: self.bytes_transferred.load(RELAXED),
            total_response_time_seconds: self.response_time_nanos.load(RELAXED) as f64 / 1e9,
            status_200: self.status_200.load(RELAXED),
            status_206: self.status_206.load(RELAXED),
            status_400: self.status_400.load(RELAXED),
            status_403: self.status_403.load(RELAXED),
            status_404: self.status_404.load(RELAXED),
            status_416: self.status_416.load(RELAXED),
            status_500: self.status_500.load(RELAXED),
            status_501: self.status_501.load(RELAXED),
            status_503: self.status_503.load(RELAXED),
            active_connections: self.active_connections.load(RELAXED),
            uptime_seconds: self.server_start_time.elapsed().as_secs(),
        }
    }
}
