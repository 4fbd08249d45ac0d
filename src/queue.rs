//! Bounded FIFO connection queue.
//!
//! Grounded in the teacher's `stream_queue`/`error_queue` split in
//! `server_impl.rs`: a lock-free `crossbeam::queue::SegQueue` carries the
//! FIFO body. `SegQueue` itself is unbounded, so an `AtomicUsize` tracks the
//! occupied-slot count for the capacity check the spec requires, and a
//! `tokio::sync::Notify` pair substitutes for the condvar pair of the
//! abstract model (`not_empty`/`not_full`).

use crossbeam::queue::SegQueue;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::{net::TcpStream, sync::Notify};

/// Returned by [`ConnectionQueue::dequeue`] when shutdown has drained the
/// queue and no further items will arrive.
pub struct Stopped;

/// Returned by [`ConnectionQueue::try_enqueue`] when the queue is at
/// capacity. Carries the stream back so the caller (the acceptor) can still
/// use it to write a 503 directly.
pub struct Full(pub TcpStream);

pub struct ConnectionQueue {
    items: SegQueue<TcpStream>,
    count: AtomicUsize,
    capacity: usize,
    stopping: AtomicBool,
    not_empty: Notify,
    not_full: Notify,
}

impl ConnectionQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: SegQueue::new(),
            count: AtomicUsize::new(0),
            capacity,
            stopping: AtomicBool::new(false),
            not_empty: Notify::new(),
            not_full: Notify::new(),
        }
    }

    /// Non-blocking. Used by the acceptor, which must never stall `accept`.
    pub fn try_enqueue(&self, stream: TcpStream) -> Result<(), Full> {
        if self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.capacity).then_some(n + 1)
            })
            .is_err()
        {
            return Err(Full(stream));
        }

        self.items.push(stream);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Blocks until a slot is free. Unused by the acceptor (which prefers
    /// `try_enqueue` and a direct 503 on failure) but kept for callers that
    /// want backpressure instead.
    #[allow(dead_code)]
    pub async fn enqueue(&self, mut stream: TcpStream) {
        loop {
            match self.try_enqueue(stream) {
                Ok(()) => return,
                Err(Full(returned)) => {
                    stream = returned;
                    self.not_full.notified().await;
                }
            }
        }
    }

    /// Blocks until an item is available or shutdown drains the queue.
    pub async fn dequeue(&self) -> Result<TcpStream, Stopped> {
        loop {
            if let Some(stream) = self.items.pop() {
                self.count.fetch_sub(1, Ordering::AcqRel);
                self.not_full.notify_one();
                return Ok(stream);
            }

            if self.stopping.load(Ordering::Acquire) {
                return Err(Stopped);
            }

            self.not_empty.notified().await;
        }
    }

    /// Sets the stopping flag and wakes every waiter.
    pub fn shutdown(&self) {
        self.stopping.store(true, Ordering::Release);
        self.not_empty.notify_waiters();
        self.not_full.notify_waiters();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback_pair() -> (TcpStream, TcpStream) {
        std::thread::scope(|_| {});
        // Build a connected pair without a runtime dependency on a bound
        // listener port by using `std::net` then converting.
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = std_listener.local_addr().unwrap();
        let client = std::net::TcpStream::connect(addr).unwrap();
        let (server, _) = std_listener.accept().unwrap();
        client.set_nonblocking(true).unwrap();
        server.set_nonblocking(true).unwrap();
        (
            TcpStream::from_std(client).unwrap(),
            TcpStream::from_std(server).unwrap(),
        )
    }

    #[tokio::test]
    async fn try_enqueue_respects_capacity() {
        let queue = ConnectionQueue::new(1);
        let (_keep_alive_a, a) = loopback_pair();
        let (_keep_alive_b, b) = loopback_pair();

        assert!(queue.try_enqueue(a).is_ok());
        assert!(queue.try_enqueue(b).is_err());
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn dequeue_returns_enqueued_items_fifo() {
        let queue = ConnectionQueue::new(4);
        let (_a, a) = loopback_pair();
        let (_b, b) = loopback_pair();

        let a_local = a.local_addr().unwrap();
        let b_local = b.local_addr().unwrap();

        queue.try_enqueue(a).unwrap();
        queue.try_enqueue(b).unwrap();

        let first = queue.dequeue().await.unwrap();
        let second = queue.dequeue().await.unwrap();

        assert_eq!(first.local_addr().unwrap(), a_local);
        assert_eq!(second.local_addr().unwrap(), b_local);
    }

    #[tokio::test]
    async fn dequeue_returns_stopped_after_shutdown_and_drain() {
        let queue = ConnectionQueue::new(2);
        queue.shutdown();

        assert!(queue.dequeue().await.is_err());
    }
}
