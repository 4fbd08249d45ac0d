//! Worker pool & shutdown orchestrator (§4.I).
//!
//! Grounded in the source's own evolution from `master.c`+`stats.c`
//! (fork-per-connection, POSIX shared memory) to `thread_pool.c`
//! (single process, one pthread pool, one shared cache) — see SPEC_FULL.md
//! §9. This implementation follows the latter, generalized to `tokio` tasks
//! and `Arc`-shared state instead of pthreads and shared memory, and to the
//! teacher's own `tokio::spawn`-per-worker shape in `server_impl.rs`'s
//! `spawn_worker`.

use std::{future::Future, sync::Arc};

use tokio::net::TcpListener;

use crate::{
    cache::Cache,
    config::ServerConfig,
    error::ServerError,
    error_pages::ErrorPages,
    logger::Logger,
    queue::ConnectionQueue,
    server::acceptor,
    session::{run_session, SessionContext},
    stats::Stats,
};

/// Owns every piece of shared server state (listener aside, which is bound
/// in [`Supervisor::run`]) and orchestrates startup and shutdown.
pub struct Supervisor {
    config: Arc<ServerConfig>,
    queue: Arc<ConnectionQueue>,
    stats: Arc<Stats>,
    ctx: Arc<SessionContext>,
}

impl Supervisor {
    pub fn new(config: ServerConfig, logger: Logger) -> Self {
        let config = Arc::new(config);
        let cache = Arc::new(Cache::new(config.cache_bytes));
        let stats = Arc::new(Stats::new());
        let error_pages = Arc::new(ErrorPages::load(&config.default_doc_root));
        let queue = Arc::new(ConnectionQueue::new(config.queue_capacity as usize));

        let ctx = Arc::new(SessionContext {
            config: config.clone(),
            cache,
            stats: stats.clone(),
            logger: Arc::new(logger),
            error_pages,
        });

        Self {
            config,
            queue,
            stats,
            ctx,
        }
    }

    /// Binds the listener, spawns the acceptor and the `workers *
    /// threads_per_worker`-sized worker pool, then runs until `shutdown`
    /// resolves. Teardown is the §4.I sequence: stop the acceptor (dropping
    /// the listener, which is the only way to unblock a pending `accept`),
    /// signal the queue, join every worker, destroy the cache. Idempotent
    /// in the sense that a second `run()` call would simply repeat it with
    /// fresh state — nothing here is process-global.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<(), ServerError> {
        let listener = TcpListener::bind(("0.0.0.0", self.config.port))
            .await
            .map_err(|source| ServerError::Bind {
                port: self.config.port,
                source,
            })?;

        tracing::info!(
            port = self.config.port,
            pool_size = self.config.pool_size(),
            queue_capacity = self.config.queue_capacity,
            cache_bytes = self.config.cache_bytes,
            "server listening"
        );

        let acceptor_task = tokio::spawn(acceptor::run(listener, self.queue.clone(), self.stats.clone()));

        let mut workers = Vec::with_capacity(self.config.pool_size());
        for _ in 0..self.config.pool_size() {
            workers.push(self.spawn_worker());
        }

        shutdown.await;
        tracing::info!("shutdown signal received, draining in-flight sessions");

        // Dropping the listener (via abort) is what unblocks a pending
        // `accept()`; there is no separate "close" handle to call.
        acceptor_task.abort();
        self.queue.shutdown();

        for worker in workers {
            let _ = worker.await;
        }

        self.ctx.cache.destroy();
        tracing::info!("shutdown complete");
        Ok(())
    }

    fn spawn_worker(&self) -> tokio::task::JoinHandle<()> {
        let queue = self.queue.clone();
        let ctx = self.ctx.clone();

        tokio::spawn(async move {
            loop {
                match queue.dequeue().await {
                    Ok(stream) => run_session(stream, ctx.clone()).await,
                    Err(_stopped) => break,
                }
            }
        })
    }
}
