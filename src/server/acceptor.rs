//! Acceptor (§4.H): a single task looping on the blocking `accept` primitive.
//!
//! Grounded in the teacher's `Server::launch` in `server_impl.rs` (prior
//! revision), which ran exactly this shape: loop on `listener.accept()`,
//! route the stream to a bounded queue or a dedicated "alarmist" path when
//! full. That split survives here as `try_enqueue` vs. a direct 503 write,
//! per §9's "fix to one acceptor feeding one queue" design note.

use std::sync::Arc;

use tokio::{io::AsyncWriteExt, net::TcpListener};

use crate::{
    queue::{ConnectionQueue, Full},
    stats::Stats,
};

/// A fixed response, never allocated: the queue is full and this request
/// was never handed to a worker, so nothing else about it is known.
const QUEUE_FULL_RESPONSE: &[u8] = b"\
HTTP/1.1 503 Service Unavailable\r\n\
Server: ConcurrentHTTP/1.0\r\n\
Content-Length: 0\r\n\
Connection: close\r\n\r\n";

/// Runs until `listener.accept()` returns an error, which happens once the
/// supervisor drops/shuts down the listener (§5 shutdown semantics).
pub async fn run(listener: TcpListener, queue: Arc<ConnectionQueue>, stats: Arc<Stats>) {
    loop {
        let stream = match listener.accept().await {
            Ok((stream, _addr)) => stream,
            Err(_) => {
                tracing::info!("acceptor exiting: listener closed");
                break;
            }
        };

        let _ = stream.set_nodelay(true);
        stats.record_accepted();

        match queue.try_enqueue(stream) {
            Ok(()) => {}
            Err(Full(mut stream)) => {
                stats.record_queue_full();
                let _ = stream.write_all(QUEUE_FULL_RESPONSE).await;
                let _ = stream.shutdown().await;
            }
        }
    }
}
