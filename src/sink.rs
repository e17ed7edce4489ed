//! NDJSON output sink
//!
//! Writes every snapshot as one line to a byte stream (stdout in practice),
//! for consumers that read the process output directly.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::broadcast::{Broadcaster, SubscriberHandle};

/// Copy snapshot lines from `subscriber` into `writer` until the
/// subscription ends. Returns the number of lines written.
pub async fn pump_lines<W>(subscriber: &mut SubscriberHandle, writer: &mut W) -> std::io::Result<u64>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut written = 0;
    while let Some(line) = subscriber.recv().await {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        written += 1;
    }
    Ok(written)
}

/// Subscribe a stdout writer to the broadcaster
pub fn spawn_stdout_sink(broadcaster: &Broadcaster) -> JoinHandle<()> {
    let mut subscriber = broadcaster.subscribe("stdout");
    let registry = std::sync::Arc::clone(broadcaster.registry());

    tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        match pump_lines(&mut subscriber, &mut stdout).await {
            Ok(lines) => debug!("stdout sink finished after {} lines", lines),
            Err(e) => {
                // Closed pipe, most likely; other subscribers are unaffected
                warn!("stdout sink stopped: {}", e);
                registry.leave(subscriber.id());
            }
        }
    })
}
