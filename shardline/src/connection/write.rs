use std::{io, sync::Arc};

use tokio::{
    io::{AsyncWrite, AsyncWriteExt, BufWriter},
    sync::{mpsc, Notify},
};

use crate::{connection::stream::StreamPool, error::RequestError};

async fn write_loop(
    writer: &mut (impl AsyncWrite + Unpin),
    queue: &mut mpsc::Receiver<Vec<u8>>,
    shutdown: &Notify,
) -> io::Result<()> {
    loop {
        let envelope = tokio::select! {
            biased;
            _ = shutdown.notified() => return Ok(()),
            envelope = queue.recv() => match envelope {
                Some(envelope) => envelope,
                None => return Ok(()),
            },
        };
        writer.write_all(&envelope).await?;
        // coalesce what has been queued meanwhile into the same flush
        while let Ok(envelope) = queue.try_recv() {
            writer.write_all(&envelope).await?;
        }
        writer.flush().await?;
    }
}

/// Writes queued envelopes until the queue is closed or shutdown is notified.
///
/// A write failure closes the stream pool, failing every pending request.
pub(super) async fn write_task(
    writer: impl AsyncWrite + Unpin,
    buffer_size: usize,
    mut queue: mpsc::Receiver<Vec<u8>>,
    shutdown: Arc<Notify>,
    stream_pool: Arc<StreamPool>,
) {
    let mut writer = BufWriter::with_capacity(buffer_size, writer);
    if let Err(error) = write_loop(&mut writer, &mut queue, &shutdown).await {
        #[cfg(feature = "tracing")]
        tracing::warn!(%error, "connection write failed");
        stream_pool.close(|| RequestError::TransportFailure(io::Error::new(error.kind(), error.to_string())));
        return;
    }
    queue.close();
    writer.shutdown().await.ok();
}
