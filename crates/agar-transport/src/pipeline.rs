//! The two pipelines a running transport drives.
//!
//! ```text
//! outbound queue ──► send_loop ──► frame ──► chunks ──► socket
//! socket ──► chunks ──► recv_loop ──► assemble ──► unframe ──► inbound queue
//! ```
//!
//! Each loop checks the cancellation flag between logical steps and waits
//! at most one poll interval at a time. A packet already being written is
//! always finished, never cut mid-message.

use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use agar_protocol::unframe;
use tokio::sync::watch;

use crate::manager::Shared;
use crate::queue::{PacketReceiver, PacketSender};
use crate::websocket::{Chunk, ChunkSink, ChunkSource};
use crate::TransportError;

/// Splits a message of `len` bytes into spans of at most `unit` bytes.
///
/// Yields `(range, end_of_message)`; only the last span is final. An
/// empty message is a single empty final span.
pub(crate) fn chunk_spans(len: usize, unit: usize) -> Vec<(Range<usize>, bool)> {
    if len == 0 {
        return vec![(0..0, true)];
    }
    let unit = unit.max(1);
    (0..len)
        .step_by(unit)
        .map(|start| {
            let end = (start + unit).min(len);
            (start..end, end == len)
        })
        .collect()
}

/// Collects chunks until one is marked end-of-message.
#[derive(Debug, Default)]
pub(crate) struct MessageAssembler {
    buf: Vec<u8>,
}

impl MessageAssembler {
    /// Appends a chunk. Returns the whole message once it is complete.
    pub(crate) fn push(&mut self, chunk: &[u8], end_of_message: bool) -> Option<Vec<u8>> {
        self.buf.extend_from_slice(chunk);
        end_of_message.then(|| std::mem::take(&mut self.buf))
    }
}

/// Settings the loops need, copied out of the transport config.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PipelineConfig {
    pub(crate) send_unit: usize,
    pub(crate) recv_unit: usize,
    pub(crate) poll_interval: Duration,
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Drains the outbound queue onto the socket until cancelled.
pub(crate) async fn send_loop(
    mut sink: ChunkSink,
    mut queue: PacketReceiver,
    cancel: watch::Receiver<bool>,
    config: PipelineConfig,
) -> Result<(), TransportError> {
    loop {
        if *cancel.borrow() {
            sink.close().await;
            return Ok(());
        }

        let packet = match tokio::time::timeout(config.poll_interval, queue.recv()).await {
            Ok(Some(packet)) => packet,
            Ok(None) => {
                tracing::debug!("outbound queue closed");
                return Ok(());
            }
            Err(_) => continue,
        };

        let framed = packet.frame();
        for (span, end_of_message) in chunk_spans(framed.len(), config.send_unit) {
            let first = span.start == 0;
            sink.send_chunk(&framed[span], first, end_of_message).await?;
        }
        tracing::trace!(opcode = packet.opcode(), len = framed.len(), "packet sent");
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Fills the inbound queue from the socket until cancelled or closed.
pub(crate) async fn recv_loop(
    mut source: ChunkSource,
    queue: PacketSender,
    cancel: watch::Receiver<bool>,
    shared: Arc<Shared>,
    config: PipelineConfig,
) -> Result<(), TransportError> {
    let mut buf = vec![0u8; config.recv_unit];
    let mut assembler = MessageAssembler::default();

    loop {
        if *cancel.borrow() {
            return Ok(());
        }

        let chunk =
            match tokio::time::timeout(config.poll_interval, source.recv_chunk(&mut buf)).await {
                Ok(result) => result?,
                Err(_) => continue,
            };

        match chunk {
            Chunk::Data {
                len,
                end_of_message,
            } => {
                let Some(message) = assembler.push(&buf[..len], end_of_message) else {
                    continue;
                };
                let packet = unframe(&message)?;
                tracing::trace!(
                    opcode = packet.opcode(),
                    len = message.len(),
                    "packet received"
                );
                if queue.send(packet).is_err() {
                    tracing::debug!("inbound queue dropped, discarding packet");
                }
            }
            Chunk::Close { reason } => {
                tracing::warn!(%reason, "server closed connection");
                source.finish_close(config.poll_interval).await;
                shared.connection_closed(format!("server closed connection: {reason}"));
                return Ok(());
            }
        }
    }
}

/// Which of the two loops a task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pipeline {
    Send,
    Recv,
}

impl std::fmt::Display for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Send => write!(f, "send"),
            Self::Recv => write!(f, "recv"),
        }
    }
}

/// Runs a pipeline; on failure, tears the session down before reporting.
pub(crate) async fn supervise(
    pipeline: Pipeline,
    shared: Arc<Shared>,
    run: impl std::future::Future<Output = Result<(), TransportError>>,
) -> Result<(), TransportError> {
    let result = run.await;
    shared.pipeline_exited(pipeline);
    if let Err(e) = &result {
        tracing::error!(%pipeline, error = %e, "pipeline failed");
        shared.connection_closed(format!("{pipeline} pipeline failed: {e}"));
    }
    result
}
