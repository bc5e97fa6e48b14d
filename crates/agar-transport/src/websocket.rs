//! WebSocket plumbing using `tokio-tungstenite`.
//!
//! The pipelines work in chunks rather than whole messages: the sink
//! writes one frame per chunk, the source hands out at most one buffer's
//! worth of bytes per read plus an end-of-message marker.

use agar_session::ServerEndpoint;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::ORIGIN;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::frame::coding::{Data, OpCode};
use tokio_tungstenite::tungstenite::protocol::frame::Frame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::TransportError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens `ws://host:port/` with the given `Origin` header.
pub(crate) async fn connect(
    endpoint: &ServerEndpoint,
    origin: &str,
) -> Result<(ChunkSink, ChunkSource), TransportError> {
    let url = endpoint.ws_url();
    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(connect_failed)?;
    let origin = HeaderValue::from_str(origin)
        .map_err(connect_failed)?;
    request.headers_mut().insert(ORIGIN, origin);

    let (ws, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(connect_failed)?;
    tracing::debug!(%url, "WebSocket connected");

    let (sink, stream) = ws.split();
    Ok((
        ChunkSink { sink },
        ChunkSource {
            stream,
            pending: Vec::new(),
            pos: 0,
        },
    ))
}

fn connect_failed(
    e: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> TransportError {
    TransportError::ConnectFailed(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        e,
    ))
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Write half: one binary frame per chunk.
pub(crate) struct ChunkSink {
    sink: SplitSink<WsStream, Message>,
}

impl ChunkSink {
    /// Writes one fragment of a binary message.
    ///
    /// The first fragment carries the binary opcode, the rest are
    /// continuations; `end_of_message` sets FIN.
    pub(crate) async fn send_chunk(
        &mut self,
        data: &[u8],
        first: bool,
        end_of_message: bool,
    ) -> Result<(), TransportError> {
        let opcode = if first {
            OpCode::Data(Data::Binary)
        } else {
            OpCode::Data(Data::Continue)
        };
        let frame = Frame::message(data.to_vec(), opcode, end_of_message);
        self.sink.send(Message::Frame(frame)).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    /// Sends a close frame. Errors are ignored: the peer may already be gone.
    pub(crate) async fn close(&mut self) {
        let _ = self.sink.close().await;
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// What one read from the socket produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Chunk {
    /// `len` bytes were written into the caller's buffer.
    Data { len: usize, end_of_message: bool },
    /// The peer closed the connection.
    Close { reason: String },
}

/// Read half: hands out messages one buffer at a time.
pub(crate) struct ChunkSource {
    stream: SplitStream<WsStream>,
    /// Message currently being handed out, and how far we got.
    pending: Vec<u8>,
    pos: usize,
}

impl ChunkSource {
    /// Reads the next chunk into `buf`.
    ///
    /// Cancel-safe: dropping the future before it resolves loses nothing.
    pub(crate) async fn recv_chunk(
        &mut self,
        buf: &mut [u8],
    ) -> Result<Chunk, TransportError> {
        if self.pos < self.pending.len() {
            return Ok(self.drain_into(buf));
        }

        loop {
            match self.stream.next().await {
                Some(Ok(Message::Binary(data))) => {
                    self.pending = data.into();
                    self.pos = 0;
                    return Ok(self.drain_into(buf));
                }
                // The game protocol is binary only.
                Some(Ok(Message::Text(text))) => {
                    tracing::debug!(len = text.len(), "text message skipped");
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = match frame {
                        Some(f) => format!("{}: {}", u16::from(f.code), &*f.reason),
                        None => "closed without status".to_string(),
                    };
                    return Ok(Chunk::Close { reason });
                }
                None => {
                    return Ok(Chunk::Close {
                        reason: "stream ended".to_string(),
                    });
                }
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            }
        }
    }

    /// Drives the stream after a close frame so tungstenite flushes its
    /// close reply, completing the handshake.
    pub(crate) async fn finish_close(&mut self, limit: std::time::Duration) {
        let _ = tokio::time::timeout(limit, async {
            while let Some(Ok(_)) = self.stream.next().await {}
        })
        .await;
    }

    fn drain_into(&mut self, buf: &mut [u8]) -> Chunk {
        let len = buf.len().min(self.pending.len() - self.pos);
        buf[..len].copy_from_slice(&self.pending[self.pos..self.pos + len]);
        self.pos += len;
        let end_of_message = self.pos == self.pending.len();
        if end_of_message {
            self.pending.clear();
            self.pos = 0;
        }
        Chunk::Data {
            len,
            end_of_message,
        }
    }
}
