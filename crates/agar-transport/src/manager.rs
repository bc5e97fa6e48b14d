//! The transport manager: handshake, socket, and the two pipelines.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use agar_protocol::Packet;
use agar_session::{Handshake, ServerEndpoint, SessionInfo};
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::pipeline::{self, Pipeline, PipelineConfig};
use crate::queue::{packet_queue, PacketReceiver, PacketSender};
use crate::websocket::{self, ChunkSink, ChunkSource};
use crate::{TransportConfig, TransportError, TransportState};

/// Buffered lifecycle events per subscriber.
const EVENT_CAPACITY: usize = 16;

/// Lifecycle notifications published by a [`TransportManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The socket is open and both pipelines are running.
    Connected { endpoint: ServerEndpoint },
    /// The session ended: server close, pipeline fault, or `stop()`.
    /// Published once per manager.
    Closed { reason: String },
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

/// State shared between the manager and its pipeline tasks.
#[derive(Debug)]
pub(crate) struct Shared {
    cancel: watch::Sender<bool>,
    events: broadcast::Sender<TransportEvent>,
    state: Mutex<TransportState>,
    send_running: AtomicBool,
    recv_running: AtomicBool,
    closed: AtomicBool,
}

impl Shared {
    fn new() -> Self {
        let (cancel, _) = watch::channel(false);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            cancel,
            events,
            state: Mutex::new(TransportState::Idle),
            send_running: AtomicBool::new(false),
            recv_running: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    fn transition(&self, to: TransportState) {
        let mut state = self.state.lock();
        if state.can_transition_to(to) {
            let from = *state;
            tracing::debug!(%from, %to, "transport state");
            *state = to;
        }
    }

    fn cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Cancels both pipelines, moves a running manager to `Stopping`, and
    /// publishes `Closed` the first time.
    pub(crate) fn connection_closed(&self, reason: String) {
        self.cancel.send_replace(true);
        self.transition(TransportState::Stopping);
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::info!(%reason, "connection closed");
            let _ = self.events.send(TransportEvent::Closed { reason });
        }
    }

    pub(crate) fn pipeline_exited(&self, pipeline: Pipeline) {
        let flag = match pipeline {
            Pipeline::Send => &self.send_running,
            Pipeline::Recv => &self.recv_running,
        };
        flag.store(false, Ordering::Release);
    }
}

struct Pipelines {
    send: JoinHandle<Result<(), TransportError>>,
    recv: JoinHandle<Result<(), TransportError>>,
}

enum Launch {
    Started,
    /// Stop was requested first; the socket is handed back for closing.
    Cancelled(ChunkSink),
}

// ---------------------------------------------------------------------------
// TransportManager
// ---------------------------------------------------------------------------

/// Owns one game-server session.
///
/// Packets queued with [`send`](Self::send) go out in order, split into
/// `send_unit`-sized frames. Inbound messages are reassembled, unframed,
/// and queued on the receiver from [`take_receiver`](Self::take_receiver).
///
/// A manager is single-use. After [`stop`](Self::stop) it stays stopped.
pub struct TransportManager<H: Handshake> {
    handshake: H,
    config: TransportConfig,
    shared: Arc<Shared>,
    session: OnceLock<SessionInfo>,
    outbound: PacketSender,
    outbound_rx: Mutex<Option<PacketReceiver>>,
    inbound_tx: Mutex<Option<PacketSender>>,
    inbound_rx: Mutex<Option<PacketReceiver>>,
    pipelines: Mutex<Option<Pipelines>>,
}

impl<H: Handshake> TransportManager<H> {
    pub fn new(handshake: H, config: TransportConfig) -> Self {
        let (outbound, outbound_rx) = packet_queue();
        let (inbound_tx, inbound_rx) = packet_queue();
        Self {
            handshake,
            config: config.validated(),
            shared: Arc::new(Shared::new()),
            session: OnceLock::new(),
            outbound,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            inbound_tx: Mutex::new(Some(inbound_tx)),
            inbound_rx: Mutex::new(Some(inbound_rx)),
            pipelines: Mutex::new(None),
        }
    }

    /// Performs the handshake, opens the socket, and starts both pipelines.
    ///
    /// # Errors
    /// [`TransportError::AlreadyStarted`] unless the manager is `Idle`.
    /// Handshake and connect failures leave the manager `Stopped`, as does
    /// a [`stop`](Self::stop) that lands while connecting, which yields
    /// [`TransportError::Shutdown`].
    pub async fn start(&self) -> Result<(), TransportError> {
        {
            let mut state = self.shared.state.lock();
            if *state != TransportState::Idle {
                return Err(TransportError::AlreadyStarted);
            }
            *state = TransportState::Connecting;
        }

        let result = self.connect().await;
        if let Err(e) = &result {
            match e {
                TransportError::Shutdown => tracing::info!("stop requested while connecting"),
                e => tracing::error!(error = %e, "transport start failed"),
            }
            self.shared.transition(TransportState::Stopped);
        }
        result
    }

    async fn connect(&self) -> Result<(), TransportError> {
        let info = self.handshake.perform().await?;
        if self.shared.cancelled() {
            return Err(TransportError::Shutdown);
        }
        tracing::debug!(endpoint = %info.endpoint, "opening socket");

        let (sink, source) = websocket::connect(&info.endpoint, &self.config.origin).await?;
        let endpoint = info.endpoint.clone();
        let _ = self.session.set(info);

        if let Launch::Cancelled(mut sink) = self.launch(sink, source, &endpoint)? {
            sink.close().await;
            return Err(TransportError::Shutdown);
        }
        Ok(())
    }

    /// Spawns both pipelines and enters `Running`, unless a stop request
    /// got in first. Holds the state lock throughout, so `stop()` either
    /// sees the pipelines or this sees its cancel flag.
    fn launch(
        &self,
        sink: ChunkSink,
        source: ChunkSource,
        endpoint: &ServerEndpoint,
    ) -> Result<Launch, TransportError> {
        let mut state = self.shared.state.lock();
        if self.shared.cancelled() {
            return Ok(Launch::Cancelled(sink));
        }

        let outbound = self
            .outbound_rx
            .lock()
            .take()
            .ok_or(TransportError::AlreadyStarted)?;
        let inbound = self
            .inbound_tx
            .lock()
            .take()
            .ok_or(TransportError::AlreadyStarted)?;

        let config = PipelineConfig {
            send_unit: self.config.send_unit,
            recv_unit: self.config.recv_unit,
            poll_interval: self.config.poll_interval,
        };
        self.shared.send_running.store(true, Ordering::Release);
        self.shared.recv_running.store(true, Ordering::Release);

        let send = tokio::spawn(pipeline::supervise(
            Pipeline::Send,
            Arc::clone(&self.shared),
            pipeline::send_loop(sink, outbound, self.shared.cancel.subscribe(), config),
        ));
        let recv = tokio::spawn(pipeline::supervise(
            Pipeline::Recv,
            Arc::clone(&self.shared),
            pipeline::recv_loop(
                source,
                inbound,
                self.shared.cancel.subscribe(),
                Arc::clone(&self.shared),
                config,
            ),
        ));
        *self.pipelines.lock() = Some(Pipelines { send, recv });

        *state = TransportState::Running;
        tracing::info!(%endpoint, "transport running");
        let _ = self.shared.events.send(TransportEvent::Connected {
            endpoint: endpoint.clone(),
        });
        Ok(Launch::Started)
    }

    /// Cancels both pipelines and waits for them to finish.
    ///
    /// While connecting, this only raises the cancel flag: `start()` gives
    /// up before spawning anything. Calling it again, or on a manager that
    /// never started, is a no-op.
    ///
    /// # Errors
    /// [`TransportError::Aggregate`] holding every fault the pipelines hit.
    /// Cancellation itself is not a fault.
    pub async fn stop(&self) -> Result<(), TransportError> {
        let pipelines = {
            let state = self.shared.state.lock();
            if *state == TransportState::Idle {
                return Ok(());
            }
            self.shared.cancel.send_replace(true);
            self.pipelines.lock().take()
        };
        let Some(pipelines) = pipelines else {
            self.shared.transition(TransportState::Stopped);
            return Ok(());
        };

        self.shared.transition(TransportState::Stopping);

        let mut faults = Vec::new();
        for (pipeline, handle) in [
            (Pipeline::Send, pipelines.send),
            (Pipeline::Recv, pipelines.recv),
        ] {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => faults.push(e),
                Err(e) if e.is_cancelled() => {}
                Err(e) => faults.push(TransportError::TaskFailed(format!("{pipeline}: {e}"))),
            }
        }

        self.shared.transition(TransportState::Stopped);
        self.shared.connection_closed("stopped".to_string());

        if faults.is_empty() {
            Ok(())
        } else {
            Err(TransportError::Aggregate(faults))
        }
    }

    /// `true` while both pipelines run and no stop has been requested.
    pub fn alive(&self) -> bool {
        self.state() == TransportState::Running
            && !self.shared.cancelled()
            && self.shared.send_running.load(Ordering::Acquire)
            && self.shared.recv_running.load(Ordering::Acquire)
    }

    pub fn state(&self) -> TransportState {
        *self.shared.state.lock()
    }

    /// The session the handshake produced, once started.
    pub fn session(&self) -> Option<&SessionInfo> {
        self.session.get()
    }

    /// Enqueues a packet for sending.
    ///
    /// # Errors
    /// [`TransportError::Shutdown`] once the send pipeline has exited.
    pub fn send(&self, packet: Packet) -> Result<(), TransportError> {
        self.outbound.send(packet)
    }

    /// A handle onto the outbound queue.
    pub fn sender(&self) -> PacketSender {
        self.outbound.clone()
    }

    /// Takes the inbound queue. Only the first call gets it.
    pub fn take_receiver(&self) -> Option<PacketReceiver> {
        self.inbound_rx.lock().take()
    }

    /// Subscribes to lifecycle events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.shared.events.subscribe()
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl<H: Handshake> Drop for TransportManager<H> {
    fn drop(&mut self) {
        self.shared.cancel.send_replace(true);
    }
}
