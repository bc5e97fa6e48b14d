//! The client dispatch loop.
//!
//! [`AgarClient`] owns no socket. It sits between the caller and a
//! [`TransportManager`]: commands submitted by the caller are forwarded to
//! the outbound queue in order, and packets from the inbound queue are
//! decoded and applied to the [`WorldStore`].

use std::sync::Arc;

use agar_protocol::{
    decode_game_area_size, decode_owns_entity, decode_world_update, Command, Packet,
    ProtocolError, ServerOpcode,
};
use agar_session::{ConnectionToken, Handshake};
use agar_transport::{PacketReceiver, PacketSender, TransportError, TransportManager};
use agar_world::WorldStore;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::{ClientConfig, ClientError};

/// Queues the loop consumes. Handed to the task on start and handed back
/// when it exits, so the loop can be restarted.
struct LoopQueues {
    commands: mpsc::UnboundedReceiver<Command>,
    inbound: PacketReceiver,
}

struct RunningLoop {
    stop: watch::Sender<bool>,
    handle: JoinHandle<LoopQueues>,
}

/// A game client bound to one transport session.
pub struct AgarClient {
    config: ClientConfig,
    outbound: PacketSender,
    commands: mpsc::UnboundedSender<Command>,
    queues: Mutex<Option<LoopQueues>>,
    running: Mutex<Option<RunningLoop>>,
    world: Arc<WorldStore>,
}

impl AgarClient {
    /// Creates a client over an explicit pair of packet queues.
    pub fn new(outbound: PacketSender, inbound: PacketReceiver, config: ClientConfig) -> Self {
        let (commands, commands_rx) = mpsc::unbounded_channel();
        Self {
            config,
            outbound,
            commands,
            queues: Mutex::new(Some(LoopQueues {
                commands: commands_rx,
                inbound,
            })),
            running: Mutex::new(None),
            world: Arc::new(WorldStore::new()),
        }
    }

    /// Creates a client over a manager's queues.
    ///
    /// # Errors
    /// [`ClientError::InboundTaken`] if the manager's inbound queue was
    /// already taken.
    pub fn attach<H: Handshake>(
        manager: &TransportManager<H>,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        let inbound = manager.take_receiver().ok_or(ClientError::InboundTaken)?;
        Ok(Self::new(manager.sender(), inbound, config))
    }

    /// Enqueues the three initialization packets, in the order the server
    /// expects them: init marker, server version, connection token.
    pub fn start_initialization(&self, token: &ConnectionToken) -> Result<(), ClientError> {
        self.outbound.send(Packet::init1())?;
        self.outbound.send(Packet::init2(self.config.server_version))?;
        self.outbound.send(Packet::connection_token(token.as_str()))?;
        tracing::debug!("initialization packets queued");
        Ok(())
    }

    /// Submits a user action. Actions are sent in submission order once
    /// the processing loop picks them up.
    pub fn submit(&self, command: Command) -> Result<(), ClientError> {
        self.commands
            .send(command)
            .map_err(|_| ClientError::Transport(TransportError::Shutdown))
    }

    /// Spawns the dispatch loop.
    ///
    /// # Errors
    /// [`ClientError::AlreadyRunning`] if the loop is already running,
    /// [`ClientError::LoopFailed`] if an earlier loop task panicked.
    pub fn start_processing_loop(&self) -> Result<(), ClientError> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Err(ClientError::AlreadyRunning);
        }
        let queues = self.queues.lock().take().ok_or(ClientError::LoopFailed)?;

        let (stop, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(
            queues,
            self.outbound.clone(),
            Arc::clone(&self.world),
            stop_rx,
            self.config.clone(),
        ));
        *running = Some(RunningLoop { stop, handle });
        tracing::info!("dispatch loop started");
        Ok(())
    }

    /// Signals the dispatch loop to stop and waits for it. A no-op when
    /// the loop is not running.
    pub async fn stop_processing_loop(&self) {
        let Some(running) = self.running.lock().take() else {
            return;
        };
        running.stop.send_replace(true);
        match running.handle.await {
            Ok(queues) => {
                *self.queues.lock() = Some(queues);
                tracing::info!("dispatch loop stopped");
            }
            Err(e) => tracing::error!(
                error = %e,
                "dispatch loop task failed, client cannot be restarted"
            ),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// The world this client keeps up to date.
    pub fn world(&self) -> Arc<WorldStore> {
        Arc::clone(&self.world)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Drop for AgarClient {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.stop.send_replace(true);
        }
    }
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

async fn run_loop(
    mut queues: LoopQueues,
    outbound: PacketSender,
    world: Arc<WorldStore>,
    mut stop: watch::Receiver<bool>,
    config: ClientConfig,
) -> LoopQueues {
    let mut inbound_open = true;

    loop {
        if *stop.borrow() {
            break;
        }

        tokio::select! {
            changed = stop.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            Some(command) = queues.commands.recv() => {
                forward(&outbound, command);
                while let Ok(command) = queues.commands.try_recv() {
                    forward(&outbound, command);
                }
            }
            packet = queues.inbound.recv(), if inbound_open => match packet {
                Some(packet) => {
                    handle_packet(&world, &packet);
                    while let Some(packet) = queues.inbound.try_recv() {
                        handle_packet(&world, &packet);
                    }
                }
                None => {
                    tracing::info!("inbound queue closed");
                    inbound_open = false;
                }
            },
            _ = tokio::time::sleep(config.poll_interval) => {}
        }
    }

    queues
}

fn forward(outbound: &PacketSender, command: Command) {
    let packet = command.to_packet();
    let opcode = packet.opcode();
    if outbound.send(packet).is_err() {
        tracing::warn!(opcode, "transport shut down, command dropped");
    }
}

fn handle_packet(world: &WorldStore, packet: &Packet) {
    if let Err(e) = dispatch_packet(world, packet) {
        tracing::warn!(opcode = packet.opcode(), error = %e, "packet discarded");
    }
}

/// Decodes one inbound packet and applies it to `world`.
///
/// Opcodes with no world effect, and unknown opcodes, are ignored.
///
/// # Errors
/// Whatever the decoder reports, typically
/// [`ProtocolError::TruncatedPayload`]. The world is left untouched.
pub fn dispatch_packet(world: &WorldStore, packet: &Packet) -> Result<(), ProtocolError> {
    let payload = packet.payload();
    match ServerOpcode::from_u8(packet.opcode()) {
        Some(ServerOpcode::GameAreaSize) => {
            world.set_bounds(decode_game_area_size(payload)?);
        }
        Some(ServerOpcode::WorldUpdate) => {
            let update = decode_world_update(payload)?;
            world.register_eats(&update.eats);
            world.register_updates(&update.updates);
            world.register_removals(&update.removals);
        }
        Some(ServerOpcode::OwnsEntity) => {
            world.register_owned(decode_owns_entity(payload)?);
        }
        Some(ServerOpcode::Reset) => world.reset(),
        Some(opcode) => {
            tracing::debug!(%opcode, len = payload.len(), "packet ignored");
        }
        None => {
            tracing::debug!(opcode = packet.opcode(), "unknown opcode ignored");
        }
    }
    Ok(())
}
