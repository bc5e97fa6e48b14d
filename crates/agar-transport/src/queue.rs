//! Packet queues between the pipelines and their callers.
//!
//! Both directions are unbounded FIFO channels: a packet is delivered in
//! the order it was enqueued, and receiving one is the "packet arrived"
//! signal.

use agar_protocol::Packet;
use tokio::sync::mpsc;

use crate::TransportError;

/// Creates a connected sender/receiver pair.
pub fn packet_queue() -> (PacketSender, PacketReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (PacketSender { tx }, PacketReceiver { rx })
}

/// Enqueues packets. Cheap to clone; clones feed the same queue.
#[derive(Debug, Clone)]
pub struct PacketSender {
    tx: mpsc::UnboundedSender<Packet>,
}

impl PacketSender {
    /// Enqueues a packet without blocking.
    ///
    /// # Errors
    /// [`TransportError::Shutdown`] if the receiving side is gone.
    pub fn send(&self, packet: Packet) -> Result<(), TransportError> {
        self.tx.send(packet).map_err(|_| TransportError::Shutdown)
    }

    /// `true` once the receiving side has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Dequeues packets in arrival order.
#[derive(Debug)]
pub struct PacketReceiver {
    rx: mpsc::UnboundedReceiver<Packet>,
}

impl PacketReceiver {
    /// Waits for the next packet. `None` once every sender is dropped and
    /// the queue is drained.
    pub async fn recv(&mut self) -> Option<Packet> {
        self.rx.recv().await
    }

    /// Takes the next packet if one is already queued.
    pub fn try_recv(&mut self) -> Option<Packet> {
        self.rx.try_recv().ok()
    }

    /// Number of packets waiting.
    pub fn available(&self) -> usize {
        self.rx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_preserves_order() {
        let (tx, mut rx) = packet_queue();
        for op in [1u8, 2, 3] {
            tx.send(Packet::empty(op)).unwrap();
        }
        assert_eq!(rx.available(), 3);
        assert_eq!(rx.recv().await.unwrap().opcode(), 1);
        assert_eq!(rx.try_recv().unwrap().opcode(), 2);
        assert_eq!(rx.try_recv().unwrap().opcode(), 3);
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_send_after_receiver_dropped_is_shutdown() {
        let (tx, rx) = packet_queue();
        drop(rx);
        assert!(tx.is_closed());
        assert!(matches!(tx.send(Packet::empty(0)), Err(TransportError::Shutdown)));
    }
}
