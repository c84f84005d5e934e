//! Link queue between blocking submitters and the thread that owns the pipe
//!
//! Submitters hand framed requests to the queue and return immediately; the
//! link thread (USB writer or firmware simulator) drains it and performs the
//! transfers. Once a frame is queued the link thread owns it.

use async_channel::{Receiver, Sender, TrySendError, bounded};

/// Queue depth: one slot per possible request id
pub const LINK_QUEUE_CAPACITY: usize = 256;

/// Commands for the link thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCommand {
    /// Transmit a framed request on the outbound pipe
    Transmit(Vec<u8>),

    /// Deliver raw bytes to the host as if received on the inbound pipe.
    /// Only simulated links honor this.
    Inject(Vec<u8>),

    /// Stop the link thread
    Shutdown,
}

/// Sending half, cloned into every submitter
#[derive(Debug, Clone)]
pub struct LinkSender {
    tx: Sender<LinkCommand>,
}

impl LinkSender {
    /// Queue a frame for transmission, waiting for room if the queue is full
    pub fn transmit(&self, frame: Vec<u8>) -> crate::Result<()> {
        self.tx
            .send_blocking(LinkCommand::Transmit(frame))
            .map_err(|e| crate::Error::LinkClosed(e.to_string()))
    }

    /// Queue a frame from async context
    pub async fn transmit_async(&self, frame: Vec<u8>) -> crate::Result<()> {
        self.tx
            .send(LinkCommand::Transmit(frame))
            .await
            .map_err(|e| crate::Error::LinkClosed(e.to_string()))
    }

    /// Queue raw inbound bytes (simulated links only)
    pub fn inject(&self, bytes: Vec<u8>) -> crate::Result<()> {
        self.tx
            .send_blocking(LinkCommand::Inject(bytes))
            .map_err(|e| crate::Error::LinkClosed(e.to_string()))
    }

    /// Ask the link thread to stop and refuse further frames
    ///
    /// Frames queued before the shutdown are still delivered to the thread.
    pub fn shutdown(&self) {
        match self.tx.try_send(LinkCommand::Shutdown) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(_)) => {
                // Thread is behind; closing the channel ends its loop once drained
            }
        }
        self.tx.close();
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half, owned by the link thread
#[derive(Debug)]
pub struct LinkReceiver {
    rx: Receiver<LinkCommand>,
}

impl LinkReceiver {
    /// Receive the next command (blocking)
    ///
    /// A closed and drained queue reads as [`LinkCommand::Shutdown`].
    pub fn recv_blocking(&self) -> LinkCommand {
        self.rx.recv_blocking().unwrap_or(LinkCommand::Shutdown)
    }

    /// Try to receive a command without blocking
    pub fn try_recv(&self) -> Option<LinkCommand> {
        self.rx.try_recv().ok()
    }

    /// Receive the next command from async context
    pub async fn recv(&self) -> LinkCommand {
        self.rx.recv().await.unwrap_or(LinkCommand::Shutdown)
    }

    /// Number of queued commands
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Create the link queue
///
/// Returns (LinkSender for submitters, LinkReceiver for the link thread)
pub fn create_link() -> (LinkSender, LinkReceiver) {
    let (tx, rx) = bounded(LINK_QUEUE_CAPACITY);
    (LinkSender { tx }, LinkReceiver { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transmit_reaches_link_thread() {
        let (sender, receiver) = create_link();

        let handle = std::thread::spawn(move || receiver.recv_blocking());

        sender.transmit(vec![1, 0, 0]).unwrap();
        assert_eq!(handle.join().unwrap(), LinkCommand::Transmit(vec![1, 0, 0]));
    }

    #[test]
    fn test_shutdown_closes_queue() {
        let (sender, receiver) = create_link();
        sender.transmit(vec![7]).unwrap();
        sender.shutdown();

        assert!(sender.is_closed());
        assert!(sender.transmit(vec![8]).is_err());

        // Frames queued before shutdown drain first
        assert_eq!(receiver.recv_blocking(), LinkCommand::Transmit(vec![7]));
        assert_eq!(receiver.recv_blocking(), LinkCommand::Shutdown);
        // Closed and empty reads as shutdown
        assert_eq!(receiver.recv_blocking(), LinkCommand::Shutdown);
    }

    #[tokio::test]
    async fn test_async_transmit() {
        let (sender, receiver) = create_link();
        sender.transmit_async(vec![3, 0, 1, 9]).await.unwrap();
        assert_eq!(receiver.len(), 1);
        assert_eq!(receiver.recv().await, LinkCommand::Transmit(vec![3, 0, 1, 9]));
        assert!(receiver.is_empty());
    }
}
