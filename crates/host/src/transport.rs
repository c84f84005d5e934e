//! Pipe abstractions between the channel and a concrete transport
//!
//! The outbound side is fire-and-forget: a submitted frame belongs to the
//! transport, which releases it once the transfer finishes. The inbound side
//! delivers one [`InboundPacket`] per completed receive and must be re-armed
//! after every packet.

use crate::error::TransportError;

/// Outbound interrupt pipe
pub trait OutboundPipe: Send + Sync {
    /// Queue a framed request for transmission
    fn submit(&self, frame: Vec<u8>) -> Result<(), TransportError>;

    /// Stop accepting frames
    fn close(&self);
}

/// Inbound interrupt pipe as seen by the dispatcher
pub trait ReceivePipe {
    /// Resubmit the receive so the next packet can arrive
    fn rearm(&mut self) -> Result<(), TransportError>;
}

/// Completion status of an inbound transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketStatus {
    Completed,
    /// Device reset the connection
    ConnectionReset,
    /// Device or transport going away
    Shutdown,
    /// Transfer cancelled before completion
    Cancelled,
    /// Device sent more than the buffer holds
    Overflow,
    Failed,
}

impl PacketStatus {
    /// Statuses expected during resets and teardown
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            PacketStatus::ConnectionReset | PacketStatus::Shutdown | PacketStatus::Cancelled
        )
    }
}

/// One completed receive
#[derive(Debug, Clone, Copy)]
pub struct InboundPacket<'a> {
    pub status: PacketStatus,
    pub data: &'a [u8],
}

impl<'a> InboundPacket<'a> {
    pub fn completed(data: &'a [u8]) -> Self {
        Self {
            status: PacketStatus::Completed,
            data,
        }
    }

    pub fn failed(status: PacketStatus) -> Self {
        Self { status, data: &[] }
    }
}
