//! Host error types

use nix::errno::Errno;
use protocol::ProtocolError;
use std::time::Duration;
use thiserror::Error;

/// Errors returned to callers of the channel and device surfaces
#[derive(Debug, Error)]
pub enum HostError {
    /// Command payload does not fit a frame
    #[error("Invalid request: {0}")]
    InvalidSize(ProtocolError),

    /// Device unit the board does not have
    #[error("No {kind} unit {unit}")]
    NoSuchUnit { kind: &'static str, unit: u8 },

    /// Every request id is in flight
    #[error("No free request id")]
    Busy,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("No reply within {0:?}")]
    Timeout(Duration),

    /// Channel closed while waiting
    #[error("Channel closed")]
    Closed,

    /// Receive path could not be re-armed
    #[error("Channel dead: inbound pipe lost")]
    ChannelDead,

    /// Reply arrived but could not be interpreted
    #[error("Bad reply: {0}")]
    BadReply(ProtocolError),
}

impl HostError {
    /// POSIX errno for the character-device surface
    pub fn errno(&self) -> Errno {
        match self {
            HostError::InvalidSize(_) | HostError::NoSuchUnit { .. } => Errno::EINVAL,
            HostError::Busy => Errno::EBUSY,
            HostError::Closed => Errno::EINTR,
            HostError::Transport(TransportError::OutOfMemory) => Errno::ENOMEM,
            HostError::Transport(_)
            | HostError::Timeout(_)
            | HostError::ChannelDead
            | HostError::BadReply(_) => Errno::EIO,
        }
    }
}

/// Errors from a concrete transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Device {vendor_id:04x}:{product_id:04x} not found")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    #[error("Permission denied opening device")]
    Access,

    #[error("Device disconnected")]
    Disconnected,

    /// Link thread has stopped
    #[error("Link closed")]
    LinkClosed,

    #[error("Could not allocate transfer")]
    OutOfMemory,

    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        source: std::io::Error,
    },

    #[error("Re-arm failed: {0}")]
    Rearm(String),

    /// Transport is shutting down
    #[error("Transport shut down")]
    Shutdown,
}

impl From<common::Error> for TransportError {
    fn from(err: common::Error) -> Self {
        tracing::debug!("Link queue error: {}", err);
        TransportError::LinkClosed
    }
}

pub type Result<T> = std::result::Result<T, HostError>;
