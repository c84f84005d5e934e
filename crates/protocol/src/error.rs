//! Protocol error types

use crate::frame::RequestId;
use thiserror::Error;

/// Protocol-level errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Payload does not fit the frame or the one-byte size field
    #[error("Invalid payload size: {size} bytes (max: {max})")]
    InvalidSize { size: usize, max: usize },

    /// Frame is structurally broken and must be dropped
    #[error("Malformed frame: {0}")]
    Malformed(Malformation),

    /// Frame carries a different request id than the caller expected
    #[error("Frame for request {actual} while expecting {expected}")]
    WrongRequest {
        expected: RequestId,
        actual: RequestId,
    },

    /// Frame layout that cannot be expressed with the header
    #[error("Invalid frame layout: {frame_size} byte frames")]
    InvalidLayout { frame_size: usize },

    /// Command payload with an unknown destination tag
    #[error("Unknown command destination {0:#04x}")]
    UnknownDestination(u8),

    /// Command payload shorter than its destination requires
    #[error("Truncated '{destination}' command: needed {needed} bytes, got {actual}")]
    TruncatedCommand {
        destination: char,
        needed: usize,
        actual: usize,
    },

    /// Motor command with a direction byte other than f/r/s
    #[error("Invalid motor direction {0:#04x}")]
    InvalidDirection(u8),

    /// Reply payload that does not have the expected shape
    #[error("Invalid reply: expected {expected} bytes, got {actual}")]
    InvalidReply { expected: usize, actual: usize },
}

/// Reason a frame was rejected as malformed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Malformation {
    /// Fewer bytes than the header needs
    #[error("{len} bytes is shorter than the {header_len} byte header")]
    TooShort { len: usize, header_len: usize },

    /// Declared payload length runs past the received bytes or the layout
    #[error("declared size {declared} exceeds the {available} bytes available")]
    SizeOverflow { declared: usize, available: usize },
}

impl From<Malformation> for ProtocolError {
    fn from(kind: Malformation) -> Self {
        ProtocolError::Malformed(kind)
    }
}

/// Type alias for protocol results
pub type Result<T> = std::result::Result<T, ProtocolError>;
