//! Firmware error types

use protocol::ProtocolError;
use thiserror::Error;

/// Reasons the interpreter refuses a frame
///
/// A refused frame gets no reply; the host's waiter is left to its own
/// timeout policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FirmwareError {
    /// Frame or command payload could not be decoded
    #[error("Bad request: {0}")]
    Protocol(#[from] ProtocolError),

    /// Command addressed a unit the board does not have
    #[error("No {kind} unit {unit}")]
    NoSuchUnit { kind: &'static str, unit: u8 },
}

pub type Result<T> = std::result::Result<T, FirmwareError>;
