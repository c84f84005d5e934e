//! Interrupt transfer helpers and rusb error mapping

use crate::error::TransportError;
use crate::transport::PacketStatus;
use crate::usb::device::TeensyDevice;
use std::time::Duration;
use tracing::{trace, warn};

/// Completion status of a receive that ended with `err`
pub fn status_for(err: rusb::Error) -> PacketStatus {
    match err {
        rusb::Error::NoDevice => PacketStatus::Shutdown,
        rusb::Error::Interrupted => PacketStatus::Cancelled,
        rusb::Error::Io | rusb::Error::Pipe => PacketStatus::ConnectionReset,
        rusb::Error::Overflow => PacketStatus::Overflow,
        _ => PacketStatus::Failed,
    }
}

/// Map an rusb error on the outbound pipe
pub fn map_rusb_error(err: rusb::Error) -> TransportError {
    match err {
        rusb::Error::NoDevice => TransportError::Disconnected,
        rusb::Error::Access => TransportError::Access,
        rusb::Error::NoMem => TransportError::OutOfMemory,
        other => TransportError::Usb(other),
    }
}

/// Write one frame to the OUT endpoint
pub fn write_frame(
    device: &TeensyDevice,
    endpoint: u8,
    frame: &[u8],
    timeout: Duration,
) -> Result<(), TransportError> {
    match device.write_interrupt(endpoint, frame, timeout) {
        Ok(written) if written == frame.len() => {
            trace!("Wrote {} bytes to {:#04x}", written, endpoint);
            Ok(())
        }
        Ok(written) => {
            warn!(
                "Short write on {:#04x}: {} of {} bytes",
                endpoint,
                written,
                frame.len()
            );
            Err(TransportError::Usb(rusb::Error::Io))
        }
        Err(e) => Err(map_rusb_error(e)),
    }
}

/// Read one frame from the IN endpoint
///
/// Returns `Ok(None)` when nothing arrived within `timeout`.
pub fn read_frame(
    device: &TeensyDevice,
    endpoint: u8,
    buf: &mut [u8],
    timeout: Duration,
) -> Result<Option<usize>, rusb::Error> {
    match device.read_interrupt(endpoint, buf, timeout) {
        Ok(len) => Ok(Some(len)),
        Err(rusb::Error::Timeout) => Ok(None),
        Err(e) => Err(e),
    }
}
