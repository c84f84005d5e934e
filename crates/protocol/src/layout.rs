//! Frame layout versioning
//!
//! Host and firmware must agree on the frame size and header shape. Instead
//! of matching magic numbers across two source trees, both sides validate
//! against a [`FrameLayout`] at encode and decode time.

use crate::error::{ProtocolError, Result};

/// Total frame size on the wire (the device's interrupt packet size)
pub const FRAME_SIZE: usize = 64;

/// Header bytes: id, reserved, size
pub const HEADER_LEN: usize = 3;

/// Largest value the one-byte size field can carry
pub const SIZE_FIELD_MAX: usize = u8::MAX as usize;

/// Largest payload that fits a standard frame
pub const MAX_PAYLOAD: usize = FRAME_SIZE - HEADER_LEN;

/// Layout shipped by this build of host and firmware
pub const CURRENT_LAYOUT: FrameLayout = FrameLayout {
    version: 1,
    frame_size: FRAME_SIZE,
    header_len: HEADER_LEN,
};

/// Shape of a frame: total size and header length, tagged with a version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    version: u8,
    frame_size: usize,
    header_len: usize,
}

impl FrameLayout {
    /// Current layout with a different total frame size
    ///
    /// The frame must hold the header plus at least one payload byte, and
    /// the payload area can never exceed what the size field can express.
    pub fn with_frame_size(frame_size: usize) -> Result<Self> {
        if frame_size <= HEADER_LEN || frame_size > HEADER_LEN + SIZE_FIELD_MAX {
            return Err(ProtocolError::InvalidLayout { frame_size });
        }
        Ok(Self {
            frame_size,
            ..CURRENT_LAYOUT
        })
    }

    pub const fn version(&self) -> u8 {
        self.version
    }

    pub const fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub const fn header_len(&self) -> usize {
        self.header_len
    }

    /// Largest payload this layout carries
    pub const fn max_payload(&self) -> usize {
        let room = self.frame_size - self.header_len;
        if room < SIZE_FIELD_MAX {
            room
        } else {
            SIZE_FIELD_MAX
        }
    }

    /// Reject payload sizes the frame cannot carry
    pub fn check_payload_len(&self, size: usize) -> Result<()> {
        if size > SIZE_FIELD_MAX || size + self.header_len > self.frame_size {
            return Err(ProtocolError::InvalidSize {
                size,
                max: self.max_payload(),
            });
        }
        Ok(())
    }
}

impl Default for FrameLayout {
    fn default() -> Self {
        CURRENT_LAYOUT
    }
}
