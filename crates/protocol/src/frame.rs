//! Frame packing and unpacking
//!
//! Every transfer on the interrupt pipe is exactly one frame of
//! [`FrameLayout::frame_size`] bytes:
//!
//! ```text
//! [id: u8][reserved: u8][size: u8][payload: size bytes][zero padding]
//! ```
//!
//! [`pack`] and [`unpack`] allocate and are meant for request setup and for
//! the firmware side. The host's dispatch path uses [`FrameHeader::parse`],
//! which borrows the received bytes and never allocates.

use crate::error::{Malformation, ProtocolError, Result};
use crate::layout::{CURRENT_LAYOUT, FrameLayout};
use std::fmt;

const ID_OFFSET: usize = 0;
const RESERVED_OFFSET: usize = 1;
const SIZE_OFFSET: usize = 2;

/// Correlator between an outbound request and its inbound reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u8);

impl RequestId {
    /// Next id in sequence, wrapping from 255 back to 0
    pub const fn wrapping_next(self) -> Self {
        RequestId(self.0.wrapping_add(1))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A request or reply with its payload, before framing or after unframing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub id: RequestId,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(id: RequestId, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }

    /// Logical payload length
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

/// Borrowed view of a received frame's header and payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader<'a> {
    pub id: RequestId,
    pub reserved: u8,
    pub payload: &'a [u8],
}

impl<'a> FrameHeader<'a> {
    /// Parse a frame without copying
    ///
    /// Rejects frames shorter than the header and frames whose declared size
    /// runs past either the received bytes or the layout's payload area.
    pub fn parse(layout: &FrameLayout, bytes: &'a [u8]) -> Result<Self> {
        let header_len = layout.header_len();
        if bytes.len() < header_len {
            return Err(Malformation::TooShort {
                len: bytes.len(),
                header_len,
            }
            .into());
        }

        let declared = bytes[SIZE_OFFSET] as usize;
        let available = (bytes.len() - header_len).min(layout.max_payload());
        if declared > available {
            return Err(Malformation::SizeOverflow {
                declared,
                available,
            }
            .into());
        }

        Ok(Self {
            id: RequestId(bytes[ID_OFFSET]),
            reserved: bytes[RESERVED_OFFSET],
            payload: &bytes[header_len..header_len + declared],
        })
    }
}

impl FrameLayout {
    /// Pack a frame into a zero-padded buffer of `frame_size` bytes
    pub fn pack(&self, frame: &Frame) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.frame_size()];
        self.pack_into(frame.id, &frame.payload, &mut buf)?;
        Ok(buf)
    }

    /// Pack into a caller-provided buffer of at least `frame_size` bytes
    ///
    /// Bytes past the payload are zeroed up to `frame_size`.
    pub fn pack_into(&self, id: RequestId, payload: &[u8], buf: &mut [u8]) -> Result<usize> {
        self.check_payload_len(payload.len())?;
        if buf.len() < self.frame_size() {
            return Err(ProtocolError::InvalidLayout {
                frame_size: buf.len(),
            });
        }

        let header_len = self.header_len();
        let frame = &mut buf[..self.frame_size()];
        frame[ID_OFFSET] = id.0;
        frame[RESERVED_OFFSET] = 0;
        frame[SIZE_OFFSET] = payload.len() as u8;
        frame[header_len..header_len + payload.len()].copy_from_slice(payload);
        frame[header_len + payload.len()..].fill(0);
        Ok(self.frame_size())
    }

    /// Unpack a frame expected to answer `expected`
    ///
    /// A frame for any other request is rejected with
    /// [`ProtocolError::WrongRequest`]; callers drop it rather than fail.
    pub fn unpack(&self, bytes: &[u8], expected: RequestId) -> Result<Frame> {
        if bytes.len() < self.header_len() {
            return Err(Malformation::TooShort {
                len: bytes.len(),
                header_len: self.header_len(),
            }
            .into());
        }

        let actual = RequestId(bytes[ID_OFFSET]);
        if actual != expected {
            return Err(ProtocolError::WrongRequest { expected, actual });
        }

        let header = FrameHeader::parse(self, bytes)?;
        Ok(Frame::new(header.id, header.payload))
    }
}

/// Pack with the current layout
pub fn pack(frame: &Frame) -> Result<Vec<u8>> {
    CURRENT_LAYOUT.pack(frame)
}

/// Unpack with the current layout
pub fn unpack(bytes: &[u8], expected: RequestId) -> Result<Frame> {
    CURRENT_LAYOUT.unpack(bytes, expected)
}
