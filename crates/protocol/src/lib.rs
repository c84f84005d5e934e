//! Wire protocol for the teensy USB link
//!
//! This crate defines the fixed-size frame exchanged between the host and the
//! Teensy firmware over the interrupt pipe, and the command payloads carried
//! inside it. Both sides of the link build on the same definitions.
//!
//! # Example
//!
//! ```
//! use protocol::{Command, Frame, RequestId, pack, unpack};
//!
//! // Frame an ADC read for unit 3
//! let request = Frame::new(RequestId(7), Command::adc_read(3).encode());
//! let bytes = pack(&request).unwrap();
//! assert_eq!(bytes.len(), protocol::FRAME_SIZE);
//!
//! // Decode it again, expecting the same request id
//! let decoded = unpack(&bytes, RequestId(7)).unwrap();
//! assert_eq!(decoded.payload, vec![b'a', 3]);
//! ```
//!
//! # Frame Layout
//!
//! ```text
//! byte 0:       request id
//! byte 1:       reserved (0x00)
//! byte 2:       payload length
//! bytes 3..N:   payload
//! bytes N..end: zero padding
//! ```

pub mod command;
pub mod error;
pub mod frame;
pub mod layout;

pub use command::{
    Command, Destination, MotorDirection, decode_adc_reply, encode_adc_reply, motor_ack,
};
pub use error::{Malformation, ProtocolError, Result};
pub use frame::{Frame, FrameHeader, RequestId, pack, unpack};
pub use layout::{CURRENT_LAYOUT, FRAME_SIZE, FrameLayout, HEADER_LEN, MAX_PAYLOAD, SIZE_FIELD_MAX};
