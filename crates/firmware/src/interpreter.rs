//! Frame interpreter
//!
//! One call per received frame: decode, run the handler for the destination,
//! pack the reply under the same request id.

use crate::board::Board;
use crate::error::{FirmwareError, Result};
use protocol::{
    Command, CURRENT_LAYOUT, Frame, FrameHeader, FrameLayout, MotorDirection, encode_adc_reply,
    motor_ack,
};
use tracing::{debug, trace, warn};

/// Device-side command loop body
pub struct Interpreter<B: Board> {
    board: B,
    layout: FrameLayout,
    handled: u64,
}

impl<B: Board> Interpreter<B> {
    pub fn new(board: B) -> Self {
        Self::with_layout(board, CURRENT_LAYOUT)
    }

    pub fn with_layout(board: B, layout: FrameLayout) -> Self {
        Self {
            board,
            layout,
            handled: 0,
        }
    }

    /// Handle one request frame and return the reply frame
    ///
    /// A frame that cannot be decoded produces an error and no reply.
    pub fn handle_frame(&mut self, frame: &[u8]) -> Result<Vec<u8>> {
        let header = FrameHeader::parse(&self.layout, frame).inspect_err(|e| {
            warn!("Dropping malformed frame ({} bytes): {}", frame.len(), e);
        })?;
        trace!(
            "Frame {} with {} payload bytes",
            header.id,
            header.payload.len()
        );

        let command = Command::decode(header.payload).inspect_err(|e| {
            warn!("Dropping request {}: {}", header.id, e);
        })?;

        let reply = match command {
            Command::AdcRead { unit } => self.handle_adc(unit)?.to_vec(),
            Command::Motor {
                unit,
                speed,
                direction,
            } => self.handle_motor(unit, speed, direction).into_bytes(),
        };

        let packed = self.layout.pack(&Frame::new(header.id, reply))?;
        self.handled += 1;
        Ok(packed)
    }

    fn handle_adc(&mut self, unit: u8) -> Result<[u8; 2]> {
        if unit >= self.board.adc_units() {
            return Err(FirmwareError::NoSuchUnit { kind: "adc", unit });
        }
        let value = self.board.analog_read(unit);
        debug!("ADC unit {} read {}", unit, value);
        Ok(encode_adc_reply(value))
    }

    fn handle_motor(&mut self, unit: u8, speed: u8, direction: MotorDirection) -> String {
        self.board.drive_motor(unit, direction, speed);
        debug!("Motor unit {} set to {} at {}", unit, direction, speed);
        motor_ack(speed, direction)
    }

    /// Requests answered so far
    pub fn handled(&self) -> u64 {
        self.handled
    }

    pub fn board(&self) -> &B {
        &self.board
    }
}
