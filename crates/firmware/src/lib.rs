//! Teensy firmware command interpreter
//!
//! The device side of the link: decodes request frames, runs the ADC or motor
//! handler on a [`Board`], and answers with a frame carrying the same request
//! id. Register-level I/O lives behind the [`Board`] trait; [`SimulatedBoard`]
//! stands in for the hardware in tests and in the host's loopback mode.

pub mod board;
pub mod error;
pub mod interpreter;

pub use board::{Board, MotorState, SimulatedBoard};
pub use error::{FirmwareError, Result};
pub use interpreter::Interpreter;
