//! Board I/O abstraction
//!
//! The interpreter only needs two operations from the hardware: sample an ADC
//! channel and set a motor's PWM duty and H-bridge direction.

use protocol::MotorDirection;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Analog inputs on a Teensy 2.0
pub const ADC_UNITS: u8 = 12;

/// Register-level I/O the interpreter drives
pub trait Board {
    /// Number of ADC channels that can be sampled
    fn adc_units(&self) -> u8 {
        ADC_UNITS
    }

    /// Sample one ADC channel (10-bit on AVR)
    fn analog_read(&mut self, unit: u8) -> u16;

    /// Set the PWM duty and direction of one motor
    ///
    /// Unit 0 is the motor on timer output A; every other unit drives the
    /// motor on output B.
    fn drive_motor(&mut self, unit: u8, direction: MotorDirection, speed: u8);
}

/// Last command applied to a motor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorState {
    pub direction: MotorDirection,
    pub speed: u8,
}

#[derive(Debug, Default)]
struct BoardState {
    adc: HashMap<u8, u16>,
    motors: [Option<MotorState>; 2],
    adc_reads: u64,
    motor_commands: u64,
}

/// In-memory board used by tests and the host's simulate mode
///
/// Clones share state, so a test can keep a handle while the interpreter owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBoard {
    state: Arc<Mutex<BoardState>>,
}

impl SimulatedBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value the next reads of `unit` return (unset channels read 0)
    pub fn set_adc(&self, unit: u8, value: u16) {
        self.lock().adc.insert(unit, value);
    }

    /// Current state of a motor, `None` if it was never commanded
    pub fn motor(&self, unit: u8) -> Option<MotorState> {
        self.lock().motors[motor_slot(unit)]
    }

    pub fn adc_reads(&self) -> u64 {
        self.lock().adc_reads
    }

    pub fn motor_commands(&self) -> u64 {
        self.lock().motor_commands
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Board for SimulatedBoard {
    fn analog_read(&mut self, unit: u8) -> u16 {
        let mut state = self.lock();
        state.adc_reads += 1;
        state.adc.get(&unit).copied().unwrap_or(0)
    }

    fn drive_motor(&mut self, unit: u8, direction: MotorDirection, speed: u8) {
        let mut state = self.lock();
        state.motor_commands += 1;
        let speed = if direction == MotorDirection::Stop { 0 } else { speed };
        state.motors[motor_slot(unit)] = Some(MotorState { direction, speed });
    }
}

fn motor_slot(unit: u8) -> usize {
    if unit == 0 { 0 } else { 1 }
}
