//! Command payloads carried inside frames
//!
//! A request payload starts with a destination tag followed by the
//! destination's arguments:
//!
//! ```text
//! ADC read:       ['a'][unit]
//! Motor command:  ['m'][unit][speed][direction: 'f' | 'r' | 's']
//! ```
//!
//! Replies carry no tag. An ADC reply is the 16-bit sample, high byte first;
//! a motor reply is a short acknowledgement string.

use crate::error::{ProtocolError, Result};
use byteorder::{BigEndian, ByteOrder};
use std::fmt;

/// Length of an ADC reply payload
pub const ADC_REPLY_LEN: usize = 2;

/// Handler a command is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Adc,
    Motor,
}

impl Destination {
    pub const fn tag(self) -> u8 {
        match self {
            Destination::Adc => b'a',
            Destination::Motor => b'm',
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            b'a' => Ok(Destination::Adc),
            b'm' => Ok(Destination::Motor),
            other => Err(ProtocolError::UnknownDestination(other)),
        }
    }

    /// Payload length including the tag
    const fn command_len(self) -> usize {
        match self {
            Destination::Adc => 2,
            Destination::Motor => 4,
        }
    }
}

/// Motor drive direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorDirection {
    Forward,
    Reverse,
    Stop,
}

impl MotorDirection {
    pub const fn as_byte(self) -> u8 {
        match self {
            MotorDirection::Forward => b'f',
            MotorDirection::Reverse => b'r',
            MotorDirection::Stop => b's',
        }
    }

    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            b'f' => Ok(MotorDirection::Forward),
            b'r' => Ok(MotorDirection::Reverse),
            b's' => Ok(MotorDirection::Stop),
            other => Err(ProtocolError::InvalidDirection(other)),
        }
    }
}

impl fmt::Display for MotorDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_byte() as char)
    }
}

/// A decoded request payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Sample one ADC channel
    AdcRead { unit: u8 },
    /// Drive one motor
    Motor {
        unit: u8,
        speed: u8,
        direction: MotorDirection,
    },
}

impl Command {
    pub fn adc_read(unit: u8) -> Self {
        Command::AdcRead { unit }
    }

    /// Motor command; a stop always carries speed 0
    pub fn motor(unit: u8, speed: u8, direction: MotorDirection) -> Self {
        let speed = if direction == MotorDirection::Stop {
            0
        } else {
            speed
        };
        Command::Motor {
            unit,
            speed,
            direction,
        }
    }

    pub fn destination(&self) -> Destination {
        match self {
            Command::AdcRead { .. } => Destination::Adc,
            Command::Motor { .. } => Destination::Motor,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match *self {
            Command::AdcRead { unit } => vec![Destination::Adc.tag(), unit],
            Command::Motor {
                unit,
                speed,
                direction,
            } => vec![Destination::Motor.tag(), unit, speed, direction.as_byte()],
        }
    }

    /// Decode a request payload; trailing bytes are ignored
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let Some(&tag) = payload.first() else {
            return Err(ProtocolError::TruncatedCommand {
                destination: '?',
                needed: 1,
                actual: 0,
            });
        };

        let destination = Destination::from_tag(tag)?;
        let needed = destination.command_len();
        if payload.len() < needed {
            return Err(ProtocolError::TruncatedCommand {
                destination: tag as char,
                needed,
                actual: payload.len(),
            });
        }

        Ok(match destination {
            Destination::Adc => Command::AdcRead { unit: payload[1] },
            Destination::Motor => {
                Command::motor(payload[1], payload[2], MotorDirection::from_byte(payload[3])?)
            }
        })
    }
}

/// Decode an ADC reply into the sampled value
pub fn decode_adc_reply(payload: &[u8]) -> Result<u16> {
    if payload.len() < ADC_REPLY_LEN {
        return Err(ProtocolError::InvalidReply {
            expected: ADC_REPLY_LEN,
            actual: payload.len(),
        });
    }
    Ok(BigEndian::read_u16(payload))
}

/// Encode an ADC sample as a reply payload
pub fn encode_adc_reply(value: u16) -> [u8; ADC_REPLY_LEN] {
    let mut buf = [0u8; ADC_REPLY_LEN];
    BigEndian::write_u16(&mut buf, value);
    buf
}

/// Acknowledgement text the firmware sends back for a motor command
///
/// The speed is abbreviated to its leading decimal digit.
pub fn motor_ack(speed: u8, direction: MotorDirection) -> String {
    let leading = speed.to_string().chars().next().unwrap_or('0');
    format!("({},{}) received in handle_mc()", leading, direction)
}
