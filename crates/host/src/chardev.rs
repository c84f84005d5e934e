//! Character-device surface
//!
//! `/dev/adcN` and `/dev/mcN` equivalents: one blocking round trip per read
//! or ioctl, results reported as POSIX errno values.

use crate::channel::Channel;
use crate::error::{HostError, Result};
use firmware::board::ADC_UNITS;
use nix::errno::Errno;
use protocol::{Command, MotorDirection, decode_adc_reply};
use std::sync::Arc;
use tracing::{debug, info};

/// Request code type used by `ioctl(2)` on this platform
pub type IoctlRequest = nix::sys::ioctl::ioctl_num_type;

/// Magic number of the motor controller ioctls
pub const MC_IOC_MAGIC: u8 = b'M';

/// Stop the motor
pub const MC_IOC_STOP: IoctlRequest = nix::request_code_none!(MC_IOC_MAGIC, 42);
/// Drive forward; the argument is the speed
pub const MC_IOC_FWD: IoctlRequest =
    nix::request_code_write!(MC_IOC_MAGIC, 43, std::mem::size_of::<i32>());
/// Drive in reverse; the argument is the speed
pub const MC_IOC_REV: IoctlRequest =
    nix::request_code_write!(MC_IOC_MAGIC, 44, std::mem::size_of::<i32>());

/// One ADC channel
#[derive(Clone)]
pub struct AdcDevice {
    channel: Arc<Channel>,
    unit: u8,
}

impl AdcDevice {
    pub fn new(channel: Arc<Channel>, unit: u8) -> Self {
        Self { channel, unit }
    }

    pub fn unit(&self) -> u8 {
        self.unit
    }

    /// Units the board does not have are rejected before any round trip
    fn check_unit(&self) -> Result<()> {
        if self.unit >= ADC_UNITS {
            return Err(HostError::NoSuchUnit {
                kind: "adc",
                unit: self.unit,
            });
        }
        Ok(())
    }

    /// Sample the channel and copy the raw reply into `buf`
    ///
    /// Returns the number of bytes copied.
    pub fn read(&self, buf: &mut [u8]) -> std::result::Result<usize, Errno> {
        self.check_unit().map_err(|e| e.errno())?;
        let command = Command::adc_read(self.unit).encode();
        let reply = self
            .channel
            .transact(&command, buf.len())
            .map_err(|e| e.errno())?;
        buf[..reply.size()].copy_from_slice(&reply.data);
        Ok(reply.size())
    }

    /// Sample the channel and decode the value
    pub fn read_value(&self) -> Result<u16> {
        self.check_unit()?;
        let command = Command::adc_read(self.unit).encode();
        let limit = self.channel.options().layout.max_payload();
        let reply = self.channel.transact(&command, limit)?;
        let value = decode_adc_reply(&reply.data).map_err(HostError::BadReply)?;
        debug!("ADC unit {}: {}", self.unit, value);
        Ok(value)
    }
}

/// One motor
#[derive(Clone)]
pub struct MotorDevice {
    channel: Arc<Channel>,
    unit: u8,
}

impl MotorDevice {
    pub fn new(channel: Arc<Channel>, unit: u8) -> Self {
        Self { channel, unit }
    }

    pub fn unit(&self) -> u8 {
        self.unit
    }

    /// Handle a motor controller ioctl
    ///
    /// The speed argument is truncated to a byte; a stop ignores it.
    pub fn ioctl(&self, cmd: IoctlRequest, arg: i32) -> std::result::Result<(), Errno> {
        let direction = match cmd {
            MC_IOC_STOP => MotorDirection::Stop,
            MC_IOC_FWD => MotorDirection::Forward,
            MC_IOC_REV => MotorDirection::Reverse,
            _ => return Err(Errno::ENOTTY),
        };
        self.drive(direction, arg as u8)
            .map(|_| ())
            .map_err(|e| e.errno())
    }

    /// Send a motor command and return the acknowledgement text
    pub fn drive(&self, direction: MotorDirection, speed: u8) -> Result<String> {
        let command = Command::motor(self.unit, speed, direction).encode();
        let limit = self.channel.options().layout.max_payload();
        let ack = self.channel.transact(&command, limit)?.text();
        info!("Motor unit {}: {}", self.unit, ack);
        Ok(ack)
    }
}
