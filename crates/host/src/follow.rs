//! ADC-to-motor follow loop
//!
//! Reads a light sensor and drives a motor forward at a proportional speed.
//! Readings that map to speeds inside the dead band stop the motor.

use crate::chardev::{AdcDevice, MotorDevice};
use crate::config::FollowSettings;
use crate::error::Result;
use protocol::MotorDirection;
use tracing::debug;

impl FollowSettings {
    /// Motor speed for one ADC reading
    pub fn speed_for(&self, value: u16) -> u8 {
        let span = f32::from(self.adc_max) - f32::from(self.adc_min);
        let range = f32::from(self.speed_max) - f32::from(self.speed_min);
        let scaled = (f32::from(value) - f32::from(self.adc_min)) / span * range
            + f32::from(self.speed_min);
        let speed = scaled as i32;

        if speed < i32::from(self.speed_min) + i32::from(self.dead_band) {
            0
        } else if speed > i32::from(self.speed_max) {
            self.speed_max
        } else {
            speed as u8
        }
    }
}

/// One sensor and one motor tied together
pub struct FollowLoop {
    adc: AdcDevice,
    motor: MotorDevice,
    settings: FollowSettings,
}

/// Result of one loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowStep {
    pub value: u16,
    pub speed: u8,
}

impl FollowLoop {
    pub fn new(adc: AdcDevice, motor: MotorDevice, settings: FollowSettings) -> Self {
        Self {
            adc,
            motor,
            settings,
        }
    }

    /// Read the sensor once and update the motor
    pub fn step(&self) -> Result<FollowStep> {
        let value = self.adc.read_value()?;
        let speed = self.settings.speed_for(value);
        debug!("value={:#x} speed={}", value, speed);
        self.motor.drive(MotorDirection::Forward, speed)?;
        Ok(FollowStep { value, speed })
    }

    /// Stop the motor
    pub fn stop(&self) -> Result<()> {
        self.motor.drive(MotorDirection::Stop, 0).map(|_| ())
    }

    pub fn settings(&self) -> &FollowSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_at_calibration_ends() {
        let settings = FollowSettings::default();
        assert_eq!(settings.speed_for(0x03ff), 190);
        assert_eq!(settings.speed_for(0x0100), 0);
    }

    #[test]
    fn test_below_minimum_stops() {
        let settings = FollowSettings::default();
        assert_eq!(settings.speed_for(0), 0);
        assert_eq!(settings.speed_for(0x00ff), 0);
    }

    #[test]
    fn test_dead_band_edge() {
        let settings = FollowSettings::default();
        // (v - 256) / 767 * 70 + 120 crosses 130 between 365 and 366
        assert_eq!(settings.speed_for(365), 0);
        assert_eq!(settings.speed_for(366), 130);
    }

    #[test]
    fn test_midpoint() {
        let settings = FollowSettings::default();
        // (640 - 256) / 767 * 70 + 120 = 155.04
        assert_eq!(settings.speed_for(640), 155);
    }

    #[test]
    fn test_clamped_above_maximum() {
        let settings = FollowSettings {
            adc_max: 0x200,
            ..FollowSettings::default()
        };
        assert_eq!(settings.speed_for(0x3ff), 190);
    }
}
