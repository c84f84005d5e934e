//! Host configuration management

use crate::channel::ChannelOptions;
use anyhow::{Context, Result, anyhow};
use firmware::board::ADC_UNITS;
use protocol::{FRAME_SIZE, FrameLayout};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub host: HostSettings,
    #[serde(default)]
    pub usb: UsbSettings,
    #[serde(default)]
    pub transport: TransportSettings,
    /// ADC-to-motor calibration for the follow loop
    #[serde(default)]
    pub follow: FollowSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostSettings {
    pub log_level: String,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Device identity and interrupt pipe parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsbSettings {
    #[serde(default = "UsbSettings::default_vendor_id")]
    pub vendor_id: u16,
    #[serde(default = "UsbSettings::default_product_id")]
    pub product_id: u16,
    #[serde(default)]
    pub interface: u8,
    /// Interrupt IN endpoint address (direction bit set)
    #[serde(default = "UsbSettings::default_in_endpoint")]
    pub in_endpoint: u8,
    /// Interrupt OUT endpoint address (direction bit clear)
    #[serde(default = "UsbSettings::default_out_endpoint")]
    pub out_endpoint: u8,
    #[serde(default = "UsbSettings::default_frame_size")]
    pub frame_size: usize,
    /// How long each receive waits before checking for shutdown
    #[serde(default = "UsbSettings::default_poll_timeout")]
    pub poll_timeout_ms: u64,
    #[serde(default = "UsbSettings::default_write_timeout")]
    pub write_timeout_ms: u64,
}

impl Default for UsbSettings {
    fn default() -> Self {
        Self {
            vendor_id: Self::default_vendor_id(),
            product_id: Self::default_product_id(),
            interface: 0,
            in_endpoint: Self::default_in_endpoint(),
            out_endpoint: Self::default_out_endpoint(),
            frame_size: Self::default_frame_size(),
            poll_timeout_ms: Self::default_poll_timeout(),
            write_timeout_ms: Self::default_write_timeout(),
        }
    }
}

impl UsbSettings {
    fn default_vendor_id() -> u16 {
        0x16C0
    }

    fn default_product_id() -> u16 {
        0x0480
    }

    fn default_in_endpoint() -> u8 {
        0x83
    }

    fn default_out_endpoint() -> u8 {
        0x04
    }

    fn default_frame_size() -> usize {
        FRAME_SIZE
    }

    fn default_poll_timeout() -> u64 {
        100
    }

    fn default_write_timeout() -> u64 {
        50
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportSettings {
    /// Bound on each wait for a reply (unset waits indefinitely)
    #[serde(default)]
    pub reply_timeout_ms: Option<u64>,
    #[serde(default = "TransportSettings::default_rearm_attempts")]
    pub rearm_attempts: u32,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            reply_timeout_ms: None,
            rearm_attempts: Self::default_rearm_attempts(),
        }
    }
}

impl TransportSettings {
    fn default_rearm_attempts() -> u32 {
        crate::dispatch::DEFAULT_REARM_ATTEMPTS
    }
}

/// Light-sensor calibration used to map ADC readings to motor speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowSettings {
    #[serde(default = "FollowSettings::default_adc_unit")]
    pub adc_unit: u8,
    #[serde(default)]
    pub motor_unit: u8,
    #[serde(default = "FollowSettings::default_adc_min")]
    pub adc_min: u16,
    #[serde(default = "FollowSettings::default_adc_max")]
    pub adc_max: u16,
    #[serde(default = "FollowSettings::default_speed_min")]
    pub speed_min: u8,
    #[serde(default = "FollowSettings::default_speed_max")]
    pub speed_max: u8,
    /// Speeds less than this far above `speed_min` stop the motor
    #[serde(default = "FollowSettings::default_dead_band")]
    pub dead_band: u8,
    #[serde(default = "FollowSettings::default_interval")]
    pub interval_ms: u64,
}

impl Default for FollowSettings {
    fn default() -> Self {
        Self {
            adc_unit: Self::default_adc_unit(),
            motor_unit: 0,
            adc_min: Self::default_adc_min(),
            adc_max: Self::default_adc_max(),
            speed_min: Self::default_speed_min(),
            speed_max: Self::default_speed_max(),
            dead_band: Self::default_dead_band(),
            interval_ms: Self::default_interval(),
        }
    }
}

impl FollowSettings {
    fn default_adc_unit() -> u8 {
        1
    }

    fn default_adc_min() -> u16 {
        0x0100
    }

    fn default_adc_max() -> u16 {
        0x03ff
    }

    fn default_speed_min() -> u8 {
        120
    }

    fn default_speed_max() -> u8 {
        190
    }

    fn default_dead_band() -> u8 {
        10
    }

    fn default_interval() -> u64 {
        100
    }
}

impl HostConfig {
    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p
        } else {
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/teensy-usb/host.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: HostConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("teensy-usb").join("host.toml")
        } else {
            PathBuf::from(".config/teensy-usb/host.toml")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.host.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.host.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.usb.in_endpoint & 0x80 == 0 {
            return Err(anyhow!(
                "Invalid in_endpoint {:#04x}, IN endpoints have bit 7 set",
                self.usb.in_endpoint
            ));
        }
        if self.usb.out_endpoint & 0x80 != 0 {
            return Err(anyhow!(
                "Invalid out_endpoint {:#04x}, OUT endpoints have bit 7 clear",
                self.usb.out_endpoint
            ));
        }
        self.layout()?;

        if self.transport.rearm_attempts == 0 {
            return Err(anyhow!("rearm_attempts must be at least 1"));
        }

        let follow = &self.follow;
        if follow.adc_unit >= ADC_UNITS {
            return Err(anyhow!(
                "Follow adc_unit {} out of range, the board has {} ADC units",
                follow.adc_unit,
                ADC_UNITS
            ));
        }
        if follow.adc_max <= follow.adc_min {
            return Err(anyhow!(
                "Follow adc_max ({}) must be above adc_min ({})",
                follow.adc_max,
                follow.adc_min
            ));
        }
        if follow.speed_max < follow.speed_min {
            return Err(anyhow!(
                "Follow speed_max ({}) must not be below speed_min ({})",
                follow.speed_max,
                follow.speed_min
            ));
        }

        Ok(())
    }

    pub fn layout(&self) -> Result<FrameLayout> {
        FrameLayout::with_frame_size(self.usb.frame_size)
            .with_context(|| format!("Invalid frame_size {}", self.usb.frame_size))
    }

    /// Channel options derived from the transport and usb sections
    pub fn channel_options(&self) -> Result<ChannelOptions> {
        Ok(ChannelOptions {
            layout: self.layout()?,
            reply_timeout: self.transport.reply_timeout_ms.map(Duration::from_millis),
            rearm_attempts: self.transport.rearm_attempts,
        })
    }
}

/// Load configuration from a path that may start with `~`
pub fn load_config(path: &str) -> Result<HostConfig> {
    let path_buf = PathBuf::from(shellexpand::tilde(path).as_ref());
    HostConfig::load(Some(path_buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HostConfig::default();
        assert_eq!(config.host.log_level, "info");
        assert_eq!(config.usb.vendor_id, 0x16C0);
        assert_eq!(config.usb.product_id, 0x0480);
        assert_eq!(config.usb.in_endpoint, 0x83);
        assert_eq!(config.usb.out_endpoint, 0x04);
        assert_eq!(config.transport.reply_timeout_ms, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = HostConfig::default();
        config.host.log_level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.host.log_level = "debug".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_endpoint_direction() {
        let mut config = HostConfig::default();
        config.usb.in_endpoint = 0x03;
        assert!(config.validate().is_err());

        let mut config = HostConfig::default();
        config.usb.out_endpoint = 0x84;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_follow_adc_unit() {
        let mut config = HostConfig::default();
        config.follow.adc_unit = ADC_UNITS - 1;
        assert!(config.validate().is_ok());

        config.follow.adc_unit = ADC_UNITS;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_frame_size() {
        let mut config = HostConfig::default();
        config.usb.frame_size = 3;
        assert!(config.validate().is_err());

        config.usb.frame_size = 32;
        assert!(config.validate().is_ok());
        assert_eq!(config.channel_options().unwrap().layout.max_payload(), 29);
    }

    #[test]
    fn test_channel_options_timeout() {
        let mut config = HostConfig::default();
        assert_eq!(config.channel_options().unwrap().reply_timeout, None);

        config.transport.reply_timeout_ms = Some(250);
        assert_eq!(
            config.channel_options().unwrap().reply_timeout,
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn test_config_serialization() {
        let mut config = HostConfig::default();
        config.transport.reply_timeout_ms = Some(500);
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: HostConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }
}
