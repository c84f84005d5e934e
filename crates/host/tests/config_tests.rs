//! Integration tests for configuration parsing
//!
//! Tests host configuration files, including:
//! - Minimal and full configs
//! - Hex literals for USB ids and endpoints
//! - Save/load round trip through a temp directory
//! - Invalid configuration handling

use host::HostConfig;
use host::config::load_config;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

const MINIMAL_CONFIG: &str = r#"
[host]
log_level = "info"
"#;

const FULL_CONFIG: &str = r#"
[host]
log_level = "debug"

[usb]
vendor_id = 0x16C0
product_id = 0x0480
interface = 0
in_endpoint = 0x83
out_endpoint = 0x04
frame_size = 64
poll_timeout_ms = 20
write_timeout_ms = 75

[transport]
reply_timeout_ms = 1500
rearm_attempts = 5

[follow]
adc_unit = 1
motor_unit = 0
adc_min = 0x100
adc_max = 0x3ff
speed_min = 120
speed_max = 190
dead_band = 10
interval_ms = 50
"#;

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("host.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_minimal_config_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, MINIMAL_CONFIG);

    let config = HostConfig::load(Some(path)).unwrap();
    assert_eq!(config.usb.vendor_id, 0x16C0);
    assert_eq!(config.usb.in_endpoint, 0x83);
    assert_eq!(config.transport.reply_timeout_ms, None);
    assert_eq!(config.transport.rearm_attempts, 3);
    assert_eq!(config.follow.speed_max, 190);
}

#[test]
fn test_full_config() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, FULL_CONFIG);

    let config = HostConfig::load(Some(path)).unwrap();
    assert_eq!(config.host.log_level, "debug");
    assert_eq!(config.usb.product_id, 0x0480);
    assert_eq!(config.usb.poll_timeout(), Duration::from_millis(20));
    assert_eq!(config.usb.write_timeout(), Duration::from_millis(75));
    assert_eq!(config.follow.interval_ms, 50);

    let options = config.channel_options().unwrap();
    assert_eq!(options.reply_timeout, Some(Duration::from_millis(1500)));
    assert_eq!(options.rearm_attempts, 5);
    assert_eq!(options.layout.frame_size(), 64);
}

#[test]
fn test_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("host.toml");

    let mut config = HostConfig::default();
    config.transport.reply_timeout_ms = Some(250);
    config.follow.adc_unit = 2;
    config.save(&path).unwrap();

    let loaded = HostConfig::load(Some(path)).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_load_config_str_path() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, MINIMAL_CONFIG);

    let config = load_config(path.to_str().unwrap()).unwrap();
    assert_eq!(config.host.log_level, "info");
}

#[test]
fn test_invalid_endpoint_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[host]
log_level = "info"

[usb]
in_endpoint = 0x03
"#,
    );
    assert!(HostConfig::load(Some(path)).is_err());
}

#[test]
fn test_invalid_calibration_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[host]
log_level = "info"

[follow]
adc_min = 0x300
adc_max = 0x100
"#,
    );
    assert!(HostConfig::load(Some(path)).is_err());
}

#[test]
fn test_zero_rearm_attempts_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[host]
log_level = "info"

[transport]
rearm_attempts = 0
"#,
    );
    assert!(HostConfig::load(Some(path)).is_err());
}

#[test]
fn test_malformed_toml_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[host\nlog_level = ");
    assert!(HostConfig::load(Some(path)).is_err());
}

#[test]
fn test_missing_file_rejected() {
    let dir = TempDir::new().unwrap();
    assert!(HostConfig::load(Some(dir.path().join("absent.toml"))).is_err());
}
