//! teensy-host
//!
//! Command-line front end for the Teensy ADC and motor controller. Talks to
//! the board over USB, or to an in-process simulated board with `--simulate`.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use common::setup_logging;
use firmware::SimulatedBoard;
use firmware::board::ADC_UNITS;
use host::config::{self, HostConfig};
use host::{
    AdcDevice, Channel, FollowLoop, FollowSettings, LoopbackTransport, MotorDevice, UsbTransport,
};
use protocol::MotorDirection;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "teensy-host")]
#[command(author, version, about = "Teensy ADC and motor controller host")]
#[command(long_about = "
Drives a Teensy running the ADC/motor firmware over its 64-byte interrupt
pipes. Every command is one request/response round trip.

EXAMPLES:
    # Read ADC unit 3
    teensy-host adc 3

    # Run motor 0 forward at speed 175
    teensy-host motor 0 fwd 175

    # Drive motor 0 from the light sensor on ADC 1 until Ctrl+C
    teensy-host follow --adc 1 --motor 0

    # Try it without hardware
    teensy-host --simulate adc 3

CONFIGURATION:
    The host looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/teensy-usb/host.toml
    3. /etc/teensy-usb/host.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<std::path::PathBuf>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// Use an in-process simulated board instead of USB
    #[arg(long)]
    simulate: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read one ADC unit and print the value
    Adc { unit: u8 },

    /// Send one motor command
    Motor {
        unit: u8,
        direction: Direction,
        /// Speed (PWM duty, ignored for stop)
        #[arg(default_value_t = 0)]
        speed: u8,
    },

    /// Drive a motor from an ADC reading until Ctrl+C
    Follow {
        /// ADC unit to sample (default from config)
        #[arg(long)]
        adc: Option<u8>,

        /// Motor unit to drive (default from config)
        #[arg(long)]
        motor: Option<u8>,
    },

    /// Probe the device once and print channel counters
    Stats,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Direction {
    Fwd,
    Rev,
    Stop,
}

impl From<Direction> for MotorDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Fwd => MotorDirection::Forward,
            Direction::Rev => MotorDirection::Reverse,
            Direction::Stop => MotorDirection::Stop,
        }
    }
}

/// Keeps the transport threads alive for the life of the channel
enum Link {
    Usb(UsbTransport),
    Loopback(LoopbackTransport),
}

impl Link {
    fn shutdown(self) {
        match self {
            Link::Usb(mut transport) => transport.shutdown(),
            Link::Loopback(mut transport) => transport.shutdown(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.save_config {
        let config = HostConfig::default();
        let path = HostConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = if let Some(ref path) = args.config {
        config::load_config(&path.to_string_lossy()).context("Failed to load configuration")?
    } else {
        HostConfig::load_or_default()
    };

    let log_level = args.log_level.as_deref().unwrap_or(&config.host.log_level);
    setup_logging(log_level).context("Failed to setup logging")?;

    info!("teensy-host v{}", env!("CARGO_PKG_VERSION"));

    let command = args
        .command
        .ok_or_else(|| anyhow!("No command given, see --help"))?;

    let options = config.channel_options()?;
    let (channel, link) = if args.simulate {
        info!("Using simulated board");
        let (channel, transport) = LoopbackTransport::spawn(simulated_board(), options)
            .context("Failed to start loopback transport")?;
        (channel, Link::Loopback(transport))
    } else {
        let (channel, transport) =
            UsbTransport::open(&config.usb, options).context("Failed to open Teensy")?;
        (channel, Link::Usb(transport))
    };

    let result = run(command, channel.clone(), &config).await;

    channel.close();
    link.shutdown();

    result
}

async fn run(command: Command, channel: Arc<Channel>, config: &HostConfig) -> Result<()> {
    match command {
        Command::Adc { unit } => {
            let adc = AdcDevice::new(channel, unit);
            let value = blocking(move || adc.read_value())
                .await
                .with_context(|| format!("Failed to read ADC unit {}", unit))?;
            println!("adc{}: {} ({:#06x})", unit, value, value);
        }

        Command::Motor {
            unit,
            direction,
            speed,
        } => {
            let motor = MotorDevice::new(channel, unit);
            let ack = blocking(move || motor.drive(direction.into(), speed))
                .await
                .with_context(|| format!("Failed to command motor {}", unit))?;
            println!("mc{}: {}", unit, ack);
        }

        Command::Follow { adc, motor } => {
            let settings = FollowSettings {
                adc_unit: adc.unwrap_or(config.follow.adc_unit),
                motor_unit: motor.unwrap_or(config.follow.motor_unit),
                ..config.follow
            };
            run_follow(channel, settings).await?;
        }

        Command::Stats => {
            let adc = AdcDevice::new(channel.clone(), config.follow.adc_unit);
            if let Err(e) = blocking(move || adc.read_value()).await {
                warn!("Probe failed: {}", e);
            }
            println!("{}", channel.stats());
        }
    }

    Ok(())
}

/// Follow loop until Ctrl+C, then stop the motor
async fn run_follow(channel: Arc<Channel>, settings: FollowSettings) -> Result<()> {
    info!(
        "Following ADC {} with motor {}, press Ctrl+C to stop",
        settings.adc_unit, settings.motor_unit
    );

    let follow = Arc::new(FollowLoop::new(
        AdcDevice::new(channel.clone(), settings.adc_unit),
        MotorDevice::new(channel, settings.motor_unit),
        settings,
    ));
    let mut interval = tokio::time::interval(Duration::from_millis(settings.interval_ms.max(1)));

    loop {
        tokio::select! {
            result = signal::ctrl_c() => {
                if let Err(e) = result {
                    error!("Error waiting for Ctrl+C: {}", e);
                }
                info!("Stopping follow loop");
                break;
            }
            _ = interval.tick() => {
                let step = follow.clone();
                let step = blocking(move || step.step()).await.context("Follow step failed")?;
                println!("value={:#06x} speed={}", step.value, step.speed);
            }
        }
    }

    blocking(move || follow.stop())
        .await
        .context("Failed to stop motor")
}

/// Run a blocking channel call off the async runtime
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> host::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("Blocking task failed")?
        .map_err(anyhow::Error::from)
}

/// Board with a ramp of readings across the ADC units
fn simulated_board() -> SimulatedBoard {
    let board = SimulatedBoard::new();
    for unit in 0..ADC_UNITS {
        board.set_adc(unit, 0x0100 + u16::from(unit) * 0x40);
    }
    board
}
