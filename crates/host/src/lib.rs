//! Teensy host driver
//!
//! Multiplexes blocking ADC and motor requests over one interrupt pipe pair.
//! Each [`Channel::transact`] call frames its command under a fresh request
//! id, submits it, and sleeps until the dispatch path matches a reply with the
//! same id.
//!
//! # Example
//!
//! ```no_run
//! use firmware::SimulatedBoard;
//! use host::{AdcDevice, ChannelOptions, LoopbackTransport};
//!
//! let board = SimulatedBoard::new();
//! board.set_adc(3, 300);
//! let (channel, _transport) = LoopbackTransport::spawn(board, ChannelOptions::default())?;
//! assert_eq!(AdcDevice::new(channel, 3).read_value()?, 300);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod channel;
pub mod chardev;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod follow;
pub mod loopback;
pub mod pending;
pub mod request;
pub mod stats;
pub mod transport;
pub mod usb;

pub use channel::{Channel, ChannelOptions};
pub use chardev::{AdcDevice, IoctlRequest, MC_IOC_FWD, MC_IOC_REV, MC_IOC_STOP, MotorDevice};
pub use config::{FollowSettings, HostConfig};
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use error::{HostError, Result, TransportError};
pub use follow::{FollowLoop, FollowStep};
pub use loopback::LoopbackTransport;
pub use pending::{CloseReason, PendingTable, WaitError};
pub use request::{Reply, Request};
pub use stats::{ChannelStats, StatsSnapshot};
pub use transport::{InboundPacket, OutboundPipe, PacketStatus, ReceivePipe};
pub use usb::UsbTransport;
