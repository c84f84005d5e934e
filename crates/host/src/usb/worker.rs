//! USB link threads
//!
//! The writer thread drains the link queue and performs one interrupt OUT
//! transfer per frame, releasing the frame when the transfer finishes. The
//! reader thread keeps an interrupt IN transfer pending and runs the
//! dispatcher on every packet.

use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::error::TransportError;
use crate::transport::{InboundPacket, ReceivePipe};
use crate::usb::device::TeensyDevice;
use crate::usb::transfers::{read_frame, status_for, write_frame};
use common::{LinkCommand, LinkReceiver};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pause after a failed receive before polling again
const ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Endpoint addresses and timeouts the threads run with
#[derive(Debug, Clone, Copy)]
pub struct PipeConfig {
    pub in_endpoint: u8,
    pub out_endpoint: u8,
    pub frame_size: usize,
    pub poll_timeout: Duration,
    pub write_timeout: Duration,
}

/// Receive side as seen by the dispatcher
///
/// libusb keeps no receive queued between polls, so re-arming only fails
/// once the device is gone.
struct UsbReceiver {
    disconnected: bool,
}

impl ReceivePipe for UsbReceiver {
    fn rearm(&mut self) -> Result<(), TransportError> {
        if self.disconnected {
            return Err(TransportError::Disconnected);
        }
        Ok(())
    }
}

pub(crate) fn spawn_writer(
    device: Arc<TeensyDevice>,
    receiver: LinkReceiver,
    pipes: PipeConfig,
) -> Result<JoinHandle<()>, TransportError> {
    thread::Builder::new()
        .name("usb-writer".to_string())
        .spawn(move || run_writer(&device, &receiver, pipes))
        .map_err(|source| TransportError::Spawn {
            name: "usb-writer",
            source,
        })
}

fn run_writer(device: &TeensyDevice, receiver: &LinkReceiver, pipes: PipeConfig) {
    info!("USB writer started");
    loop {
        match receiver.recv_blocking() {
            LinkCommand::Transmit(frame) => {
                if let Err(e) = write_frame(device, pipes.out_endpoint, &frame, pipes.write_timeout)
                {
                    warn!("Outbound transfer failed: {}", e);
                    if matches!(e, TransportError::Disconnected) {
                        break;
                    }
                }
            }
            LinkCommand::Inject(bytes) => {
                debug!("Ignoring {} injected bytes on a USB link", bytes.len());
            }
            LinkCommand::Shutdown => break,
        }
    }
    info!("USB writer stopped");
}

pub(crate) fn spawn_reader(
    device: Arc<TeensyDevice>,
    dispatcher: Dispatcher,
    running: Arc<AtomicBool>,
    pipes: PipeConfig,
) -> Result<JoinHandle<()>, TransportError> {
    thread::Builder::new()
        .name("usb-reader".to_string())
        .spawn(move || run_reader(&device, &dispatcher, &running, pipes))
        .map_err(|source| TransportError::Spawn {
            name: "usb-reader",
            source,
        })
}

fn run_reader(
    device: &TeensyDevice,
    dispatcher: &Dispatcher,
    running: &AtomicBool,
    pipes: PipeConfig,
) {
    info!("USB reader started");
    let mut receiver = UsbReceiver {
        disconnected: false,
    };
    let mut buf = vec![0u8; pipes.frame_size];

    while running.load(Ordering::Acquire) {
        let outcome = match read_frame(device, pipes.in_endpoint, &mut buf, pipes.poll_timeout) {
            Ok(None) => continue,
            Ok(Some(len)) => {
                dispatcher.dispatch(InboundPacket::completed(&buf[..len]), &mut receiver)
            }
            Err(e) => {
                if e == rusb::Error::NoDevice {
                    receiver.disconnected = true;
                }
                let outcome =
                    dispatcher.dispatch(InboundPacket::failed(status_for(e)), &mut receiver);
                thread::sleep(ERROR_BACKOFF);
                outcome
            }
        };

        if outcome == DispatchOutcome::ChannelDead {
            break;
        }
    }
    info!("USB reader stopped");
}
