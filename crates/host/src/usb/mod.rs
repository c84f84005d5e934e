//! USB transport
//!
//! Binds a [`Channel`] to a real Teensy over libusb. Blocking submitters hand
//! frames to the link queue; the writer thread owns the OUT endpoint and the
//! reader thread owns the IN endpoint and the dispatch path.

pub mod device;
pub mod transfers;
pub mod worker;

use crate::channel::{Channel, ChannelOptions};
use crate::config::UsbSettings;
use crate::error::TransportError;
use crate::transport::OutboundPipe;
use common::{LinkSender, create_link};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use tracing::{error, info};

pub use device::TeensyDevice;
pub use worker::PipeConfig;

/// Outbound pipe backed by the link queue
struct QueuedOutbound {
    sender: LinkSender,
}

impl OutboundPipe for QueuedOutbound {
    fn submit(&self, frame: Vec<u8>) -> Result<(), TransportError> {
        self.sender.transmit(frame).map_err(TransportError::from)
    }

    fn close(&self) {
        self.sender.shutdown();
    }
}

/// Running USB transport
pub struct UsbTransport {
    sender: LinkSender,
    running: Arc<AtomicBool>,
    writer: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
}

impl UsbTransport {
    /// Open the device and start the link threads
    pub fn open(
        settings: &UsbSettings,
        options: ChannelOptions,
    ) -> Result<(Arc<Channel>, UsbTransport), TransportError> {
        let device = Arc::new(TeensyDevice::open(settings)?);
        let pipes = PipeConfig {
            in_endpoint: settings.in_endpoint,
            out_endpoint: settings.out_endpoint,
            frame_size: options.layout.frame_size(),
            poll_timeout: settings.poll_timeout(),
            write_timeout: settings.write_timeout(),
        };

        let (sender, receiver) = create_link();
        let channel = Arc::new(Channel::open(
            Arc::new(QueuedOutbound {
                sender: sender.clone(),
            }),
            options,
        ));

        let running = Arc::new(AtomicBool::new(true));
        let writer = worker::spawn_writer(device.clone(), receiver, pipes)?;
        let dispatcher = channel.dispatcher();
        let reader = match worker::spawn_reader(device, dispatcher, running.clone(), pipes) {
            Ok(reader) => reader,
            Err(e) => {
                sender.shutdown();
                let _ = writer.join();
                return Err(e);
            }
        };

        info!(
            "USB transport up: IN {:#04x}, OUT {:#04x}",
            settings.in_endpoint, settings.out_endpoint
        );

        Ok((
            channel,
            UsbTransport {
                sender,
                running,
                writer: Some(writer),
                reader: Some(reader),
            },
        ))
    }

    /// Stop both threads and wait for them
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        self.sender.shutdown();

        for handle in [self.writer.take(), self.reader.take()].into_iter().flatten() {
            if let Err(e) = handle.join() {
                error!("USB link thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for UsbTransport {
    fn drop(&mut self) {
        self.shutdown();
    }
}
