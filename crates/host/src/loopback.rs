//! In-process loopback transport
//!
//! Connects a [`Channel`] to the firmware interpreter running on a
//! [`SimulatedBoard`]. Outbound frames travel through the link queue to a
//! firmware thread, whose replies go through the channel's dispatcher the
//! same way USB packets do. Faults can be injected for tests.

use crate::channel::{Channel, ChannelOptions};
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::error::TransportError;
use crate::transport::{InboundPacket, OutboundPipe, ReceivePipe};
use common::{LinkCommand, LinkReceiver, LinkSender, create_link};
use firmware::{Interpreter, SimulatedBoard};
use protocol::FrameLayout;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

#[derive(Debug, Default)]
struct Faults {
    drop_replies: AtomicU32,
    fail_rearms: AtomicU32,
}

impl Faults {
    fn take(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }
}

struct LoopbackOutbound {
    sender: LinkSender,
}

impl OutboundPipe for LoopbackOutbound {
    fn submit(&self, frame: Vec<u8>) -> Result<(), TransportError> {
        self.sender.transmit(frame).map_err(TransportError::from)
    }

    fn close(&self) {
        self.sender.shutdown();
    }
}

struct LoopbackReceiver {
    faults: Arc<Faults>,
}

impl ReceivePipe for LoopbackReceiver {
    fn rearm(&mut self) -> Result<(), TransportError> {
        if Faults::take(&self.faults.fail_rearms) {
            return Err(TransportError::Rearm("injected failure".to_string()));
        }
        Ok(())
    }
}

/// Running loopback transport
pub struct LoopbackTransport {
    sender: LinkSender,
    faults: Arc<Faults>,
    firmware: Option<JoinHandle<()>>,
}

impl LoopbackTransport {
    /// Start the firmware thread and open a channel to it
    pub fn spawn(
        board: SimulatedBoard,
        options: ChannelOptions,
    ) -> Result<(Arc<Channel>, LoopbackTransport), TransportError> {
        let (sender, receiver) = create_link();
        let channel = Arc::new(Channel::open(
            Arc::new(LoopbackOutbound {
                sender: sender.clone(),
            }),
            options,
        ));

        let faults = Arc::new(Faults::default());
        let dispatcher = channel.dispatcher();
        let thread_faults = faults.clone();
        let layout = options.layout;
        let firmware = thread::Builder::new()
            .name("loopback-firmware".to_string())
            .spawn(move || run_firmware(board, layout, &receiver, &dispatcher, thread_faults))
            .map_err(|source| TransportError::Spawn {
                name: "loopback-firmware",
                source,
            })?;

        info!("Loopback transport up");
        Ok((
            channel,
            LoopbackTransport {
                sender,
                faults,
                firmware: Some(firmware),
            },
        ))
    }

    /// Swallow the next `count` replies the firmware produces
    pub fn drop_next_replies(&self, count: u32) {
        self.faults.drop_replies.fetch_add(count, Ordering::AcqRel);
    }

    /// Fail the next `count` re-arm attempts
    pub fn fail_next_rearms(&self, count: u32) {
        self.faults.fail_rearms.fetch_add(count, Ordering::AcqRel);
    }

    /// Deliver raw bytes to the dispatcher as if they had been received
    ///
    /// Ordered after every frame submitted before the call.
    pub fn inject(&self, bytes: Vec<u8>) -> Result<(), TransportError> {
        self.sender.inject(bytes).map_err(TransportError::from)
    }

    /// Stop the firmware thread and wait for it
    pub fn shutdown(&mut self) {
        self.sender.shutdown();
        if let Some(handle) = self.firmware.take() {
            if let Err(e) = handle.join() {
                error!("Loopback firmware thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for LoopbackTransport {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_firmware(
    board: SimulatedBoard,
    layout: FrameLayout,
    receiver: &LinkReceiver,
    dispatcher: &Dispatcher,
    faults: Arc<Faults>,
) {
    let mut interpreter = Interpreter::with_layout(board, layout);
    let mut pipe = LoopbackReceiver {
        faults: faults.clone(),
    };

    loop {
        let outcome = match receiver.recv_blocking() {
            LinkCommand::Transmit(frame) => match interpreter.handle_frame(&frame) {
                Ok(_) if Faults::take(&faults.drop_replies) => {
                    debug!("Dropping reply by request");
                    continue;
                }
                Ok(reply) => dispatcher.dispatch(InboundPacket::completed(&reply), &mut pipe),
                Err(e) => {
                    warn!("Firmware rejected frame: {}", e);
                    continue;
                }
            },
            LinkCommand::Inject(bytes) => {
                dispatcher.dispatch(InboundPacket::completed(&bytes), &mut pipe)
            }
            LinkCommand::Shutdown => break,
        };

        if outcome == DispatchOutcome::ChannelDead {
            break;
        }
    }
    debug!(
        "Loopback firmware stopped after {} requests",
        interpreter.handled()
    );
}
