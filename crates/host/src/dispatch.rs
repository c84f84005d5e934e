//! Inbound dispatch
//!
//! Runs once per received packet on the transport's receive thread. It never
//! blocks beyond the pending table's lock and always re-arms the receive
//! path, whatever happened to the packet.

use crate::pending::{CloseReason, PendingTable};
use crate::stats::ChannelStats;
use crate::transport::{InboundPacket, PacketStatus, ReceivePipe};
use protocol::{FrameHeader, FrameLayout, RequestId};
use std::sync::Arc;
use tracing::{error, trace, warn};

/// Default number of re-arm attempts before the channel is declared dead
pub const DEFAULT_REARM_ATTEMPTS: u32 = 3;

/// What happened to one inbound packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Reply handed to its waiting request
    Delivered(RequestId),
    /// No pending request with this id; packet dropped
    Unmatched(RequestId),
    /// Packet could not be parsed; dropped
    Malformed,
    /// Transfer did not complete; nothing decoded
    Skipped(PacketStatus),
    /// Re-arm failed persistently; the channel is closed
    ChannelDead,
}

/// Inbound packet handler for one channel
#[derive(Debug, Clone)]
pub struct Dispatcher {
    table: Arc<PendingTable>,
    stats: Arc<ChannelStats>,
    layout: FrameLayout,
    rearm_attempts: u32,
}

impl Dispatcher {
    pub fn new(
        table: Arc<PendingTable>,
        stats: Arc<ChannelStats>,
        layout: FrameLayout,
        rearm_attempts: u32,
    ) -> Self {
        Self {
            table,
            stats,
            layout,
            rearm_attempts: rearm_attempts.max(1),
        }
    }

    /// Handle one packet, then re-arm `pipe`
    pub fn dispatch(
        &self,
        packet: InboundPacket<'_>,
        pipe: &mut dyn ReceivePipe,
    ) -> DispatchOutcome {
        let outcome = self.deliver(packet);
        if self.rearm(pipe) {
            outcome
        } else {
            DispatchOutcome::ChannelDead
        }
    }

    fn deliver(&self, packet: InboundPacket<'_>) -> DispatchOutcome {
        match packet.status {
            PacketStatus::Completed => {}
            status if status.is_transient() => {
                self.stats.record_transient();
                warn!("Inbound transfer ended with {:?}", status);
                return DispatchOutcome::Skipped(status);
            }
            status => {
                warn!("Inbound transfer failed with {:?}", status);
                return DispatchOutcome::Skipped(status);
            }
        }

        let header = match FrameHeader::parse(&self.layout, packet.data) {
            Ok(header) => header,
            Err(e) => {
                self.stats.record_malformed();
                warn!("Dropping malformed packet: {}", e);
                return DispatchOutcome::Malformed;
            }
        };

        if self.table.find_and_complete(header.id, header.payload) {
            trace!(
                "Completed {} with {} bytes",
                header.id,
                header.payload.len()
            );
            DispatchOutcome::Delivered(header.id)
        } else {
            self.stats.record_unmatched();
            trace!("No pending request for {}, dropping", header.id);
            DispatchOutcome::Unmatched(header.id)
        }
    }

    fn rearm(&self, pipe: &mut dyn ReceivePipe) -> bool {
        for attempt in 1..=self.rearm_attempts {
            match pipe.rearm() {
                Ok(()) => return true,
                Err(e) => {
                    self.stats.record_rearm_failure();
                    warn!(
                        "Re-arm attempt {}/{} failed: {}",
                        attempt, self.rearm_attempts, e
                    );
                }
            }
        }

        error!(
            "Could not re-arm inbound pipe after {} attempts, closing channel",
            self.rearm_attempts
        );
        self.table.close(CloseReason::ChannelDead);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::request::Request;
    use protocol::{CURRENT_LAYOUT, Frame, pack};

    #[derive(Default)]
    struct CountingPipe {
        rearms: u32,
        failures_left: u32,
    }

    impl ReceivePipe for CountingPipe {
        fn rearm(&mut self) -> Result<(), TransportError> {
            self.rearms += 1;
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(TransportError::Rearm("busy".into()));
            }
            Ok(())
        }
    }

    fn dispatcher() -> (Dispatcher, Arc<PendingTable>, Arc<ChannelStats>) {
        let table = Arc::new(PendingTable::new());
        let stats = Arc::new(ChannelStats::new());
        let dispatcher = Dispatcher::new(
            table.clone(),
            stats.clone(),
            CURRENT_LAYOUT,
            DEFAULT_REARM_ATTEMPTS,
        );
        (dispatcher, table, stats)
    }

    #[test]
    fn test_delivers_matching_reply() {
        let (dispatcher, table, _) = dispatcher();
        table.insert(Request::new(RequestId(3), &[b'a', 3], 61));
        let mut pipe = CountingPipe::default();

        let frame = pack(&Frame::new(RequestId(3), vec![0x01, 0x2C])).unwrap();
        let outcome = dispatcher.dispatch(InboundPacket::completed(&frame), &mut pipe);

        assert_eq!(outcome, DispatchOutcome::Delivered(RequestId(3)));
        assert_eq!(table.remove(RequestId(3)).unwrap().payload(), &[0x01, 0x2C]);
        assert_eq!(pipe.rearms, 1);
    }

    #[test]
    fn test_rearms_after_every_outcome() {
        let (dispatcher, _, stats) = dispatcher();
        let mut pipe = CountingPipe::default();

        let unmatched = pack(&Frame::new(RequestId(9), vec![1])).unwrap();
        assert_eq!(
            dispatcher.dispatch(InboundPacket::completed(&unmatched), &mut pipe),
            DispatchOutcome::Unmatched(RequestId(9))
        );
        assert_eq!(
            dispatcher.dispatch(InboundPacket::completed(&[1, 0]), &mut pipe),
            DispatchOutcome::Malformed
        );
        assert_eq!(
            dispatcher.dispatch(InboundPacket::failed(PacketStatus::ConnectionReset), &mut pipe),
            DispatchOutcome::Skipped(PacketStatus::ConnectionReset)
        );
        assert_eq!(
            dispatcher.dispatch(InboundPacket::failed(PacketStatus::Overflow), &mut pipe),
            DispatchOutcome::Skipped(PacketStatus::Overflow)
        );

        assert_eq!(pipe.rearms, 4);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.dropped_unmatched, 1);
        assert_eq!(snapshot.dropped_malformed, 1);
        assert_eq!(snapshot.transient_statuses, 1);
    }

    #[test]
    fn test_rearm_retry_recovers() {
        let (dispatcher, table, stats) = dispatcher();
        let mut pipe = CountingPipe {
            failures_left: 2,
            ..Default::default()
        };

        let packet = InboundPacket::failed(PacketStatus::Cancelled);
        let outcome = dispatcher.dispatch(packet, &mut pipe);
        assert_eq!(outcome, DispatchOutcome::Skipped(PacketStatus::Cancelled));
        assert_eq!(pipe.rearms, 3);
        assert_eq!(stats.snapshot().rearm_failures, 2);
        assert!(!table.is_closed());
    }

    #[test]
    fn test_persistent_rearm_failure_closes_table() {
        let (dispatcher, table, _) = dispatcher();
        let mut pipe = CountingPipe {
            failures_left: u32::MAX,
            ..Default::default()
        };

        let frame = pack(&Frame::new(RequestId(1), vec![1])).unwrap();
        let outcome = dispatcher.dispatch(InboundPacket::completed(&frame), &mut pipe);

        assert_eq!(outcome, DispatchOutcome::ChannelDead);
        assert_eq!(pipe.rearms, DEFAULT_REARM_ATTEMPTS);
        assert_eq!(table.closed(), Some(CloseReason::ChannelDead));
    }
}
