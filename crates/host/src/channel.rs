//! Request/response channel
//!
//! One [`Channel`] per attached device. It owns the pending table, the id
//! allocator and the statistics, and pairs an [`OutboundPipe`] with the
//! [`Dispatcher`] the transport's receive thread runs.
//!
//! Lock order: id allocator, then pending table. The dispatch path only takes
//! the table lock.

use crate::dispatch::{DEFAULT_REARM_ATTEMPTS, Dispatcher};
use crate::error::{HostError, Result};
use crate::pending::{CloseReason, PendingTable, WaitError};
use crate::request::{Reply, Request};
use crate::stats::{ChannelStats, StatsSnapshot};
use crate::transport::OutboundPipe;
use protocol::{CURRENT_LAYOUT, FrameLayout, RequestId};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Channel tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelOptions {
    pub layout: FrameLayout,
    /// Bound on each wait for a reply; `None` waits indefinitely
    pub reply_timeout: Option<Duration>,
    pub rearm_attempts: u32,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            layout: CURRENT_LAYOUT,
            reply_timeout: None,
            rearm_attempts: DEFAULT_REARM_ATTEMPTS,
        }
    }
}

/// Multiplexes blocking callers over one outbound and one inbound pipe
pub struct Channel {
    table: Arc<PendingTable>,
    stats: Arc<ChannelStats>,
    next_id: Mutex<RequestId>,
    outbound: Arc<dyn OutboundPipe>,
    dispatcher: Dispatcher,
    options: ChannelOptions,
}

impl Channel {
    pub fn open(outbound: Arc<dyn OutboundPipe>, options: ChannelOptions) -> Self {
        let table = Arc::new(PendingTable::new());
        let stats = Arc::new(ChannelStats::new());
        let dispatcher = Dispatcher::new(
            table.clone(),
            stats.clone(),
            options.layout,
            options.rearm_attempts,
        );

        debug!(
            "Opened channel: {} byte frames, reply timeout {:?}",
            options.layout.frame_size(),
            options.reply_timeout
        );

        Self {
            table,
            stats,
            next_id: Mutex::new(RequestId(0)),
            outbound,
            dispatcher,
            options,
        }
    }

    /// Send `payload` and block until its reply arrives
    ///
    /// The reply is truncated to `limit` bytes. The request is always removed
    /// from the pending table before this returns.
    pub fn transact(&self, payload: &[u8], limit: usize) -> Result<Reply> {
        match self.table.closed() {
            Some(CloseReason::Shutdown) => return Err(HostError::Closed),
            Some(CloseReason::ChannelDead) => return Err(HostError::ChannelDead),
            None => {}
        }

        let id = self.allocate(payload)?;

        let mut frame = vec![0u8; self.options.layout.frame_size()];
        if let Err(e) = self.options.layout.pack_into(id, payload, &mut frame) {
            self.table.remove(id);
            return Err(HostError::InvalidSize(e));
        }

        if let Err(e) = self.outbound.submit(frame) {
            self.table.remove(id);
            warn!("Submit of {} failed: {}", id, e);
            return Err(HostError::Transport(e));
        }
        self.stats.record_submitted();
        debug!("Submitted {} ({} bytes)", id, payload.len());

        let deadline = self.options.reply_timeout.map(|t| Instant::now() + t);
        let waited = self.table.wait_until_complete(id, deadline);
        let request = self.table.remove(id);

        match waited {
            Ok(()) => {}
            Err(WaitError::TimedOut) => {
                self.stats.record_timed_out();
                let timeout = self.options.reply_timeout.unwrap_or_default();
                warn!("No reply to {} within {:?}", id, timeout);
                return Err(HostError::Timeout(timeout));
            }
            Err(WaitError::Closed) | Err(WaitError::NotPending) => return Err(HostError::Closed),
            Err(WaitError::ChannelDead) => return Err(HostError::ChannelDead),
        }

        let mut reply = request.ok_or(HostError::Closed)?.into_reply();
        reply.data.truncate(limit);
        self.stats.record_completed();
        debug!("Reply to {}: {} bytes", id, reply.size());
        Ok(reply)
    }

    /// Reserve a fresh id by inserting its request
    fn allocate(&self, payload: &[u8]) -> Result<RequestId> {
        let mut next = self.next_id.lock().unwrap_or_else(PoisonError::into_inner);
        let reply_capacity = self.options.layout.max_payload();
        let id = self
            .table
            .insert_unused(*next, |id| Request::new(id, payload, reply_capacity))
            .ok_or(HostError::Busy)?;
        *next = id.wrapping_next();
        Ok(id)
    }

    /// Handler the transport's receive thread runs per packet
    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn pending(&self) -> usize {
        self.table.len()
    }

    pub fn options(&self) -> &ChannelOptions {
        &self.options
    }

    /// Wake every waiter with [`HostError::Closed`] and stop the outbound pipe
    pub fn close(&self) {
        if self.table.closed().is_none() {
            debug!("Closing channel with {} pending", self.table.len());
        }
        self.table.close(CloseReason::Shutdown);
        self.outbound.close();
    }

    pub fn is_closed(&self) -> bool {
        self.table.is_closed()
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.close();
    }
}
