//! Pending-request table
//!
//! Requests awaiting a reply, shared between blocking submitters and the
//! dispatch path. One mutex guards the entries and the closed flag; a condvar
//! is signalled whenever a request completes or the table closes.
//!
//! The dispatch side only ever calls [`PendingTable::find_and_complete`],
//! which holds the lock for a linear scan and a bounded copy and never waits.

use crate::request::Request;
use protocol::RequestId;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::trace;

/// Why the table stopped accepting waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Channel closed by its owner
    Shutdown,
    /// The receive path could not be re-armed
    ChannelDead,
}

/// Ways a wait can end without a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    TimedOut,
    Closed,
    ChannelDead,
    /// No entry with that id is in the table
    NotPending,
}

#[derive(Debug, Default)]
struct TableState {
    entries: Vec<Request>,
    closed: Option<CloseReason>,
}

impl TableState {
    fn position(&self, id: RequestId) -> Option<usize> {
        self.entries.iter().position(|r| r.id() == id)
    }
}

/// Table of in-flight requests
#[derive(Debug, Default)]
pub struct PendingTable {
    state: Mutex<TableState>,
    completed: Condvar,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TableState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a request
    pub fn insert(&self, request: Request) {
        trace!("Pending {}", request.id());
        self.lock().entries.push(request);
    }

    /// Insert the request built for the first id at or after `start` that is
    /// not already pending
    ///
    /// Returns `None` when every id is in flight.
    pub fn insert_unused(
        &self,
        start: RequestId,
        make: impl FnOnce(RequestId) -> Request,
    ) -> Option<RequestId> {
        let mut state = self.lock();
        let mut id = start;
        for _ in 0..=u8::MAX as usize {
            if state.position(id).is_none() {
                state.entries.push(make(id));
                trace!("Pending {}", id);
                return Some(id);
            }
            id = id.wrapping_next();
        }
        None
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.lock().position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Complete the pending request with `id` using `reply`
    ///
    /// Returns false, touching nothing, when no uncompleted request has that
    /// id. Waiters are notified after the lock is released.
    pub fn find_and_complete(&self, id: RequestId, reply: &[u8]) -> bool {
        {
            let mut state = self.lock();
            let Some(request) = state
                .entries
                .iter_mut()
                .find(|r| r.id() == id && !r.is_complete())
            else {
                return false;
            };
            request.fill_reply(reply);
        }
        self.completed.notify_all();
        true
    }

    /// Unlink a request and hand it back
    pub fn remove(&self, id: RequestId) -> Option<Request> {
        let mut state = self.lock();
        let index = state.position(id)?;
        Some(state.entries.swap_remove(index))
    }

    /// Block until the request with `id` completes
    ///
    /// A completed request is reported even if the table closed afterwards.
    /// `deadline` of `None` waits indefinitely.
    pub fn wait_until_complete(
        &self,
        id: RequestId,
        deadline: Option<Instant>,
    ) -> Result<(), WaitError> {
        let mut state = self.lock();
        loop {
            match state.entries.iter().find(|r| r.id() == id) {
                None => return Err(WaitError::NotPending),
                Some(request) if request.is_complete() => return Ok(()),
                Some(_) => {}
            }

            match state.closed {
                Some(CloseReason::Shutdown) => return Err(WaitError::Closed),
                Some(CloseReason::ChannelDead) => return Err(WaitError::ChannelDead),
                None => {}
            }

            state = match deadline {
                None => self
                    .completed
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(WaitError::TimedOut);
                    }
                    self.completed
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    /// Close the table and wake every waiter
    ///
    /// The first reason recorded wins.
    pub fn close(&self, reason: CloseReason) {
        {
            let mut state = self.lock();
            if state.closed.is_none() {
                state.closed = Some(reason);
            }
        }
        self.completed.notify_all();
    }

    pub fn closed(&self) -> Option<CloseReason> {
        self.lock().closed
    }

    pub fn is_closed(&self) -> bool {
        self.closed().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::MAX_PAYLOAD;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn request(id: u8) -> Request {
        Request::new(RequestId(id), &[b'a', 0], MAX_PAYLOAD)
    }

    #[test]
    fn test_complete_then_remove() {
        let table = PendingTable::new();
        table.insert(request(5));

        assert!(table.find_and_complete(RequestId(5), &[1, 2]));
        table.wait_until_complete(RequestId(5), None).unwrap();

        let done = table.remove(RequestId(5)).unwrap();
        assert_eq!(done.payload(), &[1, 2]);
        assert!(table.is_empty());
    }

    #[test]
    fn test_second_reply_is_dropped() {
        let table = PendingTable::new();
        table.insert(request(5));

        assert!(table.find_and_complete(RequestId(5), &[1]));
        assert!(!table.find_and_complete(RequestId(5), &[2]));

        let done = table.remove(RequestId(5)).unwrap();
        assert_eq!(done.payload(), &[1]);
    }

    #[test]
    fn test_unmatched_leaves_table_alone() {
        let table = PendingTable::new();
        table.insert(request(1));
        assert!(!table.find_and_complete(RequestId(2), &[9]));
        assert!(!table.remove(RequestId(1)).unwrap().is_complete());
    }

    #[test]
    fn test_insert_unused_skips_pending() {
        let table = PendingTable::new();
        table.insert(request(7));
        table.insert(request(8));

        let id = table.insert_unused(RequestId(7), request_for).unwrap();
        assert_eq!(id, RequestId(9));
        assert!(table.contains(RequestId(9)));
    }

    #[test]
    fn test_insert_unused_exhausted() {
        let table = PendingTable::new();
        for id in 0..=255u8 {
            table.insert(request(id));
        }
        assert_eq!(table.insert_unused(RequestId(0), request_for), None);
        assert_eq!(table.len(), 256);
    }

    fn request_for(id: RequestId) -> Request {
        request(id.0)
    }

    #[test]
    fn test_wait_times_out() {
        let table = PendingTable::new();
        table.insert(request(1));
        let deadline = Instant::now() + Duration::from_millis(20);
        assert_eq!(
            table.wait_until_complete(RequestId(1), Some(deadline)),
            Err(WaitError::TimedOut)
        );
    }

    #[test]
    fn test_wait_not_pending() {
        let table = PendingTable::new();
        assert_eq!(
            table.wait_until_complete(RequestId(1), None),
            Err(WaitError::NotPending)
        );
    }

    #[test]
    fn test_completion_wakes_waiter() {
        let table = Arc::new(PendingTable::new());
        table.insert(request(4));

        let waiter = {
            let table = table.clone();
            thread::spawn(move || table.wait_until_complete(RequestId(4), None))
        };

        thread::sleep(Duration::from_millis(10));
        assert!(table.find_and_complete(RequestId(4), &[0, 7]));
        assert_eq!(waiter.join().unwrap(), Ok(()));
    }

    #[test]
    fn test_close_wakes_waiter() {
        let table = Arc::new(PendingTable::new());
        table.insert(request(4));

        let waiter = {
            let table = table.clone();
            thread::spawn(move || table.wait_until_complete(RequestId(4), None))
        };

        thread::sleep(Duration::from_millis(10));
        table.close(CloseReason::ChannelDead);
        table.close(CloseReason::Shutdown);
        assert_eq!(waiter.join().unwrap(), Err(WaitError::ChannelDead));
        assert_eq!(table.closed(), Some(CloseReason::ChannelDead));
    }

    #[test]
    fn test_completed_before_close_still_succeeds() {
        let table = PendingTable::new();
        table.insert(request(2));
        table.find_and_complete(RequestId(2), &[1]);
        table.close(CloseReason::Shutdown);
        assert_eq!(table.wait_until_complete(RequestId(2), None), Ok(()));
    }
}
