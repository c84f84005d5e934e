//! In-flight request state

use bytes::{Bytes, BytesMut};
use protocol::RequestId;

/// One client call awaiting its reply
///
/// The payload holds the outbound command until it is framed, then the reply
/// once the dispatcher completes the request. Capacity for a full reply is
/// reserved up front so completion never allocates.
#[derive(Debug)]
pub struct Request {
    id: RequestId,
    payload: BytesMut,
    complete: bool,
}

impl Request {
    pub fn new(id: RequestId, command: &[u8], reply_capacity: usize) -> Self {
        let mut payload = BytesMut::with_capacity(command.len().max(reply_capacity));
        payload.extend_from_slice(command);
        Self {
            id,
            payload,
            complete: false,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Replace the payload with reply bytes and mark the request complete
    pub(crate) fn fill_reply(&mut self, data: &[u8]) {
        self.payload.clear();
        self.payload.extend_from_slice(data);
        self.complete = true;
    }

    /// Convert a completed request into the reply handed to the caller
    pub fn into_reply(self) -> Reply {
        Reply {
            id: self.id,
            data: self.payload.freeze(),
        }
    }
}

/// Reply payload returned by a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub id: RequestId,
    pub data: Bytes,
}

impl Reply {
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Reply text, for acknowledgements
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}
