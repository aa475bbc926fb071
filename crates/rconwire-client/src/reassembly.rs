use std::collections::HashMap;

use bytes::BytesMut;
use rconwire_frame::Frame;

/// Where an inbound response frame belongs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// One more piece of the response to `command_id`.
    Fragment { command_id: i32 },
    /// The sentinel echo arrived; `payload` is every fragment in order.
    Complete { command_id: i32, payload: String },
    /// Nobody is waiting for this id.
    Unknown,
}

#[derive(Debug)]
struct Accumulator {
    sentinel_id: i32,
    buf: BytesMut,
    fragments: usize,
}

/// Collects multi-packet command responses.
///
/// Each command `N` is followed on the wire by an empty probe `N+1`. The
/// server answers in order, so every frame carrying `N` is part of the
/// answer and the frame carrying `N+1` marks its end.
#[derive(Debug, Default)]
pub struct FragmentReassembler {
    responses: HashMap<i32, Accumulator>,
    sentinels: HashMap<i32, i32>,
}

impl FragmentReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start collecting the response to `command_id`, terminated by
    /// `sentinel_id`.
    pub fn begin(&mut self, command_id: i32, sentinel_id: i32) {
        self.discard(command_id);
        self.responses.insert(
            command_id,
            Accumulator {
                sentinel_id,
                buf: BytesMut::new(),
                fragments: 0,
            },
        );
        self.sentinels.insert(sentinel_id, command_id);
    }

    /// Route one frame.
    pub fn accept(&mut self, frame: &Frame) -> Routed {
        let id = frame.request_id;

        if let Some(acc) = self.responses.get_mut(&id) {
            acc.buf.extend_from_slice(&frame.payload);
            acc.fragments += 1;
            return Routed::Fragment { command_id: id };
        }

        let Some(command_id) = self.sentinels.remove(&id) else {
            return Routed::Unknown;
        };
        let Some(acc) = self.responses.remove(&command_id) else {
            return Routed::Unknown;
        };

        tracing::debug!(
            request_id = command_id,
            fragments = acc.fragments,
            size = acc.buf.len(),
            "response reassembled"
        );
        // Decode once so multi-byte characters split across frames survive.
        let payload = String::from_utf8_lossy(&acc.buf).into_owned();
        Routed::Complete {
            command_id,
            payload,
        }
    }

    /// Drop a partial response. Returns whether one was tracked.
    pub fn discard(&mut self, command_id: i32) -> bool {
        match self.responses.remove(&command_id) {
            Some(acc) => {
                self.sentinels.remove(&acc.sentinel_id);
                true
            }
            None => false,
        }
    }

    /// Drop every partial response.
    pub fn clear(&mut self) {
        self.responses.clear();
        self.sentinels.clear();
    }

    pub fn is_tracking(&self, command_id: i32) -> bool {
        self.responses.contains_key(&command_id)
    }

    /// Number of responses still being collected.
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}
