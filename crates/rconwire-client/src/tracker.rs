use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::error::{ClientError, DisconnectReason, Result};

/// What a pending request is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Auth,
    Command,
}

type Outcome = Result<String>;

struct PendingRequest {
    kind: RequestKind,
    submitted_at: Instant,
    timeout: Duration,
    timer: AbortHandle,
    slot: oneshot::Sender<Outcome>,
}

/// Correlates outstanding requests with their responses.
///
/// Every entry owns a timer task. Whichever of resolve, reject, expire or
/// `cancel_all` reaches the entry first removes it and completes the caller;
/// the others find nothing and return `false`.
pub struct RequestTracker {
    pending: HashMap<i32, PendingRequest>,
    next_id: i32,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
            next_id: 1,
        }
    }

    /// Allocate a single request id.
    ///
    /// Ids run from 1 to `i32::MAX` and then wrap to 1; 0 and -1 are never
    /// issued.
    pub fn next_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id = if id == i32::MAX { 1 } else { id + 1 };
        id
    }

    /// Allocate a command id and its sentinel id (`id + 1`).
    pub fn next_command_ids(&mut self) -> (i32, i32) {
        if self.next_id == i32::MAX {
            self.next_id = 1;
        }
        let id = self.next_id;
        let sentinel = id + 1;
        self.next_id = if sentinel == i32::MAX { 1 } else { sentinel + 1 };
        (id, sentinel)
    }

    /// Store a pending request and start its timer.
    ///
    /// `on_expire` runs on the timer task once `timeout` elapses, unless the
    /// entry completed first. It is expected to call [`Self::expire`] on the
    /// owning tracker. Must be called within a tokio runtime.
    pub fn register<F>(
        &mut self,
        id: i32,
        kind: RequestKind,
        timeout: Duration,
        on_expire: F,
    ) -> Result<PendingHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.pending.contains_key(&id) {
            return Err(ClientError::DuplicateRequest(id));
        }

        let (slot, rx) = oneshot::channel();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            on_expire();
        })
        .abort_handle();

        self.pending.insert(
            id,
            PendingRequest {
                kind,
                submitted_at: Instant::now(),
                timeout,
                timer,
                slot,
            },
        );
        debug!(request_id = id, ?kind, ?timeout, "request registered");

        Ok(PendingHandle { id, kind, rx })
    }

    /// Complete a request successfully.
    pub fn resolve(&mut self, id: i32, payload: String) -> bool {
        self.complete(id, Ok(payload), "request resolved")
    }

    /// Complete a request with an error.
    pub fn reject(&mut self, id: i32, err: ClientError) -> bool {
        self.complete(id, Err(err), "request rejected")
    }

    /// Complete a request with `CommandTimeout`.
    pub fn expire(&mut self, id: i32) -> bool {
        let Some(timeout) = self.pending.get(&id).map(|entry| entry.timeout) else {
            return false;
        };
        self.complete(
            id,
            Err(ClientError::CommandTimeout { id, timeout }),
            "request timed out",
        )
    }

    /// Fail every pending request with the error `reason` maps to.
    ///
    /// Returns how many requests were failed.
    pub fn cancel_all(&mut self, reason: &DisconnectReason) -> usize {
        let count = self.pending.len();
        for (id, entry) in self.pending.drain() {
            entry.timer.abort();
            debug!(request_id = id, kind = ?entry.kind, %reason, "request cancelled");
            let _ = entry.slot.send(Err(reason.pending_error()));
        }
        count
    }

    pub fn contains(&self, id: i32) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn kind_of(&self, id: i32) -> Option<RequestKind> {
        self.pending.get(&id).map(|entry| entry.kind)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn complete(&mut self, id: i32, outcome: Outcome, what: &'static str) -> bool {
        let Some(entry) = self.pending.remove(&id) else {
            return false;
        };
        entry.timer.abort();
        let elapsed_ms = u64::try_from(entry.submitted_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(request_id = id, kind = ?entry.kind, elapsed_ms, "{what}");
        let _ = entry.slot.send(outcome);
        true
    }

    #[cfg(test)]
    pub(crate) fn set_next_id(&mut self, id: i32) {
        self.next_id = id;
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RequestTracker {
    fn drop(&mut self) {
        for entry in self.pending.values() {
            entry.timer.abort();
        }
    }
}

impl fmt::Debug for RequestTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<i32> = self.pending.keys().copied().collect();
        ids.sort_unstable();
        f.debug_struct("RequestTracker")
            .field("pending", &ids)
            .field("next_id", &self.next_id)
            .finish()
    }
}

/// Caller's side of a registered request.
#[derive(Debug)]
pub struct PendingHandle {
    id: i32,
    kind: RequestKind,
    rx: oneshot::Receiver<Outcome>,
}

impl PendingHandle {
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// Wait for the request to complete.
    pub async fn wait(self) -> Result<String> {
        match self.rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(ClientError::Disconnected(DisconnectReason::ConnectionLost(
                "request dropped before completion".to_string(),
            ))),
        }
    }
}
