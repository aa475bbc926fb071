use std::fmt;

use rconwire_frame::{Frame, AUTH_FAILURE_ID, AUTH_RESPONSE, RESPONSE_VALUE};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};

/// Authentication progress on the current connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    /// The server rejected the last attempt. A new attempt may be made.
    Failed,
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuthState::Unauthenticated => "unauthenticated",
            AuthState::Authenticating => "authenticating",
            AuthState::Authenticated => "authenticated",
            AuthState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Whether an `authenticate` call needs to talk to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStart {
    AlreadyAuthenticated,
    Proceed,
}

/// What an inbound frame meant to the auth machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Not related to the pending auth request.
    NotAuth,
    /// The empty `RESPONSE_VALUE` some servers send ahead of the real answer.
    Ignored,
    /// The server accepted the password for request `id`.
    Accepted(i32),
    /// The server answered request `id` with the failure sentinel.
    Rejected(i32),
}

/// `Unauthenticated -> Authenticating -> Authenticated | Failed`.
#[derive(Debug)]
pub struct AuthMachine {
    state: AuthState,
    pending: Option<i32>,
}

impl AuthMachine {
    pub fn new() -> Self {
        Self {
            state: AuthState::Unauthenticated,
            pending: None,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Id of the outstanding auth request, if any.
    pub fn pending_id(&self) -> Option<i32> {
        self.pending
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    /// Decide whether an attempt may start. `connected` is the transport state.
    pub fn check_start(&self, connected: bool) -> Result<AuthStart> {
        if !connected {
            return Err(ClientError::NotConnected);
        }
        match self.state {
            AuthState::Authenticated => Ok(AuthStart::AlreadyAuthenticated),
            AuthState::Authenticating => Err(ClientError::AuthInProgress),
            AuthState::Unauthenticated | AuthState::Failed => Ok(AuthStart::Proceed),
        }
    }

    /// Record that the auth request `id` was registered and is being sent.
    pub fn start(&mut self, id: i32) {
        debug!(request_id = id, "authentication started");
        self.state = AuthState::Authenticating;
        self.pending = Some(id);
    }

    /// Interpret an inbound frame.
    pub fn on_frame(&mut self, frame: &Frame) -> AuthOutcome {
        let Some(id) = self.pending else {
            return AuthOutcome::NotAuth;
        };

        if frame.request_id == AUTH_FAILURE_ID {
            warn!(request_id = id, "server rejected authentication");
            self.pending = None;
            self.state = AuthState::Failed;
            return AuthOutcome::Rejected(id);
        }
        if frame.request_id != id {
            return AuthOutcome::NotAuth;
        }

        match frame.packet_type {
            AUTH_RESPONSE => {
                self.pending = None;
                self.state = AuthState::Authenticated;
                AuthOutcome::Accepted(id)
            }
            RESPONSE_VALUE => {
                debug!(request_id = id, "ignoring empty response ahead of auth reply");
                AuthOutcome::Ignored
            }
            other => {
                warn!(request_id = id, packet_type = other, "unexpected packet type for auth reply");
                AuthOutcome::Ignored
            }
        }
    }

    /// The auth request `id` timed out; allow a fresh attempt.
    pub fn expire(&mut self, id: i32) -> bool {
        if self.pending != Some(id) {
            return false;
        }
        self.pending = None;
        self.state = AuthState::Unauthenticated;
        true
    }

    /// Forget everything; used on teardown.
    pub fn reset(&mut self) {
        self.pending = None;
        self.state = AuthState::Unauthenticated;
    }
}

impl Default for AuthMachine {
    fn default() -> Self {
        Self::new()
    }
}
