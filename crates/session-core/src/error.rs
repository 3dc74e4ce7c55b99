//! Session-level error taxonomy
//!
//! Wraps the negotiation taxonomy and adds the signaling-send and
//! state-machine failures. The reason-code mapping to the wire lives in
//! [`reason_for_media_error`]; the human-readable message always travels in
//! the terminate reason text.

use rjabber_jingle_core::{JingleError, Reason};
use rjabber_media_core::MediaError;
use thiserror::Error;

/// Result type for call-peer operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can occur while driving a call peer
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Jingle(#[from] JingleError),

    /// The XMPP layer failed to deliver an outbound stanza
    #[error("Signaling send failed: {message}")]
    Signaling { message: String },

    /// An operation was invoked in a state where it cannot apply
    #[error("Cannot {action} in state {state}")]
    InvalidState { action: String, state: String },

    /// A XEP-0251 transfer request failed validation
    #[error("Invalid transfer: {message}")]
    InvalidTransfer { message: String },
}

impl SessionError {
    pub fn signaling(message: impl Into<String>) -> Self {
        Self::Signaling { message: message.into() }
    }

    pub fn invalid_state(action: impl Into<String>, state: impl std::fmt::Display) -> Self {
        Self::InvalidState { action: action.into(), state: state.to_string() }
    }

    pub fn invalid_transfer(message: impl Into<String>) -> Self {
        Self::InvalidTransfer { message: message.into() }
    }
}

/// Maps a negotiation failure onto the Jingle reason sent to the peer.
pub fn reason_for_media_error(error: &MediaError) -> Reason {
    match error {
        MediaError::NoMatchingFormats { .. } | MediaError::SecurityNegotiation { .. } => {
            Reason::IncompatibleParameters
        }
        MediaError::NoActiveDevice | MediaError::DeviceUnavailable { .. } => {
            Reason::FailedApplication
        }
        MediaError::ProtocolSequence { .. }
        | MediaError::TransportTimeout { .. }
        | MediaError::Transport { .. }
        | MediaError::Jingle(_) => Reason::GeneralError,
    }
}
