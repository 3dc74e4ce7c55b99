//! Error taxonomy for media negotiation
//!
//! Collaborator failures are always wrapped into one of these variants so
//! callers can tell "remote incompatible" from "local device unavailable"
//! from "timeout" without string matching.

use rjabber_jingle_core::{JingleError, MediaType};
use thiserror::Error;

/// Result type for media negotiation operations
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while negotiating media
#[derive(Debug, Clone, Error)]
pub enum MediaError {
    /// No capture or playback device can produce any offerable content
    #[error("No active media device to offer")]
    NoActiveDevice,

    /// The remote offer/answer shares no usable format with us
    #[error("No mutually supported formats: {details}")]
    NoMatchingFormats { details: String },

    /// An action arrived in a state where it cannot apply
    #[error("Protocol sequence error: {message}")]
    ProtocolSequence { message: String },

    /// A bounded wait on the transport collaborator expired
    #[error("Timed out after {seconds}s waiting for {operation}")]
    TransportTimeout { operation: String, seconds: u64 },

    /// The selected encryption protocol could not be established
    #[error("Security negotiation failed: {message}")]
    SecurityNegotiation { message: String },

    /// A local device exists but cannot be opened or initialized
    #[error("Media device unavailable for {media}")]
    DeviceUnavailable { media: MediaType },

    /// Wrapped failure from the transport collaborator
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// A remote content element was structurally unusable (e.g. a missing
    /// description on a content that needs one)
    #[error(transparent)]
    Jingle(#[from] JingleError),
}

impl MediaError {
    pub fn no_matching_formats(details: impl Into<String>) -> Self {
        Self::NoMatchingFormats { details: details.into() }
    }

    pub fn protocol_sequence(message: impl Into<String>) -> Self {
        Self::ProtocolSequence { message: message.into() }
    }

    pub fn transport_timeout(operation: impl Into<String>, seconds: u64) -> Self {
        Self::TransportTimeout { operation: operation.into(), seconds }
    }

    pub fn security(message: impl Into<String>) -> Self {
        Self::SecurityNegotiation { message: message.into() }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport { message: message.into() }
    }
}
