//! Jingle action and reason vocabulary (XEP-0166 §7)

use serde::{Deserialize, Serialize};

use crate::error::{JingleError, JingleResult};

/// The `action` attribute of a Jingle IQ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JingleAction {
    ContentAccept,
    ContentAdd,
    ContentModify,
    ContentReject,
    ContentRemove,
    DescriptionInfo,
    SecurityInfo,
    SessionAccept,
    SessionInfo,
    SessionInitiate,
    SessionTerminate,
    TransportAccept,
    TransportInfo,
    TransportReject,
    TransportReplace,
    /// Jitsi-Meet extension advertising an additional conference source
    SourceAdd,
    /// Jitsi-Meet extension retracting a conference source
    SourceRemove,
}

impl JingleAction {
    /// The wire name of the action attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContentAccept => "content-accept",
            Self::ContentAdd => "content-add",
            Self::ContentModify => "content-modify",
            Self::ContentReject => "content-reject",
            Self::ContentRemove => "content-remove",
            Self::DescriptionInfo => "description-info",
            Self::SecurityInfo => "security-info",
            Self::SessionAccept => "session-accept",
            Self::SessionInfo => "session-info",
            Self::SessionInitiate => "session-initiate",
            Self::SessionTerminate => "session-terminate",
            Self::TransportAccept => "transport-accept",
            Self::TransportInfo => "transport-info",
            Self::TransportReject => "transport-reject",
            Self::TransportReplace => "transport-replace",
            Self::SourceAdd => "source-add",
            Self::SourceRemove => "source-remove",
        }
    }

    pub fn parse(value: &str) -> JingleResult<Self> {
        Ok(match value {
            "content-accept" => Self::ContentAccept,
            "content-add" => Self::ContentAdd,
            "content-modify" => Self::ContentModify,
            "content-reject" => Self::ContentReject,
            "content-remove" => Self::ContentRemove,
            "description-info" => Self::DescriptionInfo,
            "security-info" => Self::SecurityInfo,
            "session-accept" => Self::SessionAccept,
            "session-info" => Self::SessionInfo,
            "session-initiate" => Self::SessionInitiate,
            "session-terminate" => Self::SessionTerminate,
            "transport-accept" => Self::TransportAccept,
            "transport-info" => Self::TransportInfo,
            "transport-reject" => Self::TransportReject,
            "transport-replace" => Self::TransportReplace,
            "source-add" => Self::SourceAdd,
            "source-remove" => Self::SourceRemove,
            other => return Err(JingleError::invalid_value("action", other)),
        })
    }
}

impl std::fmt::Display for JingleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The machine-readable condition inside a `<reason/>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reason {
    AlternativeSession,
    Busy,
    Cancel,
    ConnectivityError,
    Decline,
    Expired,
    FailedApplication,
    FailedTransport,
    GeneralError,
    Gone,
    IncompatibleParameters,
    MediaError,
    SecurityError,
    Success,
    Timeout,
    UnsupportedApplications,
    UnsupportedTransports,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlternativeSession => "alternative-session",
            Self::Busy => "busy",
            Self::Cancel => "cancel",
            Self::ConnectivityError => "connectivity-error",
            Self::Decline => "decline",
            Self::Expired => "expired",
            Self::FailedApplication => "failed-application",
            Self::FailedTransport => "failed-transport",
            Self::GeneralError => "general-error",
            Self::Gone => "gone",
            Self::IncompatibleParameters => "incompatible-parameters",
            Self::MediaError => "media-error",
            Self::SecurityError => "security-error",
            Self::Success => "success",
            Self::Timeout => "timeout",
            Self::UnsupportedApplications => "unsupported-applications",
            Self::UnsupportedTransports => "unsupported-transports",
        }
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payload of a session-info action (XEP-0167 §8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionInfoType {
    /// Device is alerting the user
    Ringing,
    /// All content is placed on hold
    Hold,
    /// Hold has been released
    Unhold,
    /// Session is active again (treated like unhold)
    Active,
    /// Audio is temporarily muted (informational only)
    Mute,
    Unmute,
}

impl SessionInfoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ringing => "ringing",
            Self::Hold => "hold",
            Self::Unhold => "unhold",
            Self::Active => "active",
            Self::Mute => "mute",
            Self::Unmute => "unmute",
        }
    }
}

impl std::fmt::Display for SessionInfoType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
