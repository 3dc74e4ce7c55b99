//! Call-peer lifecycle states

use serde::{Deserialize, Serialize};

/// Who put the call on hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldState {
    Local,
    Remote,
    Mutual,
}

/// Lifecycle state of one call peer.
///
/// `Disconnected` and `Failed` are terminal; once entered, every further
/// operation on the peer is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallPeerState {
    Idle,
    /// Outgoing session, offer being built or in flight
    Initiating,
    /// Incoming session-initiate received, not yet answered
    Incoming,
    /// The remote side signaled ringing
    Alerting,
    /// Answer accepted, media being established
    Connecting,
    Connected,
    OnHold(HoldState),
    Busy,
    Disconnected,
    Failed,
}

impl CallPeerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Disconnected | Self::Failed)
    }

    pub fn is_established(self) -> bool {
        matches!(self, Self::Connected | Self::OnHold(_))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Initiating => "initiating",
            Self::Incoming => "incoming",
            Self::Alerting => "alerting",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::OnHold(HoldState::Local) => "on-hold-local",
            Self::OnHold(HoldState::Remote) => "on-hold-remote",
            Self::OnHold(HoldState::Mutual) => "on-hold-mutual",
            Self::Busy => "busy",
            Self::Disconnected => "disconnected",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for CallPeerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Combines the two hold flags into the lifecycle state to show while the
/// call is established.
pub fn established_state(locally_on_hold: bool, remotely_on_hold: bool) -> CallPeerState {
    match (locally_on_hold, remotely_on_hold) {
        (true, true) => CallPeerState::OnHold(HoldState::Mutual),
        (true, false) => CallPeerState::OnHold(HoldState::Local),
        (false, true) => CallPeerState::OnHold(HoldState::Remote),
        (false, false) => CallPeerState::Connected,
    }
}
