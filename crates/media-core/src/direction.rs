//! Media direction algebra
//!
//! Directions are treated as a pair of send/receive capabilities. `and` is
//! the intersection used to combine device capability with user preference,
//! `or` the union used when a conference focus must keep forwarding media for
//! other peers. Conversion to and from the Jingle `senders` attribute is
//! perspective-dependent: `senders=initiator` means send-only for the
//! initiator and recv-only for the responder.

use rjabber_jingle_core::Senders;
use serde::{Deserialize, Serialize};

/// Direction of a media stream from the local point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaDirection {
    Inactive,
    SendOnly,
    RecvOnly,
    SendRecv,
}

impl MediaDirection {
    fn from_flags(send: bool, recv: bool) -> Self {
        match (send, recv) {
            (true, true) => Self::SendRecv,
            (true, false) => Self::SendOnly,
            (false, true) => Self::RecvOnly,
            (false, false) => Self::Inactive,
        }
    }

    pub fn allows_sending(self) -> bool {
        matches!(self, Self::SendOnly | Self::SendRecv)
    }

    pub fn allows_receiving(self) -> bool {
        matches!(self, Self::RecvOnly | Self::SendRecv)
    }

    /// Intersection of two capability sets.
    pub fn and(self, other: Self) -> Self {
        Self::from_flags(
            self.allows_sending() && other.allows_sending(),
            self.allows_receiving() && other.allows_receiving(),
        )
    }

    /// Union of two capability sets.
    pub fn or(self, other: Self) -> Self {
        Self::from_flags(
            self.allows_sending() || other.allows_sending(),
            self.allows_receiving() || other.allows_receiving(),
        )
    }

    /// The same stream seen from the other endpoint.
    pub fn reverse(self) -> Self {
        match self {
            Self::SendOnly => Self::RecvOnly,
            Self::RecvOnly => Self::SendOnly,
            other => other,
        }
    }

    /// The direction we should answer with, given our capability (`self`)
    /// and the direction the offerer requested. Our sending leg can only be
    /// active if the offerer is willing to receive, and vice versa.
    pub fn direction_for_answer(self, remote_requested: Self) -> Self {
        self.and(remote_requested.reverse())
    }
}

/// Converts a local direction into the `senders` value to write on a
/// content. `local_is_initiator` tells which role "we" are in the session.
pub fn senders_for_direction(direction: MediaDirection, local_is_initiator: bool) -> Senders {
    match direction {
        MediaDirection::SendRecv => Senders::Both,
        MediaDirection::Inactive => Senders::None,
        MediaDirection::SendOnly => {
            if local_is_initiator {
                Senders::Initiator
            } else {
                Senders::Responder
            }
        }
        MediaDirection::RecvOnly => {
            if local_is_initiator {
                Senders::Responder
            } else {
                Senders::Initiator
            }
        }
    }
}

/// Reads a `senders` attribute as a local direction. An absent attribute
/// defaults to `both` per XEP-0166.
pub fn direction_from_senders(senders: Option<Senders>, local_is_initiator: bool) -> MediaDirection {
    match senders.unwrap_or(Senders::Both) {
        Senders::Both => MediaDirection::SendRecv,
        Senders::None => MediaDirection::Inactive,
        Senders::Initiator => {
            if local_is_initiator {
                MediaDirection::SendOnly
            } else {
                MediaDirection::RecvOnly
            }
        }
        Senders::Responder => {
            if local_is_initiator {
                MediaDirection::RecvOnly
            } else {
                MediaDirection::SendOnly
            }
        }
    }
}
