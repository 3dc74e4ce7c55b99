//! Jingle call-peer state machine for rjabber
//!
//! Sits on top of `rjabber-media-core`: one [`CallPeerSession`] per call
//! peer drives the Jingle action vocabulary (initiate/accept/info/terminate,
//! the content-* renegotiation family, transport-info, XEP-0251 transfer)
//! against the media negotiation engine, while [`SsrcTracker`] and
//! [`RoomMembership`] cover the conference-side bookkeeping. The XMPP wire
//! itself stays behind the [`StanzaSender`] seam.

pub mod conference;
pub mod config;
pub mod error;
pub mod peer;
pub mod room;
pub mod signaling;

pub use conference::{ConferenceMember, SsrcTracker};
pub use config::AccountConfig;
pub use error::{reason_for_media_error, SessionError, SessionResult};
pub use peer::{CallPeerSession, CallPeerState, HoldState};
pub use room::{Affiliation, MemberRole, RoomEvent, RoomMember, RoomMembership};
pub use signaling::StanzaSender;
