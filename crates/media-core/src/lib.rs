//! Media negotiation engine for rjabber
//!
//! Implements the offer/answer half of a Jingle call: building local content
//! offers from device capabilities, reconciling remote offers and answers
//! against local support (codecs, RTP header extensions, transports,
//! encryption), and driving the transport collaborator's candidate harvest
//! and connectivity establishment. The call-peer state machine in
//! `rjabber-session-core` owns one [`MediaNegotiator`] per session and is the
//! only writer of its content maps.
//!
//! ICE itself, media capture and RTP I/O are external; this crate consumes
//! their contracts ([`transport::TransportSession`],
//! [`device::MediaDeviceSource`]) and never their implementations.

pub mod device;
pub mod direction;
pub mod encryption;
pub mod error;
pub mod format;
pub mod negotiator;
pub mod transport;

pub use device::{MediaDevice, MediaDeviceSource, MediaStreamHandle, StreamConfig};
pub use direction::MediaDirection;
pub use encryption::{EncryptionConfig, EncryptionSelector, SrtpControl, SrtpControlType, SrtpControls};
pub use error::{MediaError, MediaResult};
pub use negotiator::{wait_for_transport, MediaNegotiator, NegotiatorConfig, ProcessedOffer, TransportSlot};
pub use transport::{MediaStreamTarget, StreamConnector, TransportFactory, TransportInfoSender, TransportSession};
