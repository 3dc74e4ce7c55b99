//! Jingle protocol vocabulary for rjabber
//!
//! This crate contains the typed vocabulary of the Jingle signaling family
//! (XEP-0166 sessions, XEP-0167 RTP descriptions, XEP-0176/0177 ICE-UDP and
//! raw-UDP transports, XEP-0320 DTLS-SRTP fingerprints, XEP-0251 session
//! transfer) as plain Rust data. Serialization to and from stanza XML is the
//! responsibility of the embedding XMPP layer; everything here is the
//! in-memory form the negotiation engine and the call-peer state machine
//! operate on.

pub mod action;
pub mod content;
pub mod crypto;
pub mod error;
pub mod factory;
pub mod iq;
pub mod jid;
pub mod transport;

// Re-export the types used on almost every signature in the other crates.
pub use action::{JingleAction, Reason, SessionInfoType};
pub use content::{Creator, JingleContent, MediaType, PayloadType, RtpDescription, RtpHeaderExtension, Senders, SourceDescription};
pub use crypto::{DtlsFingerprint, DtlsSetup, EncryptionAdvertisement, SdesCrypto, ZrtpHash};
pub use error::{JingleError, JingleResult};
pub use iq::{JingleIq, SessionId, TerminateReason, TransferInfo};
pub use jid::Jid;
pub use transport::{TransportCandidate, TransportDescription, TransportType};
