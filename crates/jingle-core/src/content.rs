//! Jingle content model (XEP-0166 `<content/>`, XEP-0167 `<description/>`)
//!
//! A content element is one negotiated media line. Its name is stable across
//! renegotiation; the `senders` attribute may be absent on the wire (reading
//! as `both`) but the negotiation engine always writes an explicit value when
//! it renegotiates.

use serde::{Deserialize, Serialize};

use crate::crypto::EncryptionAdvertisement;
use crate::error::{JingleError, JingleResult};
use crate::transport::TransportDescription;

/// Media type of a content line.
///
/// The original audio/video field pairs are replaced by maps keyed on this
/// enum throughout the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    Audio,
    Video,
}

impl MediaType {
    /// Both media types, in the order offers enumerate them.
    pub const ALL: [MediaType; 2] = [MediaType::Audio, MediaType::Video];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }

    pub fn parse(value: &str) -> JingleResult<Self> {
        match value {
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            other => Err(JingleError::invalid_value("media", other)),
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which party originally proposed a content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Creator {
    Initiator,
    Responder,
}

/// The `senders` attribute: which party(ies) may transmit on a content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Senders {
    None,
    Initiator,
    Responder,
    Both,
}

/// One payload-type entry of an RTP description, ordered by preference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadType {
    /// RTP payload type number (static or dynamically assigned)
    pub id: u8,
    /// Encoding name, e.g. "opus", "PCMU", "VP8"
    pub name: String,
    /// Clock rate in Hz
    pub clockrate: u32,
    /// Channel count; only meaningful for audio
    pub channels: Option<u8>,
    /// Format parameters (fmtp-style name/value pairs)
    pub parameters: Vec<(String, String)>,
}

impl PayloadType {
    pub fn new(id: u8, name: impl Into<String>, clockrate: u32) -> Self {
        Self {
            id,
            name: name.into(),
            clockrate,
            channels: None,
            parameters: Vec::new(),
        }
    }

    pub fn with_channels(mut self, channels: u8) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    /// Two payload types describe the same codec when encoding name,
    /// clock rate and channel count agree. Payload type numbers are
    /// negotiated per-session and do not participate in matching.
    pub fn matches(&self, other: &PayloadType) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
            && self.clockrate == other.clockrate
            && self.channels.unwrap_or(1) == other.channels.unwrap_or(1)
    }
}

/// An RTP header extension advertisement (`<rtp-hdrext/>`, XEP-0294).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtpHeaderExtension {
    /// Negotiated extension id
    pub id: u16,
    /// Extension URI, the identity used for intersection
    pub uri: String,
    /// Direction restriction, if any
    pub senders: Option<Senders>,
}

impl RtpHeaderExtension {
    pub fn new(id: u16, uri: impl Into<String>) -> Self {
        Self { id, uri: uri.into(), senders: None }
    }
}

/// A `<source/>` advertisement (XEP-0339 / Jitsi-Meet source signaling).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescription {
    /// RTP synchronization source
    pub ssrc: u32,
    /// Owner address for conference source bookkeeping, if tagged
    pub owner: Option<String>,
    /// cname/msid style parameters
    pub parameters: Vec<(String, String)>,
}

/// The `<description/>` child of a content: one media line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtpDescription {
    pub media: MediaType,
    /// Payload types ordered by the sender's preference
    pub payload_types: Vec<PayloadType>,
    /// Advertised RTP header extensions
    pub header_extensions: Vec<RtpHeaderExtension>,
    /// Zero or one encryption advertisement (XEP-0167 schema allows one)
    pub encryption: Option<EncryptionAdvertisement>,
    /// Advertised sources (SSRC plus ownership tags)
    pub sources: Vec<SourceDescription>,
    /// Whether RTP and RTCP are multiplexed on one port
    pub rtcp_mux: bool,
}

impl RtpDescription {
    pub fn new(media: MediaType) -> Self {
        Self {
            media,
            payload_types: Vec::new(),
            header_extensions: Vec::new(),
            encryption: None,
            sources: Vec::new(),
            rtcp_mux: false,
        }
    }
}

/// One Jingle `<content/>` element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JingleContent {
    /// Stable identifier across renegotiation
    pub name: String,
    /// Who first proposed this content
    pub creator: Creator,
    /// Absent on the wire means `both`; use [`JingleContent::senders`]
    pub senders: Option<Senders>,
    /// The media description; absent for bare content-modify/remove stubs
    pub description: Option<RtpDescription>,
    /// The transport element; may be empty pending trickled candidates
    pub transport: Option<TransportDescription>,
}

impl JingleContent {
    pub fn new(name: impl Into<String>, creator: Creator) -> Self {
        Self {
            name: name.into(),
            creator,
            senders: None,
            description: None,
            transport: None,
        }
    }

    /// The effective senders value: an absent attribute reads as `both`.
    pub fn senders(&self) -> Senders {
        self.senders.unwrap_or(Senders::Both)
    }

    /// Media type carried by this content, derived from the description or,
    /// failing that, from the conventional content name.
    pub fn media_type(&self) -> Option<MediaType> {
        if let Some(desc) = &self.description {
            return Some(desc.media);
        }
        MediaType::parse(&self.name).ok()
    }

    pub fn description(&self) -> JingleResult<&RtpDescription> {
        self.description
            .as_ref()
            .ok_or_else(|| JingleError::missing_element("description"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_senders_reads_as_both() {
        let content = JingleContent::new("audio", Creator::Initiator);
        assert_eq!(content.senders(), Senders::Both);
    }

    #[test]
    fn media_type_falls_back_to_content_name() {
        let content = JingleContent::new("video", Creator::Responder);
        assert_eq!(content.media_type(), Some(MediaType::Video));

        let mut content = JingleContent::new("stream0", Creator::Initiator);
        assert_eq!(content.media_type(), None);
        content.description = Some(RtpDescription::new(MediaType::Audio));
        assert_eq!(content.media_type(), Some(MediaType::Audio));
    }

    #[test]
    fn payload_matching_ignores_id_and_case() {
        let a = PayloadType::new(96, "opus", 48000).with_channels(2);
        let b = PayloadType::new(111, "OPUS", 48000).with_channels(2);
        assert!(a.matches(&b));

        let c = PayloadType::new(96, "opus", 24000).with_channels(2);
        assert!(!a.matches(&c));
    }
}
