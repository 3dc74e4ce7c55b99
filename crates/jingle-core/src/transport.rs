//! Jingle transport elements (XEP-0176 ICE-UDP, XEP-0177 raw-UDP)

use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

use crate::crypto::DtlsFingerprint;

/// XEP-0176 ICE-UDP transport namespace.
pub const NS_ICE_UDP: &str = "urn:xmpp:jingle:transports:ice-udp:1";
/// XEP-0177 raw-UDP transport namespace.
pub const NS_RAW_UDP: &str = "urn:xmpp:jingle:transports:raw-udp:1";

/// RTP component id within a candidate.
pub const COMPONENT_RTP: u16 = 1;
/// RTCP component id within a candidate.
pub const COMPONENT_RTCP: u16 = 2;

/// Transport method negotiated for a content.
///
/// Ordered by local preference: ICE-UDP is preferred over raw-UDP when the
/// remote namespace allows both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TransportType {
    IceUdp,
    RawUdp,
}

impl TransportType {
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::IceUdp => NS_ICE_UDP,
            Self::RawUdp => NS_RAW_UDP,
        }
    }

    /// Resolves a remote transport namespace to a supported method.
    pub fn from_namespace(ns: &str) -> Option<Self> {
        match ns {
            NS_ICE_UDP => Some(Self::IceUdp),
            NS_RAW_UDP => Some(Self::RawUdp),
            _ => None,
        }
    }
}

/// One `<candidate/>` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportCandidate {
    /// Candidate id, unique within the transport
    pub id: String,
    /// 1 for RTP, 2 for RTCP
    pub component: u16,
    pub ip: IpAddr,
    pub port: u16,
    /// ICE priority; raw-UDP candidates carry 0
    pub priority: u32,
    /// "host", "srflx", "relay"...; raw-UDP leaves this empty
    pub candidate_type: Option<String>,
    /// Foundation grouping value for ICE
    pub foundation: Option<String>,
}

impl TransportCandidate {
    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

/// A `<transport/>` element: ICE credentials plus candidates, or a bare
/// raw-UDP candidate list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportDescription {
    pub transport_type: TransportType,
    /// ICE username fragment; raw-UDP has none
    pub ufrag: Option<String>,
    /// ICE password; raw-UDP has none
    pub pwd: Option<String>,
    pub candidates: Vec<TransportCandidate>,
    /// DTLS-SRTP fingerprint (XEP-0320) when that family is selected
    pub fingerprint: Option<DtlsFingerprint>,
}

impl TransportDescription {
    pub fn new(transport_type: TransportType) -> Self {
        Self {
            transport_type,
            ufrag: None,
            pwd: None,
            candidates: Vec::new(),
            fingerprint: None,
        }
    }

    /// First local candidate for a component, the default target used to
    /// initiate a stream before ICE has concluded.
    pub fn first_candidate(&self, component: u16) -> Option<&TransportCandidate> {
        self.candidates.iter().find(|c| c.component == component)
    }

    /// Default RTP/RTCP target pair derived from the candidate list, RTCP
    /// falling back to RTP port + 1 when not advertised separately.
    pub fn default_target(&self) -> Option<(SocketAddr, SocketAddr)> {
        let rtp = self.first_candidate(COMPONENT_RTP)?;
        let rtcp = self
            .first_candidate(COMPONENT_RTCP)
            .map(TransportCandidate::address)
            .unwrap_or_else(|| SocketAddr::new(rtp.ip, rtp.port.saturating_add(1)));
        Some((rtp.address(), rtcp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(component: u16, port: u16) -> TransportCandidate {
        TransportCandidate {
            id: format!("cand-{component}"),
            component,
            ip: "192.0.2.1".parse().unwrap(),
            port,
            priority: 2130706431,
            candidate_type: Some("host".into()),
            foundation: Some("1".into()),
        }
    }

    #[test]
    fn default_target_uses_rtp_plus_one_without_rtcp_candidate() {
        let mut transport = TransportDescription::new(TransportType::IceUdp);
        transport.candidates.push(candidate(COMPONENT_RTP, 10000));

        let (rtp, rtcp) = transport.default_target().unwrap();
        assert_eq!(rtp.port(), 10000);
        assert_eq!(rtcp.port(), 10001);
    }

    #[test]
    fn default_target_prefers_explicit_rtcp_candidate() {
        let mut transport = TransportDescription::new(TransportType::IceUdp);
        transport.candidates.push(candidate(COMPONENT_RTP, 10000));
        transport.candidates.push(candidate(COMPONENT_RTCP, 10002));

        let (_, rtcp) = transport.default_target().unwrap();
        assert_eq!(rtcp.port(), 10002);
    }

    #[test]
    fn namespace_resolution_rejects_unknown() {
        assert_eq!(TransportType::from_namespace(NS_ICE_UDP), Some(TransportType::IceUdp));
        assert_eq!(TransportType::from_namespace(NS_RAW_UDP), Some(TransportType::RawUdp));
        assert_eq!(TransportType::from_namespace("urn:xmpp:jingle:transports:webrtc-datachannel:1"), None);
    }
}
