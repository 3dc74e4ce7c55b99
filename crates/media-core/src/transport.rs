//! Transport collaborator contract
//!
//! ICE/raw-UDP candidate harvesting and connectivity checks are performed by
//! an external transport implementation. The engine drives it through this
//! contract and never observes candidates beyond the content lists it
//! returns. All waits inside the collaborator are bounded by its own policy;
//! the engine maps those expiries to [`MediaError::TransportTimeout`].

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use rjabber_jingle_core::{JingleContent, MediaType, TransportType};

use crate::error::MediaResult;

/// Local RTP/RTCP sockets resolved for one media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConnector {
    pub rtp: SocketAddr,
    pub rtcp: SocketAddr,
}

/// Remote RTP/RTCP addresses a stream should send to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaStreamTarget {
    pub rtp: SocketAddr,
    pub rtcp: SocketAddr,
}

/// Callback used to trickle freshly harvested local candidates to the peer
/// in transport-info messages while the harvest is still running.
#[async_trait]
pub trait TransportInfoSender: Send + Sync {
    async fn send_transport_info(&self, contents: Vec<JingleContent>);
}

/// One transport negotiation session (the lifetime of one Jingle session).
#[async_trait]
pub trait TransportSession: Send + Sync {
    fn transport_type(&self) -> TransportType;

    /// Starts gathering local candidates for the given local contents.
    /// `remote` is present when we are answering and carries the remote
    /// transport descriptions; `info_sender` receives trickled candidates.
    async fn start_candidate_harvest(
        &self,
        remote: Option<&[JingleContent]>,
        local: Vec<JingleContent>,
        info_sender: Option<Arc<dyn TransportInfoSender>>,
    ) -> MediaResult<()>;

    /// Blocks until the harvest concludes and returns the local contents
    /// with their transport descriptions filled in.
    async fn wrapup_candidate_harvest(&self) -> Vec<JingleContent>;

    /// Feeds remote candidates in and begins connectivity checks. Called
    /// for the initial offer and again for every transport-info.
    async fn start_connectivity_establishment(&self, remote: &[JingleContent]) -> MediaResult<()>;

    /// Waits (bounded by the collaborator's policy) until connectivity
    /// establishment has settled enough to resolve connectors and targets.
    async fn wrapup_connectivity_establishment(&self) -> MediaResult<()>;

    /// Local sockets for a media type, once connectivity has settled.
    fn stream_connector(&self, media_type: MediaType) -> Option<StreamConnector>;

    /// Remote target for a media type, once connectivity has settled.
    fn stream_target(&self, media_type: MediaType) -> Option<MediaStreamTarget>;

    /// Releases sockets and stops any ongoing checks.
    async fn close(&self);
}

/// Creates transport sessions for the transport type a remote offer selects
/// (or our preferred type when we are the offerer).
pub trait TransportFactory: Send + Sync {
    fn create(&self, transport_type: TransportType) -> Arc<dyn TransportSession>;
}
