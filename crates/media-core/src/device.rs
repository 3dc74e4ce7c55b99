//! Media device collaborator contract
//!
//! Capture/playback and RTP I/O live outside this workspace. The negotiation
//! engine only needs to know what a device can do and to hand a fully
//! negotiated stream configuration back for initialization.

use std::sync::Arc;

use async_trait::async_trait;
use rjabber_jingle_core::{MediaType, PayloadType, RtpHeaderExtension};

use crate::direction::MediaDirection;
use crate::error::MediaResult;
use crate::transport::{MediaStreamTarget, StreamConnector};

/// A capture/playback device as seen by the negotiator.
#[derive(Debug, Clone)]
pub struct MediaDevice {
    pub media_type: MediaType,
    /// What the hardware can do, before user preferences apply
    pub direction: MediaDirection,
    pub name: String,
}

/// Everything needed to bring one negotiated media stream up.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Content name the stream belongs to
    pub content_name: String,
    pub media_type: MediaType,
    /// Local sockets resolved by the transport collaborator
    pub connector: StreamConnector,
    /// Remote RTP/RTCP addresses
    pub target: MediaStreamTarget,
    /// The single format the stream starts with
    pub format: PayloadType,
    pub direction: MediaDirection,
    pub extensions: Vec<RtpHeaderExtension>,
    /// The master stream drives RTP/RTCP synchronization when several
    /// streams are multiplexed; audio is always master next to video.
    pub master_stream: bool,
}

/// Handle to a running media stream, owned by the negotiator.
pub trait MediaStreamHandle: Send + Sync {
    fn direction(&self) -> MediaDirection;

    /// Adjusts the live direction, e.g. when going on and off hold.
    fn set_direction(&self, direction: MediaDirection);

    /// Local synchronization source, once the stream has one.
    fn local_ssrc(&self) -> Option<u32>;

    fn close(&self);
}

/// The device half of the media collaborator.
#[async_trait]
pub trait MediaDeviceSource: Send + Sync {
    /// The device that would serve a media type, if any is present.
    fn default_device(&self, media_type: MediaType) -> Option<MediaDevice>;

    /// Whether the device is usable right now (present and not busy).
    fn is_device_active(&self, device: &MediaDevice) -> bool;

    /// Formats the device supports, ordered by local preference.
    fn supported_formats(&self, device: &MediaDevice) -> Vec<PayloadType>;

    /// RTP header extensions the device supports.
    fn supported_extensions(&self, device: &MediaDevice) -> Vec<RtpHeaderExtension>;

    /// Creates and starts a stream for a negotiated configuration.
    async fn init_stream(&self, config: StreamConfig) -> MediaResult<Arc<dyn MediaStreamHandle>>;
}
