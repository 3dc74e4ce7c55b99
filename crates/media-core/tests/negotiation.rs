//! Offer/answer engine tests against mock device and transport collaborators.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rjabber_jingle_core::{
    Creator, EncryptionAdvertisement, JingleContent, MediaType, PayloadType, RtpDescription,
    RtpHeaderExtension, Senders, TransportCandidate, TransportDescription, TransportType,
};
use rjabber_media_core::device::MediaDevice;
use rjabber_media_core::encryption::EncryptionConfig;
use rjabber_media_core::negotiator::{MediaNegotiator, NegotiatorConfig};
use rjabber_media_core::{
    MediaDeviceSource, MediaDirection, MediaError, MediaResult, MediaStreamHandle,
    MediaStreamTarget, StreamConfig, StreamConnector, TransportFactory, TransportInfoSender,
    TransportSession,
};

struct MockStream {
    direction: Mutex<MediaDirection>,
    ssrc: u32,
    closed: AtomicBool,
}

impl MediaStreamHandle for MockStream {
    fn direction(&self) -> MediaDirection {
        *self.direction.lock().unwrap()
    }

    fn set_direction(&self, direction: MediaDirection) {
        *self.direction.lock().unwrap() = direction;
    }

    fn local_ssrc(&self) -> Option<u32> {
        Some(self.ssrc)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct MockDevices {
    audio: bool,
    video: bool,
    audio_direction: Option<MediaDirection>,
    init_configs: Mutex<Vec<StreamConfig>>,
    streams: Mutex<HashMap<MediaType, Arc<MockStream>>>,
}

impl MockDevices {
    fn audio_only() -> Self {
        Self { audio: true, ..Self::default() }
    }

    fn audio_video() -> Self {
        Self { audio: true, video: true, ..Self::default() }
    }

    fn stream(&self, media_type: MediaType) -> Arc<MockStream> {
        self.streams.lock().unwrap().get(&media_type).unwrap().clone()
    }
}

#[async_trait]
impl MediaDeviceSource for MockDevices {
    fn default_device(&self, media_type: MediaType) -> Option<MediaDevice> {
        let present = match media_type {
            MediaType::Audio => self.audio,
            MediaType::Video => self.video,
        };
        present.then(|| MediaDevice {
            media_type,
            direction: match media_type {
                MediaType::Audio => self.audio_direction.unwrap_or(MediaDirection::SendRecv),
                MediaType::Video => MediaDirection::SendRecv,
            },
            name: format!("mock-{media_type}"),
        })
    }

    fn is_device_active(&self, _device: &MediaDevice) -> bool {
        true
    }

    fn supported_formats(&self, device: &MediaDevice) -> Vec<PayloadType> {
        match device.media_type {
            MediaType::Audio => vec![
                PayloadType::new(111, "opus", 48000).with_channels(2),
                PayloadType::new(0, "PCMU", 8000),
            ],
            MediaType::Video => vec![PayloadType::new(96, "VP8", 90000)],
        }
    }

    fn supported_extensions(&self, device: &MediaDevice) -> Vec<RtpHeaderExtension> {
        match device.media_type {
            MediaType::Audio => {
                vec![RtpHeaderExtension::new(1, "urn:ietf:params:rtp-hdrext:ssrc-audio-level")]
            }
            MediaType::Video => Vec::new(),
        }
    }

    async fn init_stream(&self, config: StreamConfig) -> MediaResult<Arc<dyn MediaStreamHandle>> {
        let stream = Arc::new(MockStream {
            direction: Mutex::new(config.direction),
            ssrc: match config.media_type {
                MediaType::Audio => 0xA0A0,
                MediaType::Video => 0xB1B1,
            },
            closed: AtomicBool::new(false),
        });
        self.streams.lock().unwrap().insert(config.media_type, stream.clone());
        self.init_configs.lock().unwrap().push(config);
        Ok(stream)
    }
}

struct MockTransport {
    harvested: Mutex<Vec<JingleContent>>,
    targets_after_wrapup_only: bool,
    wrapped: AtomicBool,
    connectivity_starts: AtomicUsize,
    connectivity_wrapups: AtomicUsize,
    closed: AtomicBool,
}

impl MockTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            harvested: Mutex::new(Vec::new()),
            targets_after_wrapup_only: false,
            wrapped: AtomicBool::new(false),
            connectivity_starts: AtomicUsize::new(0),
            connectivity_wrapups: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        })
    }

    fn delayed_targets() -> Arc<Self> {
        Arc::new(Self {
            harvested: Mutex::new(Vec::new()),
            targets_after_wrapup_only: true,
            wrapped: AtomicBool::new(false),
            connectivity_starts: AtomicUsize::new(0),
            connectivity_wrapups: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        })
    }

    fn targets_ready(&self) -> bool {
        !self.targets_after_wrapup_only || self.wrapped.load(Ordering::SeqCst)
    }

    fn port_base(media_type: MediaType) -> u16 {
        match media_type {
            MediaType::Audio => 10000,
            MediaType::Video => 10010,
        }
    }
}

#[async_trait]
impl TransportSession for MockTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::IceUdp
    }

    async fn start_candidate_harvest(
        &self,
        _remote: Option<&[JingleContent]>,
        local: Vec<JingleContent>,
        _info_sender: Option<Arc<dyn TransportInfoSender>>,
    ) -> MediaResult<()> {
        *self.harvested.lock().unwrap() = local;
        Ok(())
    }

    async fn wrapup_candidate_harvest(&self) -> Vec<JingleContent> {
        let mut contents = self.harvested.lock().unwrap().clone();
        for content in &mut contents {
            let media_type = content.media_type().unwrap();
            let transport = content
                .transport
                .get_or_insert_with(|| TransportDescription::new(TransportType::IceUdp));
            transport.ufrag = Some("ufrag".into());
            transport.pwd = Some("pwd".into());
            transport.candidates.push(TransportCandidate {
                id: format!("cand-{media_type}"),
                component: 1,
                ip: "192.0.2.10".parse().unwrap(),
                port: Self::port_base(media_type),
                priority: 2130706431,
                candidate_type: Some("host".into()),
                foundation: Some("1".into()),
            });
        }
        contents
    }

    async fn start_connectivity_establishment(&self, _remote: &[JingleContent]) -> MediaResult<()> {
        self.connectivity_starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn wrapup_connectivity_establishment(&self) -> MediaResult<()> {
        self.connectivity_wrapups.fetch_add(1, Ordering::SeqCst);
        self.wrapped.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stream_connector(&self, media_type: MediaType) -> Option<StreamConnector> {
        self.targets_ready().then(|| {
            let base = Self::port_base(media_type);
            StreamConnector {
                rtp: local_addr(base),
                rtcp: local_addr(base + 1),
            }
        })
    }

    fn stream_target(&self, media_type: MediaType) -> Option<MediaStreamTarget> {
        self.targets_ready().then(|| {
            let base = Self::port_base(media_type) + 100;
            MediaStreamTarget {
                rtp: remote_addr(base),
                rtcp: remote_addr(base + 1),
            }
        })
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

fn local_addr(port: u16) -> SocketAddr {
    format!("192.0.2.10:{port}").parse().unwrap()
}

fn remote_addr(port: u16) -> SocketAddr {
    format!("198.51.100.7:{port}").parse().unwrap()
}

struct MockFactory(Arc<MockTransport>);

impl TransportFactory for MockFactory {
    fn create(&self, _transport_type: TransportType) -> Arc<dyn TransportSession> {
        self.0.clone()
    }
}

fn negotiator(
    config: NegotiatorConfig,
    devices: Arc<MockDevices>,
    transport: Arc<MockTransport>,
) -> MediaNegotiator {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    MediaNegotiator::new(
        config,
        devices,
        Arc::new(MockFactory(transport)),
        Arc::new(EncryptionConfig::default()),
    )
}

/// A remote audio+video offer the way a remote initiator would send it.
fn remote_offer() -> Vec<JingleContent> {
    let mut audio = JingleContent::new("audio", Creator::Initiator);
    let mut audio_desc = RtpDescription::new(MediaType::Audio);
    audio_desc.payload_types = vec![
        PayloadType::new(0, "PCMU", 8000),
        PayloadType::new(96, "opus", 48000).with_channels(2),
    ];
    audio_desc.header_extensions =
        vec![RtpHeaderExtension::new(2, "urn:ietf:params:rtp-hdrext:ssrc-audio-level")];
    audio_desc.rtcp_mux = true;
    audio.description = Some(audio_desc);
    let mut audio_transport = TransportDescription::new(TransportType::IceUdp);
    audio_transport.candidates.push(TransportCandidate {
        id: "r1".into(),
        component: 1,
        ip: "198.51.100.7".parse().unwrap(),
        port: 20000,
        priority: 1,
        candidate_type: Some("host".into()),
        foundation: Some("1".into()),
    });
    audio.transport = Some(audio_transport);

    let mut video = JingleContent::new("video", Creator::Initiator);
    let mut video_desc = RtpDescription::new(MediaType::Video);
    video_desc.payload_types = vec![PayloadType::new(100, "VP8", 90000)];
    video_desc.rtcp_mux = true;
    video.description = Some(video_desc);
    video.transport = Some(TransportDescription::new(TransportType::IceUdp));

    vec![audio, video]
}

#[tokio::test]
async fn initial_offer_covers_active_devices() {
    let devices = Arc::new(MockDevices::audio_only());
    let mut engine = negotiator(NegotiatorConfig::default(), devices, MockTransport::new());

    let offer = engine.create_content_list(None).await.unwrap();
    assert_eq!(offer.len(), 1);
    let audio = &offer[0];
    assert_eq!(audio.name, "audio");
    assert_eq!(audio.senders(), Senders::Both);

    let description = audio.description.as_ref().unwrap();
    assert_eq!(description.payload_types.len(), 2);
    // Default protocol order reaches SDES first without a DTLS identity.
    assert!(matches!(description.encryption, Some(EncryptionAdvertisement::Sdes(_))));
    // The harvest filled the transport in.
    assert!(!audio.transport.as_ref().unwrap().candidates.is_empty());
}

#[tokio::test]
async fn offer_without_devices_fails() {
    let devices = Arc::new(MockDevices::default());
    let mut engine = negotiator(NegotiatorConfig::default(), devices, MockTransport::new());

    let result = engine.create_content_list(None).await;
    assert!(matches!(result, Err(MediaError::NoActiveDevice)));
}

#[tokio::test]
async fn receive_only_capability_is_not_offered() {
    // A capture-less device could only produce a recvonly offer, which the
    // answer cannot honor; the content is dropped instead.
    let devices = Arc::new(MockDevices {
        audio: true,
        audio_direction: Some(MediaDirection::RecvOnly),
        ..MockDevices::default()
    });
    let mut engine = negotiator(NegotiatorConfig::default(), devices, MockTransport::new());

    let result = engine.create_content_list(None).await;
    assert!(matches!(result, Err(MediaError::NoActiveDevice)));
}

#[tokio::test]
async fn answer_preserves_remote_format_order_and_numbering() {
    let devices = Arc::new(MockDevices::audio_only());
    let config = NegotiatorConfig { local_is_initiator: false, ..NegotiatorConfig::default() };
    let mut engine = negotiator(config, devices, MockTransport::new());

    let processed = engine.process_offer(&remote_offer(), None).await.unwrap();
    assert_eq!(processed.transport_type, TransportType::IceUdp);
    // Video has no local device: only the audio answer survives.
    assert_eq!(processed.answer_contents.len(), 1);

    let audio = &processed.answer_contents[0];
    let formats = &audio.description.as_ref().unwrap().payload_types;
    let names: Vec<&str> = formats.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["PCMU", "opus"]);
    // The offerer's payload numbering is echoed back.
    assert_eq!(formats[1].id, 96);

    let extensions = &audio.description.as_ref().unwrap().header_extensions;
    assert_eq!(extensions.len(), 1);
    assert_eq!(extensions[0].id, 2);
}

#[tokio::test]
async fn offer_with_no_common_formats_is_rejected() {
    let devices = Arc::new(MockDevices::audio_only());
    let config = NegotiatorConfig { local_is_initiator: false, ..NegotiatorConfig::default() };
    let mut engine = negotiator(config, devices, MockTransport::new());

    let mut offer = remote_offer();
    offer.truncate(1);
    offer[0].description.as_mut().unwrap().payload_types =
        vec![PayloadType::new(18, "G729", 8000)];

    let result = engine.process_offer(&offer, None).await;
    assert!(matches!(result, Err(MediaError::NoMatchingFormats { .. })));
}

#[tokio::test]
async fn callee_establishes_audio_video_call() {
    let devices = Arc::new(MockDevices::audio_video());
    let transport = MockTransport::new();
    let config = NegotiatorConfig { local_is_initiator: false, ..NegotiatorConfig::default() };
    let mut engine = negotiator(config, devices.clone(), transport.clone());

    let processed = engine.process_offer(&remote_offer(), None).await.unwrap();
    assert_eq!(processed.answer_contents.len(), 2);
    // Connectivity starts before the accept goes out.
    assert_eq!(transport.connectivity_starts.load(Ordering::SeqCst), 1);

    let accept = engine.generate_session_accept().await.unwrap();
    assert_eq!(accept.len(), 2);

    // Sending contents advertise the local SSRC.
    let audio = accept.iter().find(|c| c.name == "audio").unwrap();
    let sources = &audio.description.as_ref().unwrap().sources;
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].ssrc, 0xA0A0);

    // Audio is the master stream when multiplexed with video.
    let configs = devices.init_configs.lock().unwrap();
    let audio_config = configs.iter().find(|c| c.media_type == MediaType::Audio).unwrap();
    let video_config = configs.iter().find(|c| c.media_type == MediaType::Video).unwrap();
    assert!(audio_config.master_stream);
    assert!(!video_config.master_stream);
    assert_eq!(audio_config.target.rtp, remote_addr(10100));
}

#[tokio::test]
async fn answer_with_unresolved_target_closes_content() {
    let devices = Arc::new(MockDevices::audio_only());
    let transport = MockTransport::delayed_targets();
    let mut engine = negotiator(NegotiatorConfig::default(), devices, transport.clone());

    let offer = engine.create_content_list(None).await.unwrap();
    let mut answer = offer.clone();
    for content in &mut answer {
        content.senders = Some(Senders::Both);
    }

    // Connectivity has not wrapped up yet, so the transport carries no
    // target; the content is closed, not failed.
    let session: Arc<dyn TransportSession> = transport.clone();
    engine.process_answer(&session, &answer).await.unwrap();
    assert!(engine.stream(MediaType::Audio).is_none());

    // After the caller's wrap-up the same answer initializes the stream.
    session.wrapup_connectivity_establishment().await.unwrap();
    engine.process_answer(&session, &answer).await.unwrap();
    assert!(engine.stream(MediaType::Audio).is_some());
}

#[tokio::test]
async fn stream_format_keeps_the_matched_remote_numbering() {
    let devices = Arc::new(MockDevices::audio_only());
    let transport = MockTransport::new();
    let mut engine = negotiator(NegotiatorConfig::default(), devices.clone(), transport.clone());

    let offer = engine.create_content_list(None).await.unwrap();
    let mut answer = offer.clone();
    for content in &mut answer {
        content.senders = Some(Senders::Both);
    }
    // The answer lists an unsupported format first; the stream must adopt
    // the numbering of the entry that matched, not the list head's.
    answer[0].description.as_mut().unwrap().payload_types = vec![
        PayloadType::new(18, "G729", 8000),
        PayloadType::new(0, "PCMU", 8000),
    ];

    let session: Arc<dyn TransportSession> = transport.clone();
    engine.process_answer(&session, &answer).await.unwrap();

    let configs = devices.init_configs.lock().unwrap();
    let config = configs.last().unwrap();
    assert_eq!(config.format.name, "PCMU");
    assert_eq!(config.format.id, 0);
}

#[tokio::test]
async fn answer_omitting_an_offered_content_closes_it() {
    let devices = Arc::new(MockDevices::audio_video());
    let transport = MockTransport::new();
    let mut engine = negotiator(NegotiatorConfig::default(), devices, transport.clone());

    let offer = engine.create_content_list(None).await.unwrap();
    assert_eq!(offer.len(), 2);
    // The peer declines video by omitting it from the session-accept.
    let mut answer: Vec<JingleContent> =
        offer.iter().filter(|c| c.name == "audio").cloned().collect();
    for content in &mut answer {
        content.senders = Some(Senders::Both);
    }

    let session: Arc<dyn TransportSession> = transport.clone();
    engine.process_answer(&session, &answer).await.unwrap();

    assert!(!engine.local_contents().contains_key("video"));
    assert!(engine.stream(MediaType::Video).is_none());
    assert!(engine.stream(MediaType::Audio).is_some());
}

#[tokio::test]
async fn offer_content_without_description_is_rejected() {
    let devices = Arc::new(MockDevices::audio_only());
    let config = NegotiatorConfig { local_is_initiator: false, ..NegotiatorConfig::default() };
    let mut engine = negotiator(config, devices, MockTransport::new());

    let mut offer = remote_offer();
    offer.truncate(1);
    offer[0].description = None;

    let result = engine.process_offer(&offer, None).await;
    assert!(matches!(result, Err(MediaError::Jingle(_))));
}

#[tokio::test]
async fn remove_content_closes_its_stream() {
    let devices = Arc::new(MockDevices::audio_video());
    let config = NegotiatorConfig { local_is_initiator: false, ..NegotiatorConfig::default() };
    let mut engine = negotiator(config, devices.clone(), MockTransport::new());

    engine.process_offer(&remote_offer(), None).await.unwrap();
    engine.generate_session_accept().await.unwrap();
    assert!(engine.stream(MediaType::Video).is_some());

    engine.remove_content("video");
    assert!(engine.stream(MediaType::Video).is_none());
    assert!(devices.stream(MediaType::Video).closed.load(Ordering::SeqCst));
    assert!(!engine.local_contents().contains_key("video"));
    assert!(!engine.remote_contents().contains_key("video"));
}

#[tokio::test]
async fn hold_constrains_stream_directions() {
    let devices = Arc::new(MockDevices::audio_only());
    let config = NegotiatorConfig { local_is_initiator: false, ..NegotiatorConfig::default() };
    let mut engine = negotiator(config, devices.clone(), MockTransport::new());

    let mut offer = remote_offer();
    offer.truncate(1);
    engine.process_offer(&offer, None).await.unwrap();
    engine.generate_session_accept().await.unwrap();

    let stream = devices.stream(MediaType::Audio);
    assert_eq!(stream.direction(), MediaDirection::SendRecv);

    engine.set_locally_on_hold(true);
    assert_eq!(stream.direction(), MediaDirection::SendOnly);

    engine.set_remotely_on_hold(true);
    assert_eq!(stream.direction(), MediaDirection::Inactive);

    engine.set_locally_on_hold(false);
    engine.set_remotely_on_hold(false);
    assert_eq!(stream.direction(), MediaDirection::SendRecv);
}

#[tokio::test]
async fn close_releases_streams_and_transport() {
    let devices = Arc::new(MockDevices::audio_only());
    let transport = MockTransport::new();
    let config = NegotiatorConfig { local_is_initiator: false, ..NegotiatorConfig::default() };
    let mut engine = negotiator(config, devices.clone(), transport.clone());

    let mut offer = remote_offer();
    offer.truncate(1);
    engine.process_offer(&offer, None).await.unwrap();
    engine.generate_session_accept().await.unwrap();

    engine.close().await;
    assert!(devices.stream(MediaType::Audio).closed.load(Ordering::SeqCst));
    assert!(transport.closed.load(Ordering::SeqCst));
    assert!(engine.encryption().controls().active(MediaType::Audio).is_none());
    assert!(engine
        .encryption()
        .controls()
        .retired()
        .iter()
        .all(|c| c.cleanup_invocations() == 1));
}

#[tokio::test]
async fn close_runs_on_a_spawned_task() {
    let devices = Arc::new(MockDevices::audio_only());
    let transport = MockTransport::new();
    let config = NegotiatorConfig { local_is_initiator: false, ..NegotiatorConfig::default() };
    let mut engine = negotiator(config, devices, transport.clone());

    let mut offer = remote_offer();
    offer.truncate(1);
    engine.process_offer(&offer, None).await.unwrap();

    // Teardown happens from dispatch tasks, so the future must move there.
    tokio::spawn(async move { engine.close().await }).await.unwrap();
    assert!(transport.closed.load(Ordering::SeqCst));
}
