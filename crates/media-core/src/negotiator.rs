//! Offer/answer negotiation engine
//!
//! One [`MediaNegotiator`] lives per call peer and owns the local and remote
//! content maps, the stream handles and the transport session slot. All of
//! its methods take `&mut self`; the call-peer session serializes access
//! under its own negotiation lock, so the engine itself holds no locks and
//! never blocks a caller on anything but the bounded transport waits.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use rjabber_jingle_core::{
    Creator, JingleContent, MediaType, RtpDescription, Senders, SourceDescription, TransportType,
};
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::device::{MediaDeviceSource, MediaStreamHandle, StreamConfig};
use crate::direction::{direction_from_senders, senders_for_direction, MediaDirection};
use crate::encryption::{EncryptionConfig, EncryptionSelector};
use crate::error::{MediaError, MediaResult};
use crate::format::{find_matching_format, intersect_extensions, intersect_formats};
use crate::transport::{TransportFactory, TransportInfoSender, TransportSession};

/// Per-session negotiation settings, fixed at session creation.
#[derive(Debug, Clone)]
pub struct NegotiatorConfig {
    /// Which role we play in the Jingle session
    pub local_is_initiator: bool,
    /// When we act as a conference focus we must keep a send-capable leg
    /// for RTP translation even without local capture
    pub conference_focus: bool,
    /// A media-relay focus bridge carries the session; client-to-client
    /// crypto is not advertised
    pub relay_focus: bool,
    pub rtcp_mux: bool,
    /// Bound on waiting for the transport session to be assigned
    pub transport_wait_secs: u64,
    /// Transport method offered when we initiate
    pub preferred_transport: TransportType,
    /// User preference per media type, intersected with device capability
    pub audio_direction: MediaDirection,
    pub video_direction: MediaDirection,
}

impl Default for NegotiatorConfig {
    fn default() -> Self {
        Self {
            local_is_initiator: true,
            conference_focus: false,
            relay_focus: false,
            rtcp_mux: true,
            transport_wait_secs: 5,
            preferred_transport: TransportType::IceUdp,
            audio_direction: MediaDirection::SendRecv,
            video_direction: MediaDirection::SendRecv,
        }
    }
}

impl NegotiatorConfig {
    fn user_direction(&self, media_type: MediaType) -> MediaDirection {
        match media_type {
            MediaType::Audio => self.audio_direction,
            MediaType::Video => self.video_direction,
        }
    }
}

/// Result of reconciling a remote offer against local capabilities.
#[derive(Debug)]
pub struct ProcessedOffer {
    /// Answer contents, transport descriptions still pending the harvest
    pub answer_contents: Vec<JingleContent>,
    /// Transport method resolved from the remote namespaces
    pub transport_type: TransportType,
}

/// The transport session slot shared through a watch channel.
pub type TransportSlot = Option<Arc<dyn TransportSession>>;

/// Waits, bounded, for another task to assign the transport session.
///
/// Takes a detached receiver (see [`MediaNegotiator::transport_watch`]) so
/// callers can wait without holding whatever lock guards the negotiator.
pub async fn wait_for_transport(
    mut rx: watch::Receiver<TransportSlot>,
    bound_secs: u64,
) -> MediaResult<Arc<dyn TransportSession>> {
    if let Some(transport) = rx.borrow_and_update().clone() {
        return Ok(transport);
    }
    let assigned = async {
        loop {
            if rx.changed().await.is_err() {
                return None;
            }
            let current = rx.borrow_and_update().clone();
            if current.is_some() {
                return current;
            }
        }
    };
    match timeout(Duration::from_secs(bound_secs), assigned).await {
        Ok(Some(transport)) => Ok(transport),
        _ => Err(MediaError::transport_timeout("transport manager assignment", bound_secs)),
    }
}

/// The offer/answer engine for one call peer.
pub struct MediaNegotiator {
    config: NegotiatorConfig,
    devices: Arc<dyn MediaDeviceSource>,
    transport_factory: Arc<dyn TransportFactory>,
    encryption: EncryptionSelector,
    local_contents: IndexMap<String, JingleContent>,
    remote_contents: IndexMap<String, JingleContent>,
    streams: HashMap<MediaType, Arc<dyn MediaStreamHandle>>,
    transport_tx: watch::Sender<TransportSlot>,
    transport_rx: watch::Receiver<TransportSlot>,
    locally_on_hold: bool,
    remotely_on_hold: bool,
}

impl MediaNegotiator {
    pub fn new(
        config: NegotiatorConfig,
        devices: Arc<dyn MediaDeviceSource>,
        transport_factory: Arc<dyn TransportFactory>,
        encryption_config: Arc<EncryptionConfig>,
    ) -> Self {
        let (transport_tx, transport_rx) = watch::channel(None);
        Self {
            config,
            devices,
            transport_factory,
            encryption: EncryptionSelector::new(encryption_config),
            local_contents: IndexMap::new(),
            remote_contents: IndexMap::new(),
            streams: HashMap::new(),
            transport_tx,
            transport_rx,
            locally_on_hold: false,
            remotely_on_hold: false,
        }
    }

    pub fn config(&self) -> &NegotiatorConfig {
        &self.config
    }

    pub fn local_contents(&self) -> &IndexMap<String, JingleContent> {
        &self.local_contents
    }

    pub fn remote_contents(&self) -> &IndexMap<String, JingleContent> {
        &self.remote_contents
    }

    pub fn stream(&self, media_type: MediaType) -> Option<&Arc<dyn MediaStreamHandle>> {
        self.streams.get(&media_type)
    }

    pub fn encryption(&self) -> &EncryptionSelector {
        &self.encryption
    }

    pub fn is_locally_on_hold(&self) -> bool {
        self.locally_on_hold
    }

    pub fn is_remotely_on_hold(&self) -> bool {
        self.remotely_on_hold
    }

    /// Assigns the transport session, waking anyone blocked in
    /// [`Self::wait_transport`].
    pub fn set_transport_session(&self, transport: Arc<dyn TransportSession>) {
        let _ = self.transport_tx.send(Some(transport));
    }

    /// The transport session, waiting up to the configured bound for another
    /// task to assign it.
    pub async fn wait_transport(&self) -> MediaResult<Arc<dyn TransportSession>> {
        wait_for_transport(self.transport_rx.clone(), self.config.transport_wait_secs).await
    }

    /// A detached receiver for the transport slot, for waiting outside the
    /// caller's negotiation lock via [`wait_for_transport`].
    pub fn transport_watch(&self) -> watch::Receiver<TransportSlot> {
        self.transport_rx.clone()
    }

    fn ensure_transport(&mut self, transport_type: TransportType) -> Arc<dyn TransportSession> {
        if let Some(transport) = self.transport_rx.borrow().clone() {
            return transport;
        }
        let transport = self.transport_factory.create(transport_type);
        let _ = self.transport_tx.send(Some(transport.clone()));
        transport
    }

    /// Builds the initial offer: one content per media type with an active
    /// device, then runs the candidate harvest and returns the harvested
    /// contents.
    pub async fn create_content_list(
        &mut self,
        info_sender: Option<Arc<dyn TransportInfoSender>>,
    ) -> MediaResult<Vec<JingleContent>> {
        let mut contents = Vec::new();
        for media_type in MediaType::ALL {
            if let Some(content) = self.build_offer_content(media_type) {
                contents.push(content);
            }
        }
        if contents.is_empty() {
            return Err(MediaError::NoActiveDevice);
        }
        self.harvest(None, contents, info_sender).await
    }

    /// Single-media variant used when adding a content to a running session
    /// (enabling video mid-call).
    pub async fn create_content_list_for(
        &mut self,
        media_type: MediaType,
        info_sender: Option<Arc<dyn TransportInfoSender>>,
    ) -> MediaResult<Vec<JingleContent>> {
        let content = self
            .build_offer_content(media_type)
            .ok_or(MediaError::NoActiveDevice)?;
        self.harvest(None, vec![content], info_sender).await
    }

    async fn harvest(
        &mut self,
        remote: Option<&[JingleContent]>,
        contents: Vec<JingleContent>,
        info_sender: Option<Arc<dyn TransportInfoSender>>,
    ) -> MediaResult<Vec<JingleContent>> {
        let transport = self.ensure_transport(self.config.preferred_transport);
        transport
            .start_candidate_harvest(remote, contents, info_sender)
            .await?;
        let mut harvested = transport.wrapup_candidate_harvest().await;
        for content in &mut harvested {
            self.encryption.apply_transport_level(content);
            self.local_contents.insert(content.name.clone(), content.clone());
        }
        Ok(harvested)
    }

    fn build_offer_content(&mut self, media_type: MediaType) -> Option<JingleContent> {
        let device = self.devices.default_device(media_type)?;
        if !self.devices.is_device_active(&device) {
            return None;
        }
        let mut direction = device.direction.and(self.config.user_direction(media_type));
        if self.config.conference_focus {
            // RTP translation for the other conference legs needs a sending
            // leg even without local capture.
            direction = direction.or(MediaDirection::SendOnly);
        }
        if self.locally_on_hold {
            direction = direction.and(MediaDirection::SendOnly);
        }
        // A pure-receive offer collapses to inactive: the answer could not
        // honor it without renegotiating.
        if direction == MediaDirection::RecvOnly {
            direction = MediaDirection::Inactive;
        }
        if direction == MediaDirection::Inactive {
            return None;
        }
        let formats = self.devices.supported_formats(&device);
        if formats.is_empty() {
            return None;
        }

        let creator = if self.config.local_is_initiator { Creator::Initiator } else { Creator::Responder };
        let mut content = JingleContent::new(media_type.as_str(), creator);
        content.senders = Some(senders_for_direction(direction, self.config.local_is_initiator));
        let mut description = RtpDescription::new(media_type);
        description.payload_types = formats;
        description.header_extensions = self.devices.supported_extensions(&device);
        description.rtcp_mux = self.config.rtcp_mux;
        content.description = Some(description);

        self.encryption
            .select_for_offer(media_type, &mut content, self.config.relay_focus);
        Some(content)
    }

    /// Reconciles a remote offer. Invalid contents are skipped (and their
    /// streams closed); the whole call fails only when nothing matches.
    /// Starts the candidate harvest and connectivity establishment for the
    /// surviving set without waiting for either, so the callee can ring
    /// before ICE concludes.
    pub async fn process_offer(
        &mut self,
        offer: &[JingleContent],
        info_sender: Option<Arc<dyn TransportInfoSender>>,
    ) -> MediaResult<ProcessedOffer> {
        let transport_type = offer
            .iter()
            .filter_map(|c| c.transport.as_ref())
            .map(|t| t.transport_type)
            .min()
            .unwrap_or(self.config.preferred_transport);

        let mut answers = Vec::new();
        for remote in offer {
            self.remote_contents.insert(remote.name.clone(), remote.clone());
            let Some(media_type) = remote.media_type() else {
                warn!("Skipping content '{}' with unknown media type", remote.name);
                continue;
            };
            match self.build_answer_content(media_type, remote)? {
                Some(local) => answers.push(local),
                None => self.close_stream(media_type),
            }
        }
        if answers.is_empty() {
            return Err(MediaError::no_matching_formats(
                "offer shares no usable content with local devices",
            ));
        }
        for local in &answers {
            self.local_contents.insert(local.name.clone(), local.clone());
        }

        let transport = self.ensure_transport(transport_type);
        transport
            .start_candidate_harvest(Some(offer), answers.clone(), info_sender)
            .await?;
        // Ring fast: kick connectivity checks off now, conclude them when
        // the accept is generated.
        transport.start_connectivity_establishment(offer).await?;

        Ok(ProcessedOffer { answer_contents: answers, transport_type })
    }

    fn build_answer_content(
        &mut self,
        media_type: MediaType,
        remote: &JingleContent,
    ) -> MediaResult<Option<JingleContent>> {
        let Some(device) = self.devices.default_device(media_type) else {
            return Ok(None);
        };
        if !self.devices.is_device_active(&device) {
            return Ok(None);
        }
        let remote_description = remote.description()?;

        let local_formats = self.devices.supported_formats(&device);
        let mutual = intersect_formats(&remote_description.payload_types, &local_formats);
        if mutual.is_empty() {
            info!("No mutually supported {} formats for '{}'", media_type, remote.name);
            return Ok(None);
        }

        let remote_requested = direction_from_senders(remote.senders, self.config.local_is_initiator);
        let mut capability = device.direction.and(self.config.user_direction(media_type));
        if self.locally_on_hold {
            capability = capability.and(MediaDirection::SendOnly);
        }
        let direction = capability.direction_for_answer(remote_requested);
        if direction == MediaDirection::Inactive {
            return Ok(None);
        }

        if let Some(transport) = &remote.transport {
            if let Some((rtp, _)) = transport.default_target() {
                if rtp.port() == 0 {
                    warn!("Content '{}' offers no usable target port", remote.name);
                    return Ok(None);
                }
            }
        }

        let mut local = JingleContent::new(remote.name.clone(), remote.creator);
        local.senders = Some(senders_for_direction(direction, self.config.local_is_initiator));
        let mut description = RtpDescription::new(media_type);
        description.payload_types = mutual;
        description.header_extensions = intersect_extensions(
            &remote_description.header_extensions,
            &self.devices.supported_extensions(&device),
        );
        description.rtcp_mux = remote_description.rtcp_mux && self.config.rtcp_mux;
        local.description = Some(description);

        self.encryption.select_for_answer(
            media_type,
            &mut local,
            remote,
            self.config.local_is_initiator,
            self.config.relay_focus,
        )?;
        self.encryption.capture_remote_advertisement(media_type, remote);
        Ok(Some(local))
    }

    /// Wraps up the candidate harvest and produces the session-accept
    /// content list, initializing local streams and attaching their SSRC
    /// advertisements on sending contents.
    pub async fn generate_session_accept(&mut self) -> MediaResult<Vec<JingleContent>> {
        let transport = self.wait_transport().await?;
        let mut contents = transport.wrapup_candidate_harvest().await;
        let stream_count = contents.len();

        for content in &mut contents {
            self.encryption.apply_transport_level(content);
        }
        for index in 0..contents.len() {
            let content = contents[index].clone();
            let handle = self.init_stream_for_content(&transport, &content, stream_count).await?;
            if let Some(handle) = handle {
                let direction = direction_from_senders(content.senders, self.config.local_is_initiator);
                if direction.allows_sending() {
                    if let (Some(ssrc), Some(description)) =
                        (handle.local_ssrc(), contents[index].description.as_mut())
                    {
                        description.sources = vec![SourceDescription {
                            ssrc,
                            owner: None,
                            parameters: Vec::new(),
                        }];
                    }
                }
            }
        }
        for content in &contents {
            self.local_contents.insert(content.name.clone(), content.clone());
        }
        Ok(contents)
    }

    /// Applies a complete answer (session-accept). Contents we offered that
    /// the answer omits were declined and are closed and removed.
    ///
    /// The caller resolves the transport session and runs connectivity
    /// establishment (including any wrap-up wait) before calling in, so this
    /// method never blocks beyond stream initialization.
    pub async fn process_answer(
        &mut self,
        transport: &Arc<dyn TransportSession>,
        answer: &[JingleContent],
    ) -> MediaResult<()> {
        self.apply_answer(transport, answer, true).await
    }

    /// Applies a partial answer (content-accept): only the named contents
    /// are touched, everything else stays as negotiated.
    pub async fn process_partial_answer(
        &mut self,
        transport: &Arc<dyn TransportSession>,
        answer: &[JingleContent],
    ) -> MediaResult<()> {
        self.apply_answer(transport, answer, false).await
    }

    async fn apply_answer(
        &mut self,
        transport: &Arc<dyn TransportSession>,
        answer: &[JingleContent],
        prune_omitted: bool,
    ) -> MediaResult<()> {
        if prune_omitted {
            let omitted: Vec<String> = self
                .local_contents
                .keys()
                .filter(|name| !answer.iter().any(|remote| &remote.name == *name))
                .cloned()
                .collect();
            for name in omitted {
                info!("Content '{}' missing from the answer, closing it", name);
                self.remove_content(&name);
            }
        }

        let stream_count = answer.len();
        let mut initialized = 0usize;
        let mut format_failures = 0usize;
        for remote in answer {
            self.remote_contents.insert(remote.name.clone(), remote.clone());
            let Some(media_type) = remote.media_type() else { continue };
            self.encryption.capture_remote_advertisement(media_type, remote);

            // Reflect the negotiated direction onto our stored content.
            if let Some(local) = self.local_contents.get_mut(&remote.name) {
                local.senders = Some(remote.senders());
            }

            if transport.stream_target(media_type).is_none() {
                // No target even after the caller's connectivity wrap-up:
                // the content is closed, not failed.
                self.close_stream(media_type);
                continue;
            }
            let local = match self.local_contents.get(&remote.name) {
                Some(local) => local.clone(),
                None => continue,
            };
            // Answer direction wins over whatever we offered.
            let mut negotiated = local;
            negotiated.senders = Some(remote.senders());
            if let (Some(desc), Ok(remote_desc)) = (negotiated.description.as_mut(), remote.description()) {
                desc.payload_types = remote_desc.payload_types.clone();
            }
            match self
                .init_stream_for_content(transport, &negotiated, stream_count)
                .await?
            {
                Some(_) => initialized += 1,
                None => format_failures += 1,
            }
        }
        if initialized == 0 && format_failures > 0 {
            return Err(MediaError::no_matching_formats(
                "answer yielded no initializable stream",
            ));
        }
        Ok(())
    }

    /// Initializes (or re-initializes) the media stream for one negotiated
    /// content. A missing connector or target means the content is closed,
    /// not an error.
    async fn init_stream_for_content(
        &mut self,
        transport: &Arc<dyn TransportSession>,
        content: &JingleContent,
        stream_count: usize,
    ) -> MediaResult<Option<Arc<dyn MediaStreamHandle>>> {
        let Some(media_type) = content.media_type() else {
            return Ok(None);
        };
        let (Some(connector), Some(target)) = (
            transport.stream_connector(media_type),
            transport.stream_target(media_type),
        ) else {
            debug!("No stream target for {} after wrap-up, treating as closed", media_type);
            self.close_stream(media_type);
            return Ok(None);
        };
        let Some(device) = self.devices.default_device(media_type) else {
            self.close_stream(media_type);
            return Ok(None);
        };
        let description = content.description()?;
        let local_formats = self.devices.supported_formats(&device);
        let Some((matched_remote, matched_local)) = description
            .payload_types
            .iter()
            .find_map(|remote| find_matching_format(&local_formats, remote).map(|local| (remote, local)))
        else {
            info!("Negotiated {} content carries no locally supported format", media_type);
            self.close_stream(media_type);
            return Ok(None);
        };
        let mut format = matched_local.clone();
        // Keep the wire numbering the remote side chose for this format.
        format.id = matched_remote.id;

        let mut direction = direction_from_senders(content.senders, self.config.local_is_initiator);
        if self.locally_on_hold {
            direction = direction.and(MediaDirection::SendOnly);
        }
        if self.remotely_on_hold {
            direction = direction.and(MediaDirection::RecvOnly);
        }

        // Audio is master when several streams synchronize; a lone stream
        // is its own master.
        let master_stream = stream_count <= 1 || media_type == MediaType::Audio;

        self.close_stream(media_type);
        let handle = self
            .devices
            .init_stream(StreamConfig {
                content_name: content.name.clone(),
                media_type,
                connector,
                target,
                format,
                direction,
                extensions: description.header_extensions.clone(),
                master_stream,
            })
            .await?;
        self.streams.insert(media_type, handle.clone());
        Ok(Some(handle))
    }

    /// Applies a content-modify or an in-place description update. A
    /// resolution-only change re-runs format selection without touching the
    /// negotiated senders.
    pub async fn reinit_content(
        &mut self,
        name: &str,
        content: &JingleContent,
        resolution_only: bool,
    ) -> MediaResult<()> {
        let Some(media_type) = content.media_type() else {
            return Err(MediaError::protocol_sequence(format!(
                "content-modify for '{name}' has no resolvable media type"
            )));
        };
        let stored_senders = self
            .remote_contents
            .get(name)
            .and_then(|c| c.senders)
            .or(content.senders);
        let mut updated = content.clone();
        if resolution_only {
            updated.senders = stored_senders;
        }
        self.remote_contents.insert(name.to_string(), updated.clone());

        if !resolution_only {
            let direction = direction_from_senders(updated.senders, self.config.local_is_initiator);
            let senders = senders_for_direction(direction, self.config.local_is_initiator);
            let constrained = self.constrained_direction(direction);
            if let Some(local) = self.local_contents.get_mut(name) {
                local.senders = Some(senders);
            }
            if let Some(stream) = self.streams.get(&media_type) {
                stream.set_direction(constrained);
                return Ok(());
            }
        }

        // Resolution changes (or a modify arriving before the stream is up)
        // re-run stream initialization against the updated description.
        if updated.description.is_some() {
            let transport = self.wait_transport().await?;
            let stream_count = self.remote_contents.len();
            let mut negotiated = updated;
            if negotiated.senders.is_none() {
                negotiated.senders = stored_senders;
            }
            self.init_stream_for_content(&transport, &negotiated, stream_count)
                .await?;
        }
        Ok(())
    }

    /// Re-derives every stream's configuration, applied when resuming from
    /// hold so the master-stream rule and directions settle again.
    pub async fn reinit_all_contents(&mut self) -> MediaResult<()> {
        let remote: Vec<(String, JingleContent)> = self
            .remote_contents
            .iter()
            .map(|(name, content)| (name.clone(), content.clone()))
            .collect();
        for (name, content) in remote {
            self.reinit_content(&name, &content, true).await?;
        }
        Ok(())
    }

    /// Removes a content from both maps and closes its stream.
    pub fn remove_content(&mut self, name: &str) {
        let media_type = self
            .local_contents
            .get(name)
            .or_else(|| self.remote_contents.get(name))
            .and_then(JingleContent::media_type);
        self.local_contents.shift_remove(name);
        self.remote_contents.shift_remove(name);
        if let Some(media_type) = media_type {
            self.close_stream(media_type);
        }
    }

    /// Local hold drops our playback leg while keeping the send leg alive;
    /// resume re-derives directions from the negotiated senders.
    pub fn set_locally_on_hold(&mut self, on_hold: bool) {
        self.locally_on_hold = on_hold;
        self.apply_hold_directions();
    }

    /// Remote hold means the peer stopped accepting our media.
    pub fn set_remotely_on_hold(&mut self, on_hold: bool) {
        self.remotely_on_hold = on_hold;
        self.apply_hold_directions();
    }

    fn apply_hold_directions(&mut self) {
        let contents: Vec<JingleContent> = self.local_contents.values().cloned().collect();
        for content in contents {
            let Some(media_type) = content.media_type() else { continue };
            let Some(stream) = self.streams.get(&media_type) else { continue };
            let negotiated = direction_from_senders(content.senders, self.config.local_is_initiator);
            stream.set_direction(self.constrained_direction(negotiated));
        }
    }

    /// The post-hold direction: the negotiated direction constrained by
    /// whichever hold states are in effect.
    fn constrained_direction(&self, negotiated: MediaDirection) -> MediaDirection {
        let mut direction = negotiated;
        if self.locally_on_hold {
            direction = direction.and(MediaDirection::SendOnly);
        }
        if self.remotely_on_hold {
            direction = direction.and(MediaDirection::RecvOnly);
        }
        direction
    }

    fn close_stream(&mut self, media_type: MediaType) {
        if let Some(stream) = self.streams.remove(&media_type) {
            debug!("Closing {} stream", media_type);
            stream.close();
        }
    }

    /// Closes all streams, tears down the encryption controls and releases
    /// the transport session.
    pub async fn close(&mut self) {
        for media_type in MediaType::ALL {
            self.close_stream(media_type);
        }
        self.encryption.controls_mut().cleanup_all();
        let transport = self.transport_rx.borrow().clone();
        if let Some(transport) = transport {
            transport.close().await;
        }
        let _ = self.transport_tx.send(None);
    }

    /// The senders value currently recorded for a local content, used to
    /// suppress no-op content-modify messages.
    pub fn local_senders(&self, name: &str) -> Option<Senders> {
        self.local_contents.get(name).map(JingleContent::senders)
    }

    /// The direction we currently want for a media type: device capability
    /// intersected with the user preference, constrained by any hold state.
    /// Inactive when no usable device exists.
    pub fn desired_direction(&self, media_type: MediaType) -> MediaDirection {
        let Some(device) = self.devices.default_device(media_type) else {
            return MediaDirection::Inactive;
        };
        if !self.devices.is_device_active(&device) {
            return MediaDirection::Inactive;
        }
        self.constrained_direction(device.direction.and(self.config.user_direction(media_type)))
    }

    /// Records a locally decided senders change and applies it to the
    /// running stream.
    pub fn update_local_senders(&mut self, name: &str, senders: Senders) {
        let direction = direction_from_senders(Some(senders), self.config.local_is_initiator);
        let constrained = self.constrained_direction(direction);
        let media_type = self
            .local_contents
            .get_mut(name)
            .map(|local| {
                local.senders = Some(senders);
                local.media_type()
            })
            .flatten();
        if let Some(stream) = media_type.and_then(|m| self.streams.get(&m)) {
            stream.set_direction(constrained);
        }
    }

    /// A content-modify payload carrying a full description with the
    /// device's current formats, used for resolution-only renegotiation.
    pub fn resolution_modify_content(&self, media_type: MediaType) -> Option<JingleContent> {
        let local = self
            .local_contents
            .values()
            .find(|c| c.media_type() == Some(media_type))?;
        let device = self.devices.default_device(media_type)?;
        let mut content = local.clone();
        if let Some(description) = content.description.as_mut() {
            description.payload_types = self.devices.supported_formats(&device);
        }
        Some(content)
    }
}
