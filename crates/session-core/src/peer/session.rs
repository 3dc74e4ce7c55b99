//! Call-peer state machine
//!
//! One [`CallPeerSession`] drives the whole Jingle lifecycle for a single
//! peer: initiating or receiving the session, answering, renegotiating
//! contents, hold, transfer and teardown. Inbound stanzas arrive on
//! concurrent dispatch tasks and user intents (answer/hangup/hold) on their
//! own callers, so correctness comes from explicit synchronization:
//!
//! - the SID and the cancellation flag live under one `std` mutex, so a
//!   hangup racing an outgoing initiate can never let a cancelled
//!   session-initiate out,
//! - negotiation runs under a per-session `tokio` mutex with critical
//!   sections kept as narrow as the collaborator waits allow,
//! - transport-info delivered ahead of session-initiate blocks on a bounded
//!   broadcast gate until the initiate has been processed,
//! - a content-add without candidates is retried on a cancellable delayed
//!   task instead of blocking the dispatch path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, Weak};
use std::time::Duration;

use rjabber_jingle_core::{
    factory, Creator, Jid, JingleContent, JingleIq, MediaType, Reason, SessionId, SessionInfoType,
    TransferInfo,
};
use rjabber_media_core::direction::senders_for_direction;
use rjabber_media_core::negotiator::{wait_for_transport, MediaNegotiator, NegotiatorConfig};
use rjabber_media_core::{
    MediaDeviceSource, MediaDirection, MediaError, MediaResult, TransportFactory, TransportSession,
};
use tokio::sync::{watch, Mutex as TokioMutex, Notify};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::AccountConfig;
use crate::conference::SsrcTracker;
use crate::error::{reason_for_media_error, SessionError, SessionResult};
use crate::peer::state::{established_state, CallPeerState};
use crate::signaling::StanzaSender;

const VIDEO_CONTENT: &str = "video";

/// SID and cancellation share one lock so the cancel check is atomic with
/// SID assignment.
#[derive(Default)]
struct SessionIdentity {
    sid: Option<SessionId>,
    cancelled: bool,
}

/// One-shot broadcast gate: session-initiate processing opens it, queued
/// transport-info handlers wait on it.
struct InitiateGate {
    notify: Notify,
    ready: AtomicBool,
}

impl InitiateGate {
    fn new() -> Self {
        Self { notify: Notify::new(), ready: AtomicBool::new(false) }
    }

    fn open(&self) {
        self.ready.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    async fn wait(&self, bound: Duration) -> bool {
        if self.ready.load(Ordering::Acquire) {
            return true;
        }
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before the re-check so an open() in between cannot be
        // missed.
        notified.as_mut().enable();
        if self.ready.load(Ordering::Acquire) {
            return true;
        }
        let _ = timeout(bound, notified).await;
        self.ready.load(Ordering::Acquire)
    }
}

/// The state machine for one call peer.
pub struct CallPeerSession {
    config: Arc<AccountConfig>,
    signaling: Arc<dyn StanzaSender>,
    local_jid: Jid,
    remote_jid: Jid,
    is_initiator: bool,
    ident: StdMutex<SessionIdentity>,
    state_tx: watch::Sender<CallPeerState>,
    negotiation: TokioMutex<MediaNegotiator>,
    initiate_gate: InitiateGate,
    initiate_processed: AtomicBool,
    terminated_tx: watch::Sender<bool>,
    terminated_rx: watch::Receiver<bool>,
    remote_conference_focus: AtomicBool,
    pending_content_add: StdMutex<Option<Vec<JingleContent>>>,
    failure_text: StdMutex<Option<String>>,
    conference: SsrcTracker,
}

impl CallPeerSession {
    /// Creates the session for an outgoing call; `initiate` sends the offer.
    pub fn new_outgoing(
        config: Arc<AccountConfig>,
        signaling: Arc<dyn StanzaSender>,
        local_jid: Jid,
        remote_jid: Jid,
        devices: Arc<dyn MediaDeviceSource>,
        transport_factory: Arc<dyn TransportFactory>,
    ) -> Arc<Self> {
        Self::new(config, signaling, local_jid, remote_jid, devices, transport_factory, true)
    }

    /// Creates the session for an incoming call; feed the inbound IQ to
    /// `process_session_initiate`.
    pub fn new_incoming(
        config: Arc<AccountConfig>,
        signaling: Arc<dyn StanzaSender>,
        local_jid: Jid,
        remote_jid: Jid,
        devices: Arc<dyn MediaDeviceSource>,
        transport_factory: Arc<dyn TransportFactory>,
    ) -> Arc<Self> {
        Self::new(config, signaling, local_jid, remote_jid, devices, transport_factory, false)
    }

    fn new(
        config: Arc<AccountConfig>,
        signaling: Arc<dyn StanzaSender>,
        local_jid: Jid,
        remote_jid: Jid,
        devices: Arc<dyn MediaDeviceSource>,
        transport_factory: Arc<dyn TransportFactory>,
        is_initiator: bool,
    ) -> Arc<Self> {
        let negotiator_config = NegotiatorConfig {
            local_is_initiator: is_initiator,
            rtcp_mux: config.rtcp_mux,
            ..NegotiatorConfig::default()
        };
        let negotiator = MediaNegotiator::new(
            negotiator_config,
            devices,
            transport_factory,
            config.encryption.clone(),
        );
        let (state_tx, _) = watch::channel(CallPeerState::Idle);
        let (terminated_tx, terminated_rx) = watch::channel(false);
        Arc::new(Self {
            config,
            signaling,
            local_jid,
            remote_jid,
            is_initiator,
            ident: StdMutex::new(SessionIdentity::default()),
            state_tx,
            negotiation: TokioMutex::new(negotiator),
            initiate_gate: InitiateGate::new(),
            initiate_processed: AtomicBool::new(false),
            terminated_tx,
            terminated_rx,
            remote_conference_focus: AtomicBool::new(false),
            pending_content_add: StdMutex::new(None),
            failure_text: StdMutex::new(None),
            conference: SsrcTracker::new(),
        })
    }

    pub fn state(&self) -> CallPeerState {
        *self.state_tx.borrow()
    }

    /// Watch handle for state transitions.
    pub fn state_changes(&self) -> watch::Receiver<CallPeerState> {
        self.state_tx.subscribe()
    }

    pub fn sid(&self) -> Option<SessionId> {
        self.ident.lock().unwrap().sid.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.ident.lock().unwrap().cancelled
    }

    pub fn remote_jid(&self) -> &Jid {
        &self.remote_jid
    }

    pub fn is_remote_conference_focus(&self) -> bool {
        self.remote_conference_focus.load(Ordering::Acquire)
    }

    /// The human-readable reason the call failed, when it did.
    pub fn failure_reason(&self) -> Option<String> {
        self.failure_text.lock().unwrap().clone()
    }

    pub fn conference(&self) -> &SsrcTracker {
        &self.conference
    }

    async fn send(&self, iq: JingleIq) -> SessionResult<()> {
        self.signaling.send(iq).await
    }

    /// Resolves the transport session through a detached watch receiver so
    /// the bounded wait never happens under the negotiation lock.
    async fn transport(&self) -> MediaResult<Arc<dyn TransportSession>> {
        let (slot, bound_secs) = {
            let negotiation = self.negotiation.lock().await;
            (negotiation.transport_watch(), negotiation.config().transport_wait_secs)
        };
        wait_for_transport(slot, bound_secs).await
    }

    /// Runs connectivity establishment for an answer and applies it to the
    /// negotiator. The transport resolution and any connectivity wrap-up
    /// happen outside the negotiation lock so hold and hangup stay
    /// responsive while ICE settles.
    async fn apply_answer(&self, contents: &[JingleContent], complete: bool) -> MediaResult<()> {
        let transport = self.transport().await?;
        transport.start_connectivity_establishment(contents).await?;
        let unresolved = contents
            .iter()
            .filter_map(JingleContent::media_type)
            .any(|media_type| transport.stream_target(media_type).is_none());
        if unresolved {
            // The answer raced ahead of transport-info; let the checks
            // settle, bounded by the collaborator's policy.
            transport.wrapup_connectivity_establishment().await?;
        }
        let mut negotiation = self.negotiation.lock().await;
        if complete {
            negotiation.process_answer(&transport, contents).await
        } else {
            negotiation.process_partial_answer(&transport, contents).await
        }
    }

    async fn set_state(&self, new: CallPeerState) {
        let old = self.state();
        if old == new || old.is_terminal() {
            return;
        }
        if new.is_terminal() {
            // Cancel any outstanding retries first, then release the
            // transport before anyone can observe the terminal state.
            let _ = self.terminated_tx.send(true);
            self.negotiation.lock().await.close().await;
        }
        debug!("Call peer {} state {} -> {}", self.remote_jid, old, new);
        // There may be no subscriber; the value must advance regardless.
        self.state_tx.send_replace(new);
        if matches!(old, CallPeerState::OnHold(_))
            && new == CallPeerState::Connected
            && self.is_remote_conference_focus()
        {
            // Resuming against a focus: the video forwarding direction may
            // have changed while we were away.
            if let Err(e) = self.send_modify_video_content_inner().await {
                warn!("Video re-derivation after resume failed: {e}");
            }
        }
    }

    async fn fail_with(&self, reason: Reason, text: String) {
        *self.failure_text.lock().unwrap() = Some(text.clone());
        if let Some(sid) = self.sid() {
            let iq = factory::error_terminate(
                self.local_jid.clone(),
                self.remote_jid.clone(),
                sid,
                reason,
                text,
            );
            if let Err(e) = self.send(iq).await {
                warn!("Could not deliver terminate: {e}");
            }
        }
        self.set_state(CallPeerState::Failed).await;
    }

    /// Builds and sends the session-initiate. A hangup racing this call is
    /// honored: the cancellation flag is checked under the same lock that
    /// assigns the SID, so a cancelled session never transmits an initiate.
    pub async fn initiate(&self) -> SessionResult<()> {
        if self.state().is_terminal() || self.is_cancelled() {
            return Ok(());
        }
        self.set_state(CallPeerState::Initiating).await;
        let contents = {
            let mut negotiation = self.negotiation.lock().await;
            match negotiation.create_content_list(None).await {
                Ok(contents) => contents,
                Err(e) => {
                    drop(negotiation);
                    self.fail_with(reason_for_media_error(&e), e.to_string()).await;
                    return Err(e.into());
                }
            }
        };
        let sid = {
            let mut ident = self.ident.lock().unwrap();
            if ident.cancelled {
                None
            } else {
                Some(ident.sid.get_or_insert_with(SessionId::generate).clone())
            }
        };
        let Some(sid) = sid else {
            info!("Session to {} cancelled before initiate, not sending", self.remote_jid);
            self.set_state(CallPeerState::Disconnected).await;
            return Ok(());
        };
        self.send(factory::session_initiate(
            self.local_jid.clone(),
            self.remote_jid.clone(),
            sid,
            contents,
        ))
        .await?;
        Ok(())
    }

    /// Tears the session down. Idempotent: a second call on a terminal
    /// session sends nothing. The terminate message depends on how far the
    /// call got; a session without a SID yet only records the cancellation.
    pub async fn hangup(&self, failed: bool, reason_text: Option<String>) -> SessionResult<()> {
        let state = self.state();
        if state.is_terminal() {
            return Ok(());
        }

        enum Terminate {
            Bye,
            Cancel,
            Busy,
        }
        let (sid, message) = {
            let mut ident = self.ident.lock().unwrap();
            match state {
                CallPeerState::Connected | CallPeerState::OnHold(_) => {
                    (ident.sid.clone(), ident.sid.as_ref().map(|_| Terminate::Bye))
                }
                CallPeerState::Initiating | CallPeerState::Alerting | CallPeerState::Connecting => {
                    if ident.sid.is_none() {
                        ident.cancelled = true;
                        (None, None)
                    } else {
                        (ident.sid.clone(), Some(Terminate::Cancel))
                    }
                }
                CallPeerState::Incoming => {
                    (ident.sid.clone(), ident.sid.as_ref().map(|_| Terminate::Busy))
                }
                CallPeerState::Idle => {
                    // Not initiated yet: record the cancellation so a
                    // concurrent initiate never sends.
                    ident.cancelled = true;
                    (None, None)
                }
                CallPeerState::Busy | CallPeerState::Disconnected | CallPeerState::Failed => {
                    (None, None)
                }
            }
        };

        if let (Some(sid), Some(message)) = (sid, message) {
            let from = self.local_jid.clone();
            let to = self.remote_jid.clone();
            let iq = if failed {
                factory::error_terminate(
                    from,
                    to,
                    sid,
                    Reason::GeneralError,
                    reason_text.clone().unwrap_or_else(|| "Call failed".to_string()),
                )
            } else {
                match message {
                    Terminate::Bye => factory::bye(from, to, sid, reason_text.clone()),
                    Terminate::Cancel => factory::cancel(from, to, sid),
                    Terminate::Busy => factory::busy(from, to, sid),
                }
            };
            if let Err(e) = self.send(iq).await {
                warn!("Could not deliver terminate: {e}");
            }
        }
        if failed {
            *self.failure_text.lock().unwrap() = reason_text;
        }
        self.set_state(if failed { CallPeerState::Failed } else { CallPeerState::Disconnected })
            .await;
        Ok(())
    }

    /// Handles the inbound session-initiate. Exactly-once: duplicates are
    /// ignored. On success the callee rings; on failure the session is
    /// terminated with a descriptive reason. Either way the gate opens so
    /// queued transport-info handlers proceed.
    pub async fn process_session_initiate(self: &Arc<Self>, iq: &JingleIq) -> SessionResult<()> {
        if self.initiate_processed.swap(true, Ordering::AcqRel) {
            debug!("Duplicate session-initiate for {} ignored", iq.sid);
            return Ok(());
        }
        {
            let mut ident = self.ident.lock().unwrap();
            if ident.sid.is_none() {
                ident.sid = Some(iq.sid.clone());
            }
        }
        self.remote_conference_focus.store(iq.conference_focus, Ordering::Release);
        self.set_state(CallPeerState::Incoming).await;

        let trickle: Arc<dyn rjabber_media_core::TransportInfoSender> =
            Arc::new(TrickleSender { session: Arc::downgrade(self) });
        let result = {
            let mut negotiation = self.negotiation.lock().await;
            negotiation.process_offer(&iq.contents, Some(trickle)).await
        };
        self.initiate_gate.open();

        match result {
            Ok(_) => {
                self.conference.on_source_add(&iq.contents);
                if let Some(sid) = self.sid() {
                    self.send(factory::ringing(self.local_jid.clone(), self.remote_jid.clone(), sid))
                        .await?;
                }
                Ok(())
            }
            Err(e) => {
                self.fail_with(reason_for_media_error(&e), e.to_string()).await;
                Err(e.into())
            }
        }
    }

    /// Accepts an incoming call: wraps up negotiation, sends session-accept
    /// and starts media. A no-op unless the call is still incoming.
    pub async fn answer(&self) -> SessionResult<()> {
        if self.state() != CallPeerState::Incoming {
            return Ok(());
        }
        self.set_state(CallPeerState::Connecting).await;
        let Some(sid) = self.sid() else {
            return Err(SessionError::invalid_state("answer", self.state()));
        };
        let accept = {
            let mut negotiation = self.negotiation.lock().await;
            negotiation.generate_session_accept().await
        };
        match accept {
            Ok(contents) => {
                self.send(factory::session_accept(
                    self.local_jid.clone(),
                    self.remote_jid.clone(),
                    sid,
                    contents,
                ))
                .await?;
                self.set_state(CallPeerState::Connected).await;
                Ok(())
            }
            Err(e) => {
                self.fail_with(Reason::FailedApplication, e.to_string()).await;
                Err(e.into())
            }
        }
    }

    /// Handles the remote session-accept on an outgoing call.
    pub async fn process_session_accept(self: &Arc<Self>, iq: &JingleIq) -> SessionResult<()> {
        let state = self.state();
        if !matches!(
            state,
            CallPeerState::Initiating | CallPeerState::Alerting | CallPeerState::Connecting
        ) {
            warn!("session-accept in state {state} ignored");
            return Ok(());
        }
        self.set_state(CallPeerState::Connecting).await;
        let offered_video = self
            .negotiation
            .lock()
            .await
            .local_contents()
            .contains_key(VIDEO_CONTENT);
        let result = self.apply_answer(&iq.contents, true).await;
        match result {
            Ok(()) => {
                self.conference.on_source_add(&iq.contents);
                self.set_state(CallPeerState::Connected).await;
                // Video may have been enabled locally while the initiate was
                // in flight. A video content we offered that the answer
                // declined is not re-offered here.
                if !offered_video {
                    if let Err(e) = self.send_modify_video_content().await {
                        debug!("Post-accept video modify skipped: {e}");
                    }
                }
                Ok(())
            }
            Err(e) => {
                self.fail_with(reason_for_media_error(&e), e.to_string()).await;
                Err(e.into())
            }
        }
    }

    /// Ringing, hold and unhold notifications from the peer.
    pub async fn process_session_info(&self, iq: &JingleIq) -> SessionResult<()> {
        match iq.session_info {
            Some(SessionInfoType::Ringing) => {
                if matches!(self.state(), CallPeerState::Initiating | CallPeerState::Connecting) {
                    self.set_state(CallPeerState::Alerting).await;
                }
                Ok(())
            }
            Some(SessionInfoType::Hold) => self.apply_remote_hold(true).await,
            Some(SessionInfoType::Unhold) | Some(SessionInfoType::Active) => {
                self.apply_remote_hold(false).await
            }
            Some(SessionInfoType::Mute) | Some(SessionInfoType::Unmute) => {
                debug!("Peer {} mute state changed", self.remote_jid);
                Ok(())
            }
            None => Ok(()),
        }
    }

    async fn apply_remote_hold(&self, on_hold: bool) -> SessionResult<()> {
        let locally_on_hold = {
            let mut negotiation = self.negotiation.lock().await;
            negotiation.set_remotely_on_hold(on_hold);
            negotiation.is_locally_on_hold()
        };
        if self.state().is_established() {
            self.set_state(established_state(locally_on_hold, on_hold)).await;
        }
        Ok(())
    }

    /// Puts the call on hold (or resumes it), notifying the peer with
    /// session-info. Resume re-derives every stream configuration.
    pub async fn put_on_hold(&self, on_hold: bool) -> SessionResult<()> {
        let state = self.state();
        if !state.is_established() {
            return Err(SessionError::invalid_state("hold", state));
        }
        let remotely_on_hold = {
            let mut negotiation = self.negotiation.lock().await;
            negotiation.set_locally_on_hold(on_hold);
            if !on_hold {
                negotiation.reinit_all_contents().await?;
            }
            negotiation.is_remotely_on_hold()
        };
        if let Some(sid) = self.sid() {
            let info = if on_hold { SessionInfoType::Hold } else { SessionInfoType::Unhold };
            self.send(factory::session_info(
                self.local_jid.clone(),
                self.remote_jid.clone(),
                sid,
                info,
            ))
            .await?;
        }
        self.set_state(established_state(on_hold, remotely_on_hold)).await;
        Ok(())
    }

    /// Applies inbound transport-info. When the session-initiate for this
    /// session is still being processed the handler waits, bounded, on the
    /// gate; candidates for a deferred content-add are merged into it.
    pub async fn process_transport_info(&self, iq: &JingleIq) -> SessionResult<()> {
        if !self.is_initiator {
            let bound = Duration::from_millis(self.config.initiate_gate_wait_ms);
            if !self.initiate_gate.wait(bound).await {
                return Err(MediaError::transport_timeout(
                    "session-initiate processing",
                    bound.as_secs().max(1),
                )
                .into());
            }
        }
        if self.state().is_terminal() {
            return Ok(());
        }
        self.merge_pending_candidates(&iq.contents);
        let transport = self.transport().await?;
        transport.start_connectivity_establishment(&iq.contents).await?;
        Ok(())
    }

    /// Sends trickled local candidates, suppressed once the session is
    /// cancelled or torn down.
    pub async fn send_transport_info(&self, contents: Vec<JingleContent>) -> SessionResult<()> {
        if self.is_cancelled() || self.state().is_terminal() {
            return Ok(());
        }
        let Some(sid) = self.sid() else { return Ok(()) };
        self.send(factory::transport_info(
            self.local_jid.clone(),
            self.remote_jid.clone(),
            sid,
            contents,
        ))
        .await
    }

    /// Handles content-add. If the added contents carry no candidates yet
    /// (trickle pattern) processing is deferred to a cancellable delayed
    /// retry instead of blocking the dispatch path; the awaited candidates
    /// arrive through transport-info and are merged into the pending add.
    pub async fn process_content_add(self: &Arc<Self>, iq: &JingleIq) -> SessionResult<()> {
        self.handle_content_add(iq.contents.clone(), false).await
    }

    async fn handle_content_add(
        self: &Arc<Self>,
        contents: Vec<JingleContent>,
        is_retry: bool,
    ) -> SessionResult<()> {
        if self.state().is_terminal() {
            return Ok(());
        }
        let lacks_candidates = contents
            .iter()
            .all(|c| c.transport.as_ref().map_or(true, |t| t.candidates.is_empty()));
        if lacks_candidates && !is_retry {
            debug!("content-add without candidates, deferring");
            self.defer_content_add(contents);
            return Ok(());
        }

        let result = {
            let mut negotiation = self.negotiation.lock().await;
            match negotiation.process_offer(&contents, None).await {
                Ok(_) => negotiation.generate_session_accept().await,
                Err(e) => Err(e),
            }
        };
        let Some(sid) = self.sid() else { return Ok(()) };
        match result {
            Ok(accept) => {
                self.send(factory::content_accept(
                    self.local_jid.clone(),
                    self.remote_jid.clone(),
                    sid,
                    accept,
                ))
                .await?;
                if self.is_remote_conference_focus() {
                    if let Err(e) = self.send_modify_video_content().await {
                        debug!("Video forwarding re-derivation skipped: {e}");
                    }
                }
                Ok(())
            }
            Err(e) => {
                // Content-level failure: reject the addition, keep the call.
                warn!("content-add rejected: {e}");
                let stubs = contents
                    .iter()
                    .map(|c| JingleContent::new(c.name.clone(), c.creator))
                    .collect();
                self.send(factory::content_reject(
                    self.local_jid.clone(),
                    self.remote_jid.clone(),
                    sid,
                    stubs,
                ))
                .await?;
                Ok(())
            }
        }
    }

    fn defer_content_add(self: &Arc<Self>, contents: Vec<JingleContent>) {
        *self.pending_content_add.lock().unwrap() = Some(contents);
        let session = Arc::downgrade(self);
        let mut terminated = self.terminated_rx.clone();
        let delay = Duration::from_millis(self.config.content_add_retry_delay_ms);
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                // A superseding session-terminate cancels the retry.
                _ = terminated.changed() => return,
            }
            let Some(session) = session.upgrade() else { return };
            if session.state().is_terminal() {
                return;
            }
            let pending = session.pending_content_add.lock().unwrap().take();
            if let Some(contents) = pending {
                if let Err(e) = session.handle_content_add(contents, true).await {
                    warn!("content-add retry failed: {e}");
                }
            }
        });
    }

    fn merge_pending_candidates(&self, updates: &[JingleContent]) {
        let mut pending = self.pending_content_add.lock().unwrap();
        let Some(pending) = pending.as_mut() else { return };
        for update in updates {
            let Some(update_transport) = &update.transport else { continue };
            let Some(content) = pending.iter_mut().find(|c| c.name == update.name) else {
                continue;
            };
            match &mut content.transport {
                Some(transport) => transport
                    .candidates
                    .extend(update_transport.candidates.iter().cloned()),
                None => content.transport = Some(update_transport.clone()),
            }
        }
    }

    /// The peer accepted contents we added earlier. The accept only covers
    /// the added contents, so it is applied as a partial answer.
    pub async fn process_content_accept(&self, iq: &JingleIq) -> SessionResult<()> {
        let result = self.apply_answer(&iq.contents, false).await;
        if let Err(e) = result {
            // The session carries on; only the added content is lost.
            warn!("content-accept could not be applied: {e}");
        }
        Ok(())
    }

    /// A content-modify either changes senders or (carrying a full
    /// description with unchanged senders) asks for a quality re-selection.
    pub async fn process_content_modify(&self, iq: &JingleIq) -> SessionResult<()> {
        let mut negotiation = self.negotiation.lock().await;
        for content in &iq.contents {
            let current = negotiation
                .remote_contents()
                .get(&content.name)
                .and_then(|c| c.senders);
            let resolution_only = content.description.is_some()
                && (content.senders.is_none() || content.senders == current);
            negotiation.reinit_content(&content.name, content, resolution_only).await?;
        }
        Ok(())
    }

    /// A content-reject with no contents rejects the whole offer.
    pub async fn process_content_reject(&self, iq: &JingleIq) -> SessionResult<()> {
        if iq.contents.is_empty() {
            self.fail_with(
                Reason::IncompatibleParameters,
                "offer rejected by peer".to_string(),
            )
            .await;
            return Ok(());
        }
        let mut negotiation = self.negotiation.lock().await;
        for content in &iq.contents {
            negotiation.remove_content(&content.name);
        }
        Ok(())
    }

    pub async fn process_content_remove(self: &Arc<Self>, iq: &JingleIq) -> SessionResult<()> {
        let mut video_removed = false;
        {
            let mut negotiation = self.negotiation.lock().await;
            for content in &iq.contents {
                video_removed |= content.media_type() == Some(MediaType::Video);
                negotiation.remove_content(&content.name);
            }
        }
        if video_removed && self.is_remote_conference_focus() {
            if let Err(e) = self.send_modify_video_content().await {
                debug!("Video forwarding re-derivation skipped: {e}");
            }
        }
        Ok(())
    }

    pub async fn process_session_terminate(&self, iq: &JingleIq) -> SessionResult<()> {
        let (failed, text) = match &iq.reason {
            Some(reason) => (
                matches!(
                    reason.reason,
                    Reason::FailedApplication
                        | Reason::FailedTransport
                        | Reason::GeneralError
                        | Reason::IncompatibleParameters
                        | Reason::ConnectivityError
                        | Reason::MediaError
                        | Reason::SecurityError
                ),
                reason.text.clone(),
            ),
            None => (false, None),
        };
        if failed {
            *self.failure_text.lock().unwrap() = text;
        }
        self.set_state(if failed { CallPeerState::Failed } else { CallPeerState::Disconnected })
            .await;
        Ok(())
    }

    /// source-add / source-remove bookkeeping for conference members.
    pub fn process_source_add(&self, iq: &JingleIq) {
        self.conference.on_source_add(&iq.contents);
    }

    pub fn process_source_remove(&self, iq: &JingleIq) {
        self.conference.on_source_remove(&iq.contents);
    }

    /// Transfers the peer to another address (XEP-0251). Attended transfer
    /// carries the SID of our session with the target; unattended omits it.
    /// The local session ends with a success terminate.
    pub async fn transfer(&self, to: &Jid, attended_sid: Option<SessionId>) -> SessionResult<()> {
        let state = self.state();
        if !state.is_established() {
            return Err(SessionError::invalid_state("transfer", state));
        }
        let Some(sid) = self.sid() else {
            return Err(SessionError::invalid_state("transfer", state));
        };
        let transfer = TransferInfo { from: None, to: Some(to.clone()), sid: attended_sid };
        self.send(factory::session_transfer(
            self.local_jid.clone(),
            self.remote_jid.clone(),
            sid.clone(),
            transfer,
        ))
        .await?;
        self.send(factory::bye(
            self.local_jid.clone(),
            self.remote_jid.clone(),
            sid,
            Some("Call transferred".to_string()),
        ))
        .await?;
        self.set_state(CallPeerState::Disconnected).await;
        Ok(())
    }

    /// Validates an inbound transfer request and returns the target to call.
    /// Unattended transfers are only honored for targets the roster knows.
    pub fn process_transfer(
        &self,
        iq: &JingleIq,
        roster_contains: &dyn Fn(&Jid) -> bool,
    ) -> SessionResult<Jid> {
        let transfer = iq
            .transfer
            .as_ref()
            .ok_or_else(|| SessionError::invalid_transfer("missing transfer element"))?;
        let target = transfer
            .to
            .clone()
            .ok_or_else(|| SessionError::invalid_transfer("missing transfer target"))?;
        if let Some(from) = &transfer.from {
            if from.bare() != self.remote_jid.bare() {
                return Err(SessionError::invalid_transfer(
                    "transfer attendant does not match the session peer",
                ));
            }
        }
        if transfer.sid.is_none() && !roster_contains(&target) {
            return Err(SessionError::invalid_transfer(format!(
                "unattended transfer target {target} not in roster"
            )));
        }
        Ok(target)
    }

    /// Reconciles the signaled video content with the current local capture
    /// state: adds, removes or modifies the video content as needed. Returns
    /// whether a stanza was sent; an unchanged senders value sends nothing.
    pub async fn send_modify_video_content(self: &Arc<Self>) -> SessionResult<bool> {
        self.send_modify_video_content_inner().await
    }

    async fn send_modify_video_content_inner(&self) -> SessionResult<bool> {
        let Some(sid) = self.sid() else { return Ok(false) };
        let mut negotiation = self.negotiation.lock().await;
        let desired = negotiation.desired_direction(MediaType::Video);
        let current = negotiation.local_senders(VIDEO_CONTENT);
        let is_initiator = negotiation.config().local_is_initiator;
        let from = self.local_jid.clone();
        let to = self.remote_jid.clone();

        match current {
            None if !desired.allows_sending() => Ok(false),
            None => {
                let contents = negotiation.create_content_list_for(MediaType::Video, None).await?;
                drop(negotiation);
                self.send(factory::content_add(from, to, sid, contents)).await?;
                Ok(true)
            }
            Some(_) if desired == MediaDirection::Inactive => {
                let creator = negotiation
                    .local_contents()
                    .get(VIDEO_CONTENT)
                    .map(|c| c.creator)
                    .unwrap_or(if is_initiator { Creator::Initiator } else { Creator::Responder });
                negotiation.remove_content(VIDEO_CONTENT);
                drop(negotiation);
                let stub = JingleContent::new(VIDEO_CONTENT, creator);
                self.send(factory::content_remove(from, to, sid, vec![stub])).await?;
                Ok(true)
            }
            Some(current) => {
                let new_senders = senders_for_direction(desired, is_initiator);
                if new_senders == current {
                    return Ok(false);
                }
                let creator = negotiation
                    .local_contents()
                    .get(VIDEO_CONTENT)
                    .map(|c| c.creator)
                    .unwrap_or(if is_initiator { Creator::Initiator } else { Creator::Responder });
                negotiation.update_local_senders(VIDEO_CONTENT, new_senders);
                drop(negotiation);
                let mut stub = JingleContent::new(VIDEO_CONTENT, creator);
                stub.senders = Some(new_senders);
                self.send(factory::content_modify(from, to, sid, stub)).await?;
                Ok(true)
            }
        }
    }

    /// Sends a content-modify carrying the full description so the peer
    /// re-selects formats for a changed resolution preset. Senders are
    /// untouched.
    pub async fn send_modify_video_resolution_content(&self) -> SessionResult<bool> {
        let Some(sid) = self.sid() else { return Ok(false) };
        let content = {
            let negotiation = self.negotiation.lock().await;
            negotiation.resolution_modify_content(MediaType::Video)
        };
        let Some(content) = content else { return Ok(false) };
        self.send(factory::content_modify(
            self.local_jid.clone(),
            self.remote_jid.clone(),
            sid,
            content,
        ))
        .await?;
        Ok(true)
    }
}

/// Trickles freshly harvested candidates back out through the session.
struct TrickleSender {
    session: Weak<CallPeerSession>,
}

#[async_trait::async_trait]
impl rjabber_media_core::TransportInfoSender for TrickleSender {
    async fn send_transport_info(&self, contents: Vec<JingleContent>) {
        if let Some(session) = self.session.upgrade() {
            if let Err(e) = session.send_transport_info(contents).await {
                warn!("Trickled transport-info not sent: {e}");
            }
        }
    }
}
