//! Encryption protocol selection and SRTP control bookkeeping
//!
//! One protocol family may be active per media type at any time: DTLS-SRTP,
//! SDES or ZRTP. Selection walks the account's ordered enabled-protocol list
//! and stops at the first family both sides advertise. Selecting a new
//! family tears down the previous control for that media type; a control is
//! never cleaned up twice and never leaked.

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine;
use rand::Rng;
use rjabber_jingle_core::{
    DtlsFingerprint, DtlsSetup, EncryptionAdvertisement, JingleContent, MediaType, SdesCrypto,
    TransportDescription, TransportType, ZrtpHash,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// The key-exchange families this engine can negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SrtpControlType {
    DtlsSrtp,
    Sdes,
    Zrtp,
}

impl SrtpControlType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DtlsSrtp => "DTLS-SRTP",
            Self::Sdes => "SDES",
            Self::Zrtp => "ZRTP",
        }
    }
}

impl std::fmt::Display for SrtpControlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The local DTLS certificate identity, provisioned by the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DtlsIdentity {
    /// Hash function name, e.g. "sha-256"
    pub hash: String,
    /// Certificate fingerprint in colon-separated hex
    pub fingerprint: String,
}

/// Account-level encryption preferences, built once and shared.
#[derive(Debug, Clone)]
pub struct EncryptionConfig {
    /// Master switch; when off no advertisement is ever produced
    pub enabled: bool,
    /// When true, failing to agree on a protocol fails the content
    /// (surfaced to the peer as incompatible-parameters)
    pub required: bool,
    /// Preference-ordered list of enabled families
    pub protocol_order: Vec<SrtpControlType>,
    /// Enabled SDES crypto suites, in local preference order
    pub sdes_cipher_suites: Vec<String>,
    /// ZRTP protocol versions we advertise
    pub zrtp_versions: Vec<String>,
    pub dtls_identity: Option<DtlsIdentity>,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            required: false,
            protocol_order: vec![SrtpControlType::DtlsSrtp, SrtpControlType::Sdes, SrtpControlType::Zrtp],
            sdes_cipher_suites: vec![
                "AES_CM_128_HMAC_SHA1_80".to_string(),
                "AES_CM_128_HMAC_SHA1_32".to_string(),
            ],
            zrtp_versions: vec!["1.10".to_string()],
            dtls_identity: None,
        }
    }
}

/// Protocol-specific key material held while a family is active.
#[derive(Debug, Clone)]
pub enum ControlDetail {
    Dtls {
        local_fingerprint: DtlsFingerprint,
        remote_fingerprints: Vec<DtlsFingerprint>,
    },
    Sdes {
        local_cryptos: Vec<SdesCrypto>,
        /// The suite agreed with the peer, once selection ran
        selected: Option<SdesCrypto>,
    },
    Zrtp {
        local_hashes: Vec<ZrtpHash>,
        /// Hash captured from the peer's advertisement for key-continuity
        /// verification
        received: Option<ZrtpHash>,
    },
}

/// One active (or retired) encryption control for a media type.
#[derive(Debug, Clone)]
pub struct SrtpControl {
    control_type: SrtpControlType,
    detail: ControlDetail,
    torn_down: bool,
    cleanup_invocations: u32,
}

impl SrtpControl {
    fn new(control_type: SrtpControlType, detail: ControlDetail) -> Self {
        Self { control_type, detail, torn_down: false, cleanup_invocations: 0 }
    }

    pub fn control_type(&self) -> SrtpControlType {
        self.control_type
    }

    pub fn detail(&self) -> &ControlDetail {
        &self.detail
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// How many times cleanup ran; must end up exactly 1 for every control
    /// that ever left the active slot.
    pub fn cleanup_invocations(&self) -> u32 {
        self.cleanup_invocations
    }

    /// Releases key material. Terminal: a torn-down control is never reused.
    pub fn cleanup(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.cleanup_invocations += 1;
    }
}

/// Per-session registry: at most one active control per media type, plus the
/// retired controls in their torn-down terminal state.
#[derive(Debug, Default)]
pub struct SrtpControls {
    active: HashMap<MediaType, SrtpControl>,
    retired: Vec<SrtpControl>,
}

impl SrtpControls {
    pub fn active(&self, media_type: MediaType) -> Option<&SrtpControl> {
        self.active.get(&media_type)
    }

    pub fn active_mut(&mut self, media_type: MediaType) -> Option<&mut SrtpControl> {
        self.active.get_mut(&media_type)
    }

    /// Installs a new active control, tearing down the previous one.
    fn install(&mut self, media_type: MediaType, control: SrtpControl) {
        if let Some(mut old) = self.active.remove(&media_type) {
            debug!("Replacing {} control for {}", old.control_type(), media_type);
            old.cleanup();
            self.retired.push(old);
        }
        self.active.insert(media_type, control);
    }

    /// Tears down the active control without a replacement (protocol
    /// disappeared on renegotiation, or the session is closing).
    pub fn retire(&mut self, media_type: MediaType) {
        if let Some(mut old) = self.active.remove(&media_type) {
            old.cleanup();
            self.retired.push(old);
        }
    }

    /// Tears down everything; called on session close.
    pub fn cleanup_all(&mut self) {
        for media_type in MediaType::ALL {
            self.retire(media_type);
        }
    }

    /// Controls that have been torn down, in teardown order.
    pub fn retired(&self) -> &[SrtpControl] {
        &self.retired
    }
}

/// Chooses an encryption family per media type and maintains the controls.
pub struct EncryptionSelector {
    config: Arc<EncryptionConfig>,
    controls: SrtpControls,
}

impl EncryptionSelector {
    pub fn new(config: Arc<EncryptionConfig>) -> Self {
        Self { config, controls: SrtpControls::default() }
    }

    pub fn controls(&self) -> &SrtpControls {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut SrtpControls {
        &mut self.controls
    }

    /// Advertises our preferred family on an outgoing offer content.
    ///
    /// Skipped entirely when a media-relay focus bridge carries the session:
    /// the relay does not broker client-to-client crypto.
    pub fn select_for_offer(&mut self, media_type: MediaType, content: &mut JingleContent, relay_focus: bool) {
        if !self.config.enabled || relay_focus {
            return;
        }
        let order = self.config.protocol_order.clone();
        for control_type in order {
            let advertised = match control_type {
                SrtpControlType::DtlsSrtp => self.offer_dtls(media_type, content),
                SrtpControlType::Sdes => self.offer_sdes(media_type, content),
                SrtpControlType::Zrtp => self.offer_zrtp(media_type, content),
            };
            if advertised {
                debug!("Offering {} for {}", control_type, media_type);
                return;
            }
        }
    }

    /// Chooses the family for an answer: the first protocol in the account
    /// order that the remote content also advertises. `as_initiator` selects
    /// the SDES suite-selection order, which differs by role.
    pub fn select_for_answer(
        &mut self,
        media_type: MediaType,
        local: &mut JingleContent,
        remote: &JingleContent,
        as_initiator: bool,
        relay_focus: bool,
    ) -> MediaResult<Option<SrtpControlType>> {
        if !self.config.enabled || relay_focus {
            self.controls.retire(media_type);
            return Ok(None);
        }
        let order = self.config.protocol_order.clone();
        for control_type in order {
            let chosen = match control_type {
                SrtpControlType::DtlsSrtp => self.answer_dtls(media_type, local, remote),
                SrtpControlType::Sdes => self.answer_sdes(media_type, local, remote, as_initiator),
                SrtpControlType::Zrtp => self.answer_zrtp(media_type, local, remote),
            };
            if chosen {
                return Ok(Some(control_type));
            }
        }
        // Nothing matched. Tear down whatever was active for this media
        // type; the protocol we previously advertised is gone.
        self.controls.retire(media_type);
        if self.config.required {
            return Err(MediaError::security(format!(
                "no mutually supported encryption protocol for {media_type}"
            )));
        }
        Ok(None)
    }

    /// Opportunistically records remote key material from any inbound
    /// advertisement (answer, content-add...) without changing the selected
    /// family: ZRTP hashes for key continuity, DTLS fingerprints for
    /// certificate verification.
    pub fn capture_remote_advertisement(&mut self, media_type: MediaType, remote: &JingleContent) {
        if let Some(transport) = &remote.transport {
            if let Some(fingerprint) = &transport.fingerprint {
                if let Some(control) = self.controls.active_mut(media_type) {
                    if let ControlDetail::Dtls { remote_fingerprints, .. } = &mut control.detail {
                        if !remote_fingerprints.contains(fingerprint) {
                            remote_fingerprints.push(fingerprint.clone());
                        }
                    }
                }
            }
        }
        let Some(description) = remote.description.as_ref() else { return };
        match &description.encryption {
            Some(EncryptionAdvertisement::Zrtp(hashes)) => {
                let Some(hash) = hashes.first() else { return };
                if let Some(control) = self.controls.active_mut(media_type) {
                    if let ControlDetail::Zrtp { received, .. } = &mut control.detail {
                        debug!("Captured remote ZRTP hash (version {}) for {}", hash.version, media_type);
                        *received = Some(hash.clone());
                    }
                }
            }
            Some(EncryptionAdvertisement::Sdes(cryptos)) => {
                // An answer narrows our offered suites to the agreed one.
                if let Some(control) = self.controls.active_mut(media_type) {
                    if let ControlDetail::Sdes { local_cryptos, selected } = &mut control.detail {
                        if selected.is_none() {
                            *selected = cryptos
                                .iter()
                                .find(|c| local_cryptos.iter().any(|l| l.crypto_suite == c.crypto_suite))
                                .cloned();
                        }
                    }
                }
            }
            None => {}
        }
    }

    /// Re-applies transport-level crypto (the DTLS fingerprint) onto a
    /// content whose transport the candidate harvest has just filled in.
    pub fn apply_transport_level(&self, content: &mut JingleContent) {
        let Some(media_type) = content.media_type() else { return };
        let Some(control) = self.controls.active(media_type) else { return };
        let ControlDetail::Dtls { local_fingerprint, .. } = control.detail() else { return };
        let transport = content
            .transport
            .get_or_insert_with(|| TransportDescription::new(TransportType::IceUdp));
        transport.fingerprint = Some(local_fingerprint.clone());
    }

    fn offer_dtls(&mut self, media_type: MediaType, content: &mut JingleContent) -> bool {
        let Some(identity) = &self.config.dtls_identity else { return false };
        let local_fingerprint = DtlsFingerprint {
            hash: identity.hash.clone(),
            fingerprint: identity.fingerprint.clone(),
            // Offerer leaves the role open.
            setup: DtlsSetup::Actpass,
        };
        let transport = content
            .transport
            .get_or_insert_with(|| TransportDescription::new(TransportType::IceUdp));
        transport.fingerprint = Some(local_fingerprint.clone());
        self.controls.install(
            media_type,
            SrtpControl::new(
                SrtpControlType::DtlsSrtp,
                ControlDetail::Dtls { local_fingerprint, remote_fingerprints: Vec::new() },
            ),
        );
        true
    }

    fn offer_sdes(&mut self, media_type: MediaType, content: &mut JingleContent) -> bool {
        if self.config.sdes_cipher_suites.is_empty() {
            return false;
        }
        let Some(description) = content.description.as_mut() else { return false };
        let local_cryptos: Vec<SdesCrypto> = self
            .config
            .sdes_cipher_suites
            .iter()
            .enumerate()
            .map(|(i, suite)| generate_sdes_crypto(i as u32 + 1, suite))
            .collect();
        description.encryption = Some(EncryptionAdvertisement::Sdes(local_cryptos.clone()));
        self.controls.install(
            media_type,
            SrtpControl::new(SrtpControlType::Sdes, ControlDetail::Sdes { local_cryptos, selected: None }),
        );
        true
    }

    fn offer_zrtp(&mut self, media_type: MediaType, content: &mut JingleContent) -> bool {
        if self.config.zrtp_versions.is_empty() {
            return false;
        }
        let Some(description) = content.description.as_mut() else { return false };
        let local_hashes: Vec<ZrtpHash> = self
            .config
            .zrtp_versions
            .iter()
            .map(|version| ZrtpHash { version: version.clone(), value: random_hex(64) })
            .collect();
        description.encryption = Some(EncryptionAdvertisement::Zrtp(local_hashes.clone()));
        self.controls.install(
            media_type,
            SrtpControl::new(SrtpControlType::Zrtp, ControlDetail::Zrtp { local_hashes, received: None }),
        );
        true
    }

    fn answer_dtls(&mut self, media_type: MediaType, local: &mut JingleContent, remote: &JingleContent) -> bool {
        let Some(identity) = &self.config.dtls_identity else { return false };
        let Some(remote_fingerprint) = remote.transport.as_ref().and_then(|t| t.fingerprint.clone()) else {
            return false;
        };
        let local_fingerprint = DtlsFingerprint {
            hash: identity.hash.clone(),
            fingerprint: identity.fingerprint.clone(),
            // Answerer takes the active role and initiates the handshake.
            setup: DtlsSetup::Active,
        };
        let transport = local
            .transport
            .get_or_insert_with(|| TransportDescription::new(TransportType::IceUdp));
        transport.fingerprint = Some(local_fingerprint.clone());
        self.controls.install(
            media_type,
            SrtpControl::new(
                SrtpControlType::DtlsSrtp,
                ControlDetail::Dtls { local_fingerprint, remote_fingerprints: vec![remote_fingerprint] },
            ),
        );
        true
    }

    fn answer_sdes(
        &mut self,
        media_type: MediaType,
        local: &mut JingleContent,
        remote: &JingleContent,
        as_initiator: bool,
    ) -> bool {
        let Some(remote_desc) = remote.description.as_ref() else { return false };
        let Some(EncryptionAdvertisement::Sdes(peer_cryptos)) = &remote_desc.encryption else {
            return false;
        };
        let Some(selected) = select_sdes_suite(&self.config.sdes_cipher_suites, peer_cryptos, as_initiator)
        else {
            warn!("Received unsupported SDES crypto attributes for {}", media_type);
            return false;
        };
        // Answer with our own key material on the agreed suite, echoing the
        // peer's tag so the lines correlate.
        let mut our_crypto = generate_sdes_crypto(selected.tag, &selected.crypto_suite);
        our_crypto.session_params = selected.session_params.clone();
        if let Some(description) = local.description.as_mut() {
            description.encryption = Some(EncryptionAdvertisement::Sdes(vec![our_crypto.clone()]));
        }
        self.controls.install(
            media_type,
            SrtpControl::new(
                SrtpControlType::Sdes,
                ControlDetail::Sdes { local_cryptos: vec![our_crypto], selected: Some(selected) },
            ),
        );
        true
    }

    fn answer_zrtp(&mut self, media_type: MediaType, local: &mut JingleContent, remote: &JingleContent) -> bool {
        if self.config.zrtp_versions.is_empty() {
            return false;
        }
        let Some(remote_desc) = remote.description.as_ref() else { return false };
        let Some(EncryptionAdvertisement::Zrtp(remote_hashes)) = &remote_desc.encryption else {
            return false;
        };
        let received = remote_hashes.first().cloned();
        let local_hashes: Vec<ZrtpHash> = self
            .config
            .zrtp_versions
            .iter()
            .map(|version| ZrtpHash { version: version.clone(), value: random_hex(64) })
            .collect();
        if let Some(description) = local.description.as_mut() {
            description.encryption = Some(EncryptionAdvertisement::Zrtp(local_hashes.clone()));
        }
        self.controls.install(
            media_type,
            SrtpControl::new(SrtpControlType::Zrtp, ControlDetail::Zrtp { local_hashes, received }),
        );
        true
    }
}

/// Deterministic first-match SDES suite selection. The iteration order
/// differs by role so that both sides converge: the initiator walks its own
/// preference list, the responder walks the peer's offered list.
pub fn select_sdes_suite(
    enabled_suites: &[String],
    peer_cryptos: &[SdesCrypto],
    as_initiator: bool,
) -> Option<SdesCrypto> {
    if as_initiator {
        enabled_suites.iter().find_map(|suite| {
            peer_cryptos.iter().find(|c| &c.crypto_suite == suite).cloned()
        })
    } else {
        peer_cryptos
            .iter()
            .find(|c| enabled_suites.contains(&c.crypto_suite))
            .cloned()
    }
}

/// Builds one SDES crypto line with fresh random key material
/// (RFC 4568: 16-byte master key + 14-byte salt, base64-encoded inline).
fn generate_sdes_crypto(tag: u32, suite: &str) -> SdesCrypto {
    let mut key_salt = [0u8; 30];
    rand::thread_rng().fill(&mut key_salt[..]);
    let encoded = base64::engine::general_purpose::STANDARD.encode(key_salt);
    SdesCrypto {
        tag,
        crypto_suite: suite.to_string(),
        key_params: format!("inline:{encoded}"),
        session_params: None,
    }
}

fn random_hex(len: usize) -> String {
    const HEX: &[u8] = b"0123456789abcdef";
    let mut rng = rand::thread_rng();
    (0..len).map(|_| HEX[rng.gen_range(0..16)] as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rjabber_jingle_core::{Creator, RtpDescription};

    fn content_with_description(media: MediaType) -> JingleContent {
        let mut content = JingleContent::new(media.as_str(), Creator::Initiator);
        content.description = Some(RtpDescription::new(media));
        content
    }

    fn config(order: Vec<SrtpControlType>) -> Arc<EncryptionConfig> {
        Arc::new(EncryptionConfig {
            protocol_order: order,
            dtls_identity: Some(DtlsIdentity {
                hash: "sha-256".into(),
                fingerprint: "AB:CD:EF".into(),
            }),
            ..EncryptionConfig::default()
        })
    }

    #[test]
    fn selecting_new_protocol_tears_down_previous_exactly_once() {
        let mut selector =
            EncryptionSelector::new(config(vec![SrtpControlType::Sdes, SrtpControlType::Zrtp]));
        let mut offer = content_with_description(MediaType::Audio);
        selector.select_for_offer(MediaType::Audio, &mut offer, false);
        assert_eq!(
            selector.controls().active(MediaType::Audio).unwrap().control_type(),
            SrtpControlType::Sdes
        );

        // Renegotiation picks ZRTP: the SDES control must be retired.
        let mut remote = content_with_description(MediaType::Audio);
        remote.description.as_mut().unwrap().encryption = Some(EncryptionAdvertisement::Zrtp(vec![
            ZrtpHash { version: "1.10".into(), value: "ff".repeat(32) },
        ]));
        let mut local = content_with_description(MediaType::Audio);
        // Reuse the same selector with a ZRTP-only remote: SDES won't match.
        let chosen = selector
            .select_for_answer(MediaType::Audio, &mut local, &remote, false, false)
            .unwrap();
        assert_eq!(chosen, Some(SrtpControlType::Zrtp));

        let active = selector.controls().active(MediaType::Audio).unwrap();
        assert_eq!(active.control_type(), SrtpControlType::Zrtp);
        assert!(!active.is_torn_down());

        let retired = selector.controls().retired();
        assert_eq!(retired.len(), 1);
        assert_eq!(retired[0].control_type(), SrtpControlType::Sdes);
        assert!(retired[0].is_torn_down());
        assert_eq!(retired[0].cleanup_invocations(), 1);
    }

    #[test]
    fn disappeared_protocol_is_torn_down_without_replacement() {
        let mut selector = EncryptionSelector::new(config(vec![SrtpControlType::Sdes]));
        let mut offer = content_with_description(MediaType::Video);
        selector.select_for_offer(MediaType::Video, &mut offer, false);

        // The renegotiated remote content carries no encryption at all.
        let remote = content_with_description(MediaType::Video);
        let mut local = content_with_description(MediaType::Video);
        let chosen = selector
            .select_for_answer(MediaType::Video, &mut local, &remote, false, false)
            .unwrap();
        assert_eq!(chosen, None);
        assert!(selector.controls().active(MediaType::Video).is_none());
        assert_eq!(selector.controls().retired().len(), 1);
    }

    #[test]
    fn required_encryption_with_no_match_is_an_error() {
        let mut cfg = EncryptionConfig::default();
        cfg.required = true;
        cfg.protocol_order = vec![SrtpControlType::Sdes];
        let mut selector = EncryptionSelector::new(Arc::new(cfg));

        let remote = content_with_description(MediaType::Audio);
        let mut local = content_with_description(MediaType::Audio);
        let result = selector.select_for_answer(MediaType::Audio, &mut local, &remote, false, false);
        assert!(matches!(result, Err(MediaError::SecurityNegotiation { .. })));
    }

    #[test]
    fn relay_focus_skips_all_advertisements() {
        let mut selector = EncryptionSelector::new(config(vec![
            SrtpControlType::DtlsSrtp,
            SrtpControlType::Sdes,
        ]));
        let mut offer = content_with_description(MediaType::Audio);
        selector.select_for_offer(MediaType::Audio, &mut offer, true);
        assert!(offer.description.as_ref().unwrap().encryption.is_none());
        assert!(offer.transport.is_none());
        assert!(selector.controls().active(MediaType::Audio).is_none());
    }

    #[test]
    fn sdes_selection_is_symmetric_but_role_ordered() {
        let enabled = vec!["AES_CM_128_HMAC_SHA1_80".to_string(), "AES_CM_128_HMAC_SHA1_32".to_string()];
        let peer = vec![
            generate_sdes_crypto(1, "AES_CM_128_HMAC_SHA1_32"),
            generate_sdes_crypto(2, "AES_CM_128_HMAC_SHA1_80"),
        ];

        // Initiator walks its own preference order: picks SHA1_80.
        let initiator_pick = select_sdes_suite(&enabled, &peer, true).unwrap();
        assert_eq!(initiator_pick.crypto_suite, "AES_CM_128_HMAC_SHA1_80");

        // Responder walks the peer's offered order: picks SHA1_32.
        let responder_pick = select_sdes_suite(&enabled, &peer, false).unwrap();
        assert_eq!(responder_pick.crypto_suite, "AES_CM_128_HMAC_SHA1_32");

        // Either way the pick is supported by both sides.
        for pick in [initiator_pick, responder_pick] {
            assert!(enabled.contains(&pick.crypto_suite));
            assert!(peer.iter().any(|c| c.crypto_suite == pick.crypto_suite));
        }
    }

    #[test]
    fn zrtp_answer_captures_remote_hash() {
        let mut cfg = EncryptionConfig::default();
        cfg.protocol_order = vec![SrtpControlType::Zrtp];
        let mut selector = EncryptionSelector::new(Arc::new(cfg));

        let mut remote = content_with_description(MediaType::Audio);
        remote.description.as_mut().unwrap().encryption = Some(EncryptionAdvertisement::Zrtp(vec![
            ZrtpHash { version: "1.10".into(), value: "aa".repeat(32) },
        ]));
        let mut local = content_with_description(MediaType::Audio);
        selector
            .select_for_answer(MediaType::Audio, &mut local, &remote, false, false)
            .unwrap();

        let control = selector.controls().active(MediaType::Audio).unwrap();
        match control.detail() {
            ControlDetail::Zrtp { received, .. } => {
                assert_eq!(received.as_ref().unwrap().value, "aa".repeat(32));
            }
            other => panic!("expected ZRTP control, got {other:?}"),
        }
    }
}
