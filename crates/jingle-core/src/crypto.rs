//! Encryption advertisements carried in Jingle contents
//!
//! Three key-exchange families compete for a media line: DTLS-SRTP
//! fingerprints (XEP-0320, carried on the *transport* element), SDES crypto
//! lines (XEP-0167 `<crypto/>`, RFC 4568), and ZRTP hello-hashes
//! (`<zrtp-hash/>`). A description advertises at most one family at a time;
//! selection among them is the job of the encryption selector in media-core.

use serde::{Deserialize, Serialize};

/// DTLS role negotiation value (RFC 4145 `setup` attribute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DtlsSetup {
    /// Offerer: willing to take either role
    Actpass,
    /// Answerer: will initiate the DTLS handshake
    Active,
    /// Answerer: will wait for the peer to initiate
    Passive,
}

impl DtlsSetup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Actpass => "actpass",
            Self::Active => "active",
            Self::Passive => "passive",
        }
    }
}

/// A `<fingerprint/>` element on an ICE transport (XEP-0320).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DtlsFingerprint {
    /// Hash function name, e.g. "sha-256"
    pub hash: String,
    /// Uppercase colon-separated fingerprint of the certificate
    pub fingerprint: String,
    pub setup: DtlsSetup,
}

/// One SDES crypto line (RFC 4568).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdesCrypto {
    /// Tag correlating offer and answer lines
    pub tag: u32,
    /// Crypto suite name, e.g. "AES_CM_128_HMAC_SHA1_80"
    pub crypto_suite: String,
    /// `inline:` key parameters, base64 master key and salt
    pub key_params: String,
    /// Optional session parameters
    pub session_params: Option<String>,
}

/// A ZRTP hello-hash advertisement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZrtpHash {
    /// ZRTP protocol version, e.g. "1.10"
    pub version: String,
    /// Hex SHA-256 hash of the Hello message
    pub value: String,
}

/// The `<encryption/>` child of an RTP description.
///
/// DTLS-SRTP is transport-level and therefore not representable here; it
/// lives on [`crate::transport::TransportDescription::fingerprint`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionAdvertisement {
    /// SDES crypto lines, ordered by the sender's preference
    Sdes(Vec<SdesCrypto>),
    /// ZRTP hello-hashes, one per supported protocol version
    Zrtp(Vec<ZrtpHash>),
}

impl EncryptionAdvertisement {
    pub fn sdes_cryptos(&self) -> &[SdesCrypto] {
        match self {
            Self::Sdes(cryptos) => cryptos,
            Self::Zrtp(_) => &[],
        }
    }

    pub fn zrtp_hashes(&self) -> &[ZrtpHash] {
        match self {
            Self::Zrtp(hashes) => hashes,
            Self::Sdes(_) => &[],
        }
    }
}
