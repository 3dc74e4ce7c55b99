//! XMPP address (JID) handling
//!
//! Only the pieces of RFC 7622 the signaling core needs: splitting a full
//! JID into bare and resource parts and comparing addresses. Stringprep and
//! escaping are left to the XMPP transport layer.

use serde::{Deserialize, Serialize};

use crate::error::{JingleError, JingleResult};

/// A full or bare XMPP address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Jid(String);

impl Jid {
    /// Parses a JID, requiring at least a non-empty domain part.
    pub fn new(value: impl Into<String>) -> JingleResult<Self> {
        let value = value.into();
        let domain = match value.split_once('@') {
            Some((local, rest)) if local.is_empty() => {
                return Err(JingleError::invalid_jid(rest));
            }
            Some((_, rest)) => rest,
            None => value.as_str(),
        };
        let domain = domain.split('/').next().unwrap_or_default();
        if domain.is_empty() {
            return Err(JingleError::invalid_jid(value));
        }
        Ok(Self(value))
    }

    /// Returns the address without its resource part.
    pub fn bare(&self) -> Jid {
        match self.0.split_once('/') {
            Some((bare, _)) => Jid(bare.to_string()),
            None => self.clone(),
        }
    }

    /// Returns the resource part, if any.
    pub fn resource(&self) -> Option<&str> {
        self.0.split_once('/').map(|(_, r)| r)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Jid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Jid {
    type Err = JingleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Jid::new(s)
    }
}
