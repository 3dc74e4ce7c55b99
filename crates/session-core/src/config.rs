//! Account-level configuration
//!
//! Immutable tables built once at account setup and shared by reference into
//! every session. Nothing here mutates at runtime.

use std::sync::Arc;

use rjabber_media_core::encryption::EncryptionConfig;

/// Presence show values in descending priority, used when choosing which of
/// a contact's resources to ring.
const PRESENCE_PRIORITIES: [(&str, i8); 5] = [
    ("chat", 50),
    ("available", 40),
    ("away", 30),
    ("xa", 20),
    ("dnd", 10),
];

#[derive(Debug, Clone)]
pub struct AccountConfig {
    pub encryption: Arc<EncryptionConfig>,
    pub rtcp_mux: bool,
    /// Delay before retrying a content-add that arrived without candidates
    pub content_add_retry_delay_ms: u64,
    /// Bound on waiting for session-initiate processing before applying
    /// transport-info
    pub initiate_gate_wait_ms: u64,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            encryption: Arc::new(EncryptionConfig::default()),
            rtcp_mux: true,
            content_add_retry_delay_ms: 500,
            initiate_gate_wait_ms: 1000,
        }
    }
}

impl AccountConfig {
    /// Priority assigned to a presence show value; unknown values rank last.
    pub fn presence_priority(status: &str) -> i8 {
        PRESENCE_PRIORITIES
            .iter()
            .find(|(name, _)| *name == status)
            .map(|(_, priority)| *priority)
            .unwrap_or(0)
    }

    /// Picks the resource to address among a contact's online resources.
    /// Highest presence priority wins; equal priorities fall back to a
    /// deterministic (but otherwise arbitrary) resource-name comparison.
    pub fn preferred_resource<'a>(candidates: &[(&'a str, &str)]) -> Option<&'a str> {
        candidates
            .iter()
            .max_by(|(res_a, status_a), (res_b, status_b)| {
                Self::presence_priority(status_a)
                    .cmp(&Self::presence_priority(status_b))
                    .then_with(|| res_a.cmp(res_b))
            })
            .map(|(resource, _)| *resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_presence_priority_wins() {
        let picked = AccountConfig::preferred_resource(&[("phone", "dnd"), ("desk", "chat")]);
        assert_eq!(picked, Some("desk"));
    }

    #[test]
    fn equal_priority_falls_back_to_resource_name() {
        let picked = AccountConfig::preferred_resource(&[("alpha", "away"), ("beta", "away")]);
        // Deterministic tie-break, not a meaningful ordering.
        assert_eq!(picked, Some("beta"));
    }

    #[test]
    fn unknown_show_ranks_last() {
        let picked = AccountConfig::preferred_resource(&[("a", "weird"), ("b", "dnd")]);
        assert_eq!(picked, Some("b"));
    }
}
