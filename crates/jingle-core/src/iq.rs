//! The Jingle IQ envelope
//!
//! [`JingleIq`] is the in-memory form of one `<jingle/>` IQ-set: action, SID,
//! addressing, content list and the optional terminate reason. Outbound IQs
//! are built through [`crate::factory`].

use serde::{Deserialize, Serialize};

use crate::action::{JingleAction, Reason, SessionInfoType};
use crate::content::JingleContent;
use crate::jid::Jid;

/// A Jingle session identifier, stable for the lifetime of one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generates a fresh random SID for a locally initiated session.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The `<reason/>` element of a session-terminate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminateReason {
    pub reason: Reason,
    /// Human-readable text surfaced to the remote user
    pub text: Option<String>,
}

/// XEP-0251 session-transfer payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferInfo {
    /// Transferor (attendant) address
    pub from: Option<Jid>,
    /// Transfer target address
    pub to: Option<Jid>,
    /// SID of the attendant's session with the target, present for
    /// attended transfer, absent for unattended
    pub sid: Option<SessionId>,
}

/// One Jingle IQ-set, inbound or outbound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JingleIq {
    pub action: JingleAction,
    pub sid: SessionId,
    pub from: Jid,
    pub to: Jid,
    /// The session initiator as asserted on session-initiate
    pub initiator: Option<Jid>,
    /// The responder as asserted on session-accept
    pub responder: Option<Jid>,
    pub contents: Vec<JingleContent>,
    /// Present on session-info actions
    pub session_info: Option<SessionInfoType>,
    /// Present on session-terminate
    pub reason: Option<TerminateReason>,
    /// Present on session-info carrying a XEP-0251 transfer
    pub transfer: Option<TransferInfo>,
    /// Whether the sender asserts it is a conference focus (COIN isfocus)
    pub conference_focus: bool,
}

impl JingleIq {
    pub fn new(action: JingleAction, sid: SessionId, from: Jid, to: Jid) -> Self {
        Self {
            action,
            sid,
            from,
            to,
            initiator: None,
            responder: None,
            contents: Vec::new(),
            session_info: None,
            reason: None,
            transfer: None,
            conference_focus: false,
        }
    }

    pub fn with_contents(mut self, contents: Vec<JingleContent>) -> Self {
        self.contents = contents;
        self
    }

    /// Looks up a content by its stable name.
    pub fn content(&self, name: &str) -> Option<&JingleContent> {
        self.contents.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iq_survives_serde() {
        let mut iq = JingleIq::new(
            JingleAction::SessionTerminate,
            SessionId::from("a73sjjvkla37jfea"),
            "romeo@montague.lit/orchard".parse().unwrap(),
            "juliet@capulet.lit/balcony".parse().unwrap(),
        );
        iq.reason = Some(TerminateReason { reason: Reason::Decline, text: None });

        let json = serde_json::to_string(&iq).unwrap();
        let back: JingleIq = serde_json::from_str(&json).unwrap();
        assert_eq!(back, iq);
    }
}
