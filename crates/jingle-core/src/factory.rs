//! Outbound Jingle IQ construction
//!
//! Free functions mirroring the action vocabulary, one per outbound message
//! the call-peer state machine emits. Keeping construction here keeps the
//! state machine free of element-assembly details.

use crate::action::{JingleAction, Reason, SessionInfoType};
use crate::content::JingleContent;
use crate::iq::{JingleIq, SessionId, TerminateReason, TransferInfo};
use crate::jid::Jid;

pub fn session_initiate(from: Jid, to: Jid, sid: SessionId, contents: Vec<JingleContent>) -> JingleIq {
    let mut iq = JingleIq::new(JingleAction::SessionInitiate, sid, from.clone(), to);
    iq.initiator = Some(from);
    iq.contents = contents;
    iq
}

pub fn session_accept(from: Jid, to: Jid, sid: SessionId, contents: Vec<JingleContent>) -> JingleIq {
    let mut iq = JingleIq::new(JingleAction::SessionAccept, sid, from.clone(), to);
    iq.responder = Some(from);
    iq.contents = contents;
    iq
}

pub fn session_info(from: Jid, to: Jid, sid: SessionId, info: SessionInfoType) -> JingleIq {
    let mut iq = JingleIq::new(JingleAction::SessionInfo, sid, from, to);
    iq.session_info = Some(info);
    iq
}

/// A session-info carrying a XEP-0251 transfer element.
pub fn session_transfer(from: Jid, to: Jid, sid: SessionId, transfer: TransferInfo) -> JingleIq {
    let mut iq = JingleIq::new(JingleAction::SessionInfo, sid, from, to);
    iq.transfer = Some(transfer);
    iq
}

pub fn ringing(from: Jid, to: Jid, sid: SessionId) -> JingleIq {
    session_info(from, to, sid, SessionInfoType::Ringing)
}

fn terminate(from: Jid, to: Jid, sid: SessionId, reason: Reason, text: Option<String>) -> JingleIq {
    let mut iq = JingleIq::new(JingleAction::SessionTerminate, sid, from, to);
    iq.reason = Some(TerminateReason { reason, text });
    iq
}

/// Terminate an established session (success reason).
pub fn bye(from: Jid, to: Jid, sid: SessionId, text: Option<String>) -> JingleIq {
    terminate(from, to, sid, Reason::Success, text)
}

/// Terminate a session that never connected (cancel reason).
pub fn cancel(from: Jid, to: Jid, sid: SessionId) -> JingleIq {
    terminate(from, to, sid, Reason::Cancel, Some("Oops!".into()))
}

/// Decline an incoming session because we are busy.
pub fn busy(from: Jid, to: Jid, sid: SessionId) -> JingleIq {
    terminate(from, to, sid, Reason::Busy, None)
}

/// Terminate with an error condition and a descriptive text.
pub fn error_terminate(from: Jid, to: Jid, sid: SessionId, reason: Reason, text: impl Into<String>) -> JingleIq {
    terminate(from, to, sid, reason, Some(text.into()))
}

pub fn content_add(from: Jid, to: Jid, sid: SessionId, contents: Vec<JingleContent>) -> JingleIq {
    JingleIq::new(JingleAction::ContentAdd, sid, from, to).with_contents(contents)
}

pub fn content_accept(from: Jid, to: Jid, sid: SessionId, contents: Vec<JingleContent>) -> JingleIq {
    JingleIq::new(JingleAction::ContentAccept, sid, from, to).with_contents(contents)
}

pub fn content_modify(from: Jid, to: Jid, sid: SessionId, content: JingleContent) -> JingleIq {
    JingleIq::new(JingleAction::ContentModify, sid, from, to).with_contents(vec![content])
}

pub fn content_reject(from: Jid, to: Jid, sid: SessionId, contents: Vec<JingleContent>) -> JingleIq {
    JingleIq::new(JingleAction::ContentReject, sid, from, to).with_contents(contents)
}

pub fn content_remove(from: Jid, to: Jid, sid: SessionId, contents: Vec<JingleContent>) -> JingleIq {
    JingleIq::new(JingleAction::ContentRemove, sid, from, to).with_contents(contents)
}

pub fn transport_info(from: Jid, to: Jid, sid: SessionId, contents: Vec<JingleContent>) -> JingleIq {
    JingleIq::new(JingleAction::TransportInfo, sid, from, to).with_contents(contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jids() -> (Jid, Jid) {
        ("romeo@montague.lit/orchard".parse().unwrap(), "juliet@capulet.lit/balcony".parse().unwrap())
    }

    #[test]
    fn session_initiate_asserts_initiator() {
        let (from, to) = jids();
        let iq = session_initiate(from.clone(), to, SessionId::generate(), vec![]);
        assert_eq!(iq.action, JingleAction::SessionInitiate);
        assert_eq!(iq.initiator, Some(from));
    }

    #[test]
    fn terminate_variants_carry_expected_reasons() {
        let (from, to) = jids();
        let sid = SessionId::from("sid1");
        assert_eq!(bye(from.clone(), to.clone(), sid.clone(), None).reason.unwrap().reason, Reason::Success);
        assert_eq!(busy(from.clone(), to.clone(), sid.clone()).reason.unwrap().reason, Reason::Busy);
        assert_eq!(cancel(from, to, sid).reason.unwrap().reason, Reason::Cancel);
    }
}
