//! Stanza transport collaborator contract
//!
//! The XMPP connection lives outside this workspace; the call-peer state
//! machine emits every outbound Jingle IQ through this seam.

use async_trait::async_trait;
use rjabber_jingle_core::JingleIq;

use crate::error::SessionResult;

/// The XMPP layer's send half.
#[async_trait]
pub trait StanzaSender: Send + Sync {
    async fn send(&self, iq: JingleIq) -> SessionResult<()>;
}
