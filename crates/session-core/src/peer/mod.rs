//! Call-peer state machine and lifecycle states

pub mod session;
pub mod state;

pub use session::CallPeerSession;
pub use state::{CallPeerState, HoldState};
