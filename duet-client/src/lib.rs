pub mod capability;
mod config;
mod error;
pub mod negotiation;
pub mod rtc;
pub mod session;
pub mod transport;

pub use config::*;
pub use error::*;
pub use session::{
    CallEvent, CallSession, CallSessionHandle, CallState, EndReason, InviteSummary,
    SessionCommand, SessionSnapshot,
};
pub use transport::{WsSignaling, connect_session};
