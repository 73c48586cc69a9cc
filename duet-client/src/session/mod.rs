mod call_event;
mod call_session;
mod call_session_handle;
mod call_state;
mod session_command;

pub use call_event::*;
pub use call_session::*;
pub use call_session_handle::*;
pub use call_state::*;
pub use session_command::*;
