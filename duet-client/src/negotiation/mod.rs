mod attempt;
mod context_event_sink;
mod generation;
mod negotiation_manager;

pub use attempt::*;
pub use context_event_sink::*;
pub use generation::*;
pub use negotiation_manager::*;
