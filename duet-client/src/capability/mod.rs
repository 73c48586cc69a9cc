mod media;
mod negotiation_context;
mod signaling_output;

pub use media::*;
pub use negotiation_context::*;
pub use signaling_output::*;
