mod hub_command;
mod signaling_hub;

pub use hub_command::*;
pub use signaling_hub::*;
