pub mod session_helpers;

pub use memory_relay::*;
pub use mock_media::*;
pub use mock_negotiation::*;
pub use session_helpers::*;
