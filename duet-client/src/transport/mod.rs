mod ws_signaling;

pub use ws_signaling::*;
