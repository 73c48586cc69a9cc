/// Public STUN server used when no ICE servers are configured.
pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";

/// Port the signaling server listens on unless configured otherwise.
pub const DEFAULT_SIGNALING_PORT: u16 = 8000;
