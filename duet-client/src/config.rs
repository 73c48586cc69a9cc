use crate::capability::MediaConstraints;
use duet_core::IceServerConfig;
use std::time::Duration;

/// Capacity of the user command queue of a session.
pub const DEFAULT_COMMAND_BUFFER: usize = 32;

/// Candidates kept from connections that have not sent an offer yet.
pub const DEFAULT_EARLY_CANDIDATE_LIMIT: usize = 64;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// ICE servers for new negotiation contexts. When empty, the list the
    /// server advertises in its welcome frame is used.
    pub ice_servers: Vec<IceServerConfig>,
    pub media: MediaConstraints,
    /// Give up on `calling`/`incoming` after this long. `None` waits forever.
    pub call_timeout: Option<Duration>,
    pub command_buffer: usize,
    pub early_candidate_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ice_servers: Vec::new(),
            media: MediaConstraints::default(),
            call_timeout: None,
            command_buffer: DEFAULT_COMMAND_BUFFER,
            early_candidate_limit: DEFAULT_EARLY_CANDIDATE_LIMIT,
        }
    }
}

impl SessionConfig {
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn with_ice_servers(mut self, ice_servers: Vec<IceServerConfig>) -> Self {
        self.ice_servers = ice_servers;
        self
    }
}
