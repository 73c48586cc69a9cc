use duet_core::ConnectionId;
use std::collections::HashMap;

/// Two-way map between live connections and the identity each one declared
/// when it joined a room. Holds no business rules of its own.
#[derive(Debug, Default)]
pub struct ConnectionDirectory {
    identities: HashMap<ConnectionId, String>,
    connections: HashMap<String, ConnectionId>,
}

impl ConnectionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts the identity of `connection_id`.
    ///
    /// Returns the other connection the identity was bound to before, if
    /// any. The latest registration wins the reverse lookup.
    pub fn register(
        &mut self,
        connection_id: ConnectionId,
        identity: impl Into<String>,
    ) -> Option<ConnectionId> {
        let identity = identity.into();

        if let Some(old) = self.identities.insert(connection_id, identity.clone()) {
            if old != identity && self.connections.get(&old) == Some(&connection_id) {
                self.connections.remove(&old);
            }
        }

        self.connections
            .insert(identity, connection_id)
            .filter(|previous| *previous != connection_id)
    }

    pub fn identity_of(&self, connection_id: &ConnectionId) -> Option<&str> {
        self.identities.get(connection_id).map(String::as_str)
    }

    pub fn connection_for(&self, identity: &str) -> Option<ConnectionId> {
        self.connections.get(identity).copied()
    }

    /// Forgets the connection. Removing an unknown id is a no-op.
    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<String> {
        let identity = self.identities.remove(connection_id)?;
        if self.connections.get(&identity) == Some(connection_id) {
            self.connections.remove(&identity);
        }
        Some(identity)
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}
