use duet_core::{ConnectionId, RoomId};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("room '{0}' is full")]
pub struct RoomFull(pub RoomId);

/// Result of a successful [`RoomRegistry::join`].
#[derive(Debug, PartialEq, Eq)]
pub struct Joined {
    /// Members other than the joiner, in join order.
    pub existing: Vec<ConnectionId>,
    /// False when the connection was already a member of the room.
    pub newly_joined: bool,
    /// Room the connection was moved out of, if it was elsewhere.
    pub previous_room: Option<RoomId>,
}

/// Room name to ordered member list. A connection sits in at most one room.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomId, Vec<ConnectionId>>,
    membership: HashMap<ConnectionId, RoomId>,
    capacity: Option<usize>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose rooms refuse joins beyond `capacity` members.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn join(&mut self, room: &RoomId, connection_id: ConnectionId) -> Result<Joined, RoomFull> {
        if self.membership.get(&connection_id) == Some(room) {
            return Ok(Joined {
                existing: self.others(room, &connection_id),
                newly_joined: false,
                previous_room: None,
            });
        }

        if let Some(capacity) = self.capacity {
            if self.members(room).len() >= capacity {
                return Err(RoomFull(room.clone()));
            }
        }

        let previous_room = self.remove(&connection_id);
        let existing = self.members(room).to_vec();

        self.rooms
            .entry(room.clone())
            .or_default()
            .push(connection_id);
        self.membership.insert(connection_id, room.clone());

        Ok(Joined {
            existing,
            newly_joined: true,
            previous_room,
        })
    }

    /// Takes the connection out of its room. Empty rooms disappear.
    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<RoomId> {
        let room = self.membership.remove(connection_id)?;

        if let Some(members) = self.rooms.get_mut(&room) {
            members.retain(|member| member != connection_id);
            if members.is_empty() {
                self.rooms.remove(&room);
            }
        }

        Some(room)
    }

    pub fn members(&self, room: &RoomId) -> &[ConnectionId] {
        self.rooms.get(room).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn others(&self, room: &RoomId, connection_id: &ConnectionId) -> Vec<ConnectionId> {
        self.members(room)
            .iter()
            .filter(|member| *member != connection_id)
            .copied()
            .collect()
    }

    pub fn room_of(&self, connection_id: &ConnectionId) -> Option<&RoomId> {
        self.membership.get(connection_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
