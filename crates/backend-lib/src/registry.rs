// ============================
// chat-backend-lib/src/registry.rs
// ============================
//! Static room catalog. Rooms are fixed at process start; the hello event
//! reproduces them in insertion order.

use chat_common::Room;

/// Rooms are static for now.
const DEFAULT_ROOMS: [(&str, &str); 4] = [
    ("beast", "Boost.Beast"),
    ("async", "Boost.Async"),
    ("db", "Database connectors"),
    ("wasm", "Web assembly"),
];

/// Fixed, process-wide room catalog. Immutable, so no locking.
pub struct RoomRegistry {
    rooms: Vec<Room>,
}

impl RoomRegistry {
    pub fn new(rooms: Vec<Room>) -> Self {
        Self { rooms }
    }

    /// Rooms in catalog order.
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.iter().any(|r| r.id == room_id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(
            DEFAULT_ROOMS
                .iter()
                .map(|(id, name)| Room {
                    id: (*id).to_string(),
                    name: (*name).to_string(),
                })
                .collect(),
        )
    }
}
