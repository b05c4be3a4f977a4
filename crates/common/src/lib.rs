// ================
// common/src/lib.rs
// ================
//! Business types shared between the chat server crates:
//! users, rooms, messages and the composite message ID that orders
//! a room's log.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// An application user.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// User ID
    pub id: String,
    /// Username
    pub username: String,
}

/// A chat room catalog entry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Room {
    /// Room ID
    pub id: String,
    /// User-facing room name
    pub name: String,
}

/// Composite ordinal identifying a message within a room's log.
///
/// Rendered on the wire as `"<epoch_ms>-<seq>"`. The total order is numeric
/// on both components; the textual form must never be compared lexically,
/// since digit widths differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId {
    /// Milliseconds since the UNIX epoch at append time
    pub epoch_ms: i64,
    /// Disambiguates appends within the same millisecond
    pub seq: u64,
}

impl MessageId {
    pub const fn new(epoch_ms: i64, seq: u64) -> Self {
        Self { epoch_ms, seq }
    }

    /// The id a same-millisecond successor would get.
    pub fn successor(&self) -> Self {
        Self {
            epoch_ms: self.epoch_ms,
            seq: self.seq + 1,
        }
    }
}

impl Ord for MessageId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch_ms
            .cmp(&other.epoch_ms)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for MessageId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.epoch_ms, self.seq)
    }
}

/// Error parsing a [`MessageId`] from its textual form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid message id: {0:?}")]
pub struct ParseMessageIdError(pub String);

impl FromStr for MessageId {
    type Err = ParseMessageIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ms, seq) = s
            .split_once('-')
            .ok_or_else(|| ParseMessageIdError(s.to_string()))?;
        let epoch_ms = ms
            .parse::<i64>()
            .map_err(|_| ParseMessageIdError(s.to_string()))?;
        let seq = seq
            .parse::<u64>()
            .map_err(|_| ParseMessageIdError(s.to_string()))?;
        Ok(Self { epoch_ms, seq })
    }
}

// Wire representation is the textual form.
impl Serialize for MessageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A chat message, immutable once appended to a room's log.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Server-assigned composite id
    pub id: MessageId,
    /// UTC milliseconds since epoch when the server accepted the message
    pub timestamp: i64,
    /// Message body
    pub content: String,
    /// The author
    pub user: User,
}

/// A bounded read view over a room's log, newest first.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBatch {
    /// Messages in descending id order
    pub messages: Vec<Message>,
    /// true if older messages exist beyond this batch
    pub has_more: bool,
}
