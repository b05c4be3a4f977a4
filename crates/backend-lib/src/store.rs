// ============================
// chat-backend-lib/src/store.rs
// ============================
//! Message log store: durable, per-room, append-only message sequences with
//! strictly increasing composite IDs. The store is the single authority for
//! ID assignment; per-room locks serialize appends while leaving cross-room
//! traffic uncontended.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chat_common::{Message, MessageBatch, MessageId, User};
use chrono::Utc;
use dashmap::DashMap;
use tokio::{fs as tokio_fs, io::AsyncWriteExt};

use crate::error::ChatError;

/// Trait for message log backends
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Durably append a batch of messages to a room's log, assigning IDs and
    /// timestamps. All-or-nothing: on error no message of the batch is
    /// appended and no ID is consumed.
    async fn append_batch(
        &self,
        room_id: &str,
        user: &User,
        contents: Vec<String>,
    ) -> Result<Vec<Message>, ChatError>;

    /// Append a single message.
    async fn append(
        &self,
        room_id: &str,
        user: &User,
        content: String,
    ) -> Result<Message, ChatError> {
        let mut batch = self.append_batch(room_id, user, vec![content]).await?;
        // append_batch returns exactly one message per content item
        Ok(batch.pop().unwrap())
    }

    /// Up to `limit` most-recent messages, newest first.
    async fn recent(&self, room_id: &str, limit: usize) -> Result<MessageBatch, ChatError>;

    /// Messages strictly older than `before`, newest first. Used for history
    /// paging.
    async fn history_before(
        &self,
        room_id: &str,
        before: MessageId,
        limit: usize,
    ) -> Result<MessageBatch, ChatError>;
}

/// ID for the next append: a fresh millisecond gets sequence 0; an append
/// within the same millisecond (or after a clock regression) continues the
/// previous ID's sequence, keeping the order strictly increasing.
fn next_id(last: Option<MessageId>, now_ms: i64) -> MessageId {
    match last {
        Some(prev) if now_ms <= prev.epoch_ms => prev.successor(),
        _ => MessageId::new(now_ms, 0),
    }
}

/// In-memory ordered log for a single room. Kept in append order, so the
/// newest message is last.
#[derive(Default)]
struct RoomLog {
    messages: Vec<Message>,
}

impl RoomLog {
    fn last_id(&self) -> Option<MessageId> {
        self.messages.last().map(|m| m.id)
    }

    /// Stamp a batch with IDs and timestamps without committing it.
    fn stamp_batch(&self, user: &User, contents: Vec<String>, now_ms: i64) -> Vec<Message> {
        let mut last = self.last_id();
        contents
            .into_iter()
            .map(|content| {
                let id = next_id(last, now_ms);
                last = Some(id);
                Message {
                    id,
                    timestamp: now_ms,
                    content,
                    user: user.clone(),
                }
            })
            .collect()
    }

    fn commit(&mut self, batch: &[Message]) {
        self.messages.extend_from_slice(batch);
    }

    fn recent(&self, limit: usize) -> MessageBatch {
        MessageBatch {
            messages: self.messages.iter().rev().take(limit).cloned().collect(),
            has_more: self.messages.len() > limit,
        }
    }

    fn before(&self, before: MessageId, limit: usize) -> MessageBatch {
        // messages is sorted ascending by id
        let end = self.messages.partition_point(|m| m.id < before);
        let start = end.saturating_sub(limit);
        MessageBatch {
            messages: self.messages[start..end].iter().rev().cloned().collect(),
            has_more: start > 0,
        }
    }
}

/// Volatile implementation, used in tests and as the index behind
/// [`FlatFileStore`].
#[derive(Default)]
pub struct MemoryStore {
    rooms: DashMap<String, Arc<parking_lot::Mutex<RoomLog>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn room(&self, room_id: &str) -> Arc<parking_lot::Mutex<RoomLog>> {
        self.rooms.entry(room_id.to_string()).or_default().clone()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn append_batch(
        &self,
        room_id: &str,
        user: &User,
        contents: Vec<String>,
    ) -> Result<Vec<Message>, ChatError> {
        let room = self.room(room_id);
        let mut log = room.lock();
        let batch = log.stamp_batch(user, contents, Utc::now().timestamp_millis());
        log.commit(&batch);
        Ok(batch)
    }

    async fn recent(&self, room_id: &str, limit: usize) -> Result<MessageBatch, ChatError> {
        Ok(self.room(room_id).lock().recent(limit))
    }

    async fn history_before(
        &self,
        room_id: &str,
        before: MessageId,
        limit: usize,
    ) -> Result<MessageBatch, ChatError> {
        Ok(self.room(room_id).lock().before(before, limit))
    }
}

/// Durable implementation: one JSON-lines file per room under
/// `<root>/rooms/`, appended before the in-memory index is updated. Reads are
/// served from the index, so they stay O(limit).
pub struct FlatFileStore {
    root: PathBuf,
    rooms: DashMap<String, Arc<tokio::sync::Mutex<RoomLog>>>,
}

impl FlatFileStore {
    /// Open a store rooted at `root`, reloading any logs written by a
    /// previous run.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, ChatError> {
        let root = root.as_ref().to_path_buf();
        let rooms_dir = root.join("rooms");
        std::fs::create_dir_all(&rooms_dir)?;

        let rooms = DashMap::new();
        for entry in std::fs::read_dir(&rooms_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("log") {
                continue;
            }
            let Some(room_id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let content = std::fs::read_to_string(&path)?;
            let mut log = RoomLog::default();
            for line in content.lines().filter(|l| !l.trim().is_empty()) {
                log.messages.push(serde_json::from_str(line)?);
            }
            rooms.insert(
                room_id.to_string(),
                Arc::new(tokio::sync::Mutex::new(log)),
            );
        }

        Ok(Self { root, rooms })
    }

    fn room(&self, room_id: &str) -> Arc<tokio::sync::Mutex<RoomLog>> {
        self.rooms.entry(room_id.to_string()).or_default().clone()
    }

    // Room ids come from the fixed registry, so they are safe as file stems.
    fn log_path(&self, room_id: &str) -> PathBuf {
        self.root.join("rooms").join(format!("{room_id}.log"))
    }
}

#[async_trait]
impl MessageStore for FlatFileStore {
    async fn append_batch(
        &self,
        room_id: &str,
        user: &User,
        contents: Vec<String>,
    ) -> Result<Vec<Message>, ChatError> {
        let room = self.room(room_id);
        let mut log = room.lock().await;

        let batch = log.stamp_batch(user, contents, Utc::now().timestamp_millis());

        let mut lines = String::new();
        for msg in &batch {
            lines.push_str(&serde_json::to_string(msg)?);
            lines.push('\n');
        }

        // Write to disk before publishing to the index; an I/O failure leaves
        // the log untouched and consumes no IDs.
        let write = async {
            let mut file = tokio_fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.log_path(room_id))
                .await?;
            file.write_all(lines.as_bytes()).await?;
            file.flush().await?;
            Ok::<(), std::io::Error>(())
        };
        write
            .await
            .map_err(|e| ChatError::StoreUnavailable(e.to_string()))?;

        log.commit(&batch);
        Ok(batch)
    }

    async fn recent(&self, room_id: &str, limit: usize) -> Result<MessageBatch, ChatError> {
        Ok(self.room(room_id).lock().await.recent(limit))
    }

    async fn history_before(
        &self,
        room_id: &str,
        before: MessageId,
        limit: usize,
    ) -> Result<MessageBatch, ChatError> {
        Ok(self.room(room_id).lock().await.before(before, limit))
    }
}
