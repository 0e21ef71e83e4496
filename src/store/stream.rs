//! Change records emitted by the document table.
//!
//! The feed is an ordered, at-least-once broadcast of row mutations keyed
//! by the row's partition key. Subscribers join at the latest position;
//! nothing is replayed.

use crate::store::attribute::AttributeMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

/// Default buffered capacity of the change feed.
pub const CHANGE_FEED_CAPACITY: usize = 256;

/// The kind of mutation a change record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamEventKind {
    /// A row was created.
    Insert,
    /// An existing row was updated or overwritten.
    Modify,
    /// A row was deleted.
    Remove,
}

/// One mutation observed on the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// What happened.
    pub kind: StreamEventKind,
    /// Partition key of the mutated row.
    pub key: String,
    /// Row contents after the mutation, absent for removes.
    pub new_image: Option<AttributeMap>,
    /// Row contents before the mutation, absent for inserts.
    pub old_image: Option<AttributeMap>,
    /// Monotonic position in the feed.
    pub sequence: u64,
}

/// The table's mutation feed.
///
/// Backed by a broadcast channel: a receiver obtained via [`subscribe`]
/// sees only records emitted after it was created, which gives the
/// latest-position semantics consumers expect. A slow receiver that falls
/// more than the channel capacity behind observes a lag error rather than
/// blocking writers.
///
/// [`subscribe`]: ChangeFeed::subscribe
#[derive(Debug)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeRecord>,
    sequence: AtomicU64,
}

impl ChangeFeed {
    /// Creates a feed with the given buffered capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: AtomicU64::new(0),
        }
    }

    /// Subscribes from the latest position.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeRecord> {
        self.sender.subscribe()
    }

    /// Emits a record, assigning it the next sequence number.
    ///
    /// Emission with no live subscribers is not an error; the feed simply
    /// has no one to tell.
    pub fn emit(
        &self,
        kind: StreamEventKind,
        key: impl Into<String>,
        new_image: Option<AttributeMap>,
        old_image: Option<AttributeMap>,
    ) {
        let record = ChangeRecord {
            kind,
            key: key.into(),
            new_image,
            old_image,
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
        };
        let _ = self.sender.send(record);
    }

    /// Returns the number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(CHANGE_FEED_CAPACITY)
    }
}
