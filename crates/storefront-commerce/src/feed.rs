//! Entity change feeds.
//!
//! Admin views mirror a table into local state by applying insert, update and
//! delete deltas as they arrive. [`ChangeFeed`] is that capability;
//! [`BroadcastFeed`] is an in-memory implementation for development and tests.

use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Rows that can be matched across change events.
pub trait Keyed {
    type Key: PartialEq;

    fn key(&self) -> Self::Key;
}

/// One change to an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChangeEvent<T> {
    Insert(T),
    Update {
        /// Previous row, when the source reports it.
        old: Option<T>,
        new: T,
    },
    Delete(T),
}

impl<T: Keyed> ChangeEvent<T> {
    /// Apply this change to a local mirror.
    ///
    /// Inserts go to the front, newest first. An update for a row that is not
    /// in the mirror is treated as an insert.
    pub fn apply(self, rows: &mut Vec<T>) {
        match self {
            ChangeEvent::Insert(row) => rows.insert(0, row),
            ChangeEvent::Update { new, .. } => {
                let key = new.key();
                match rows.iter_mut().find(|r| r.key() == key) {
                    Some(existing) => *existing = new,
                    None => rows.insert(0, new),
                }
            }
            ChangeEvent::Delete(row) => {
                let key = row.key();
                rows.retain(|r| r.key() != key);
            }
        }
    }
}

/// Subscribe to changes of one entity type.
pub trait ChangeFeed<T>: Send + Sync {
    /// Events published after this call. The stream ends when the feed closes.
    fn subscribe(&self) -> BoxStream<'static, ChangeEvent<T>>;
}

/// In-memory feed over a `tokio::sync::broadcast` channel.
#[derive(Debug, Clone)]
pub struct BroadcastFeed<T> {
    sender: broadcast::Sender<ChangeEvent<T>>,
}

impl<T: Clone + Send + 'static> BroadcastFeed<T> {
    /// Create a feed buffering up to `capacity` events per slow subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish a change. Returns the number of subscribers that will see it.
    pub fn publish(&self, event: ChangeEvent<T>) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

impl<T: Clone + Send + 'static> ChangeFeed<T> for BroadcastFeed<T> {
    fn subscribe(&self) -> BoxStream<'static, ChangeEvent<T>> {
        stream::unfold(self.sender.subscribe(), |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(event) => return Some((event, rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "change feed subscriber lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}
