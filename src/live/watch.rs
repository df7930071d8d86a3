//! Change notifications for board observers.

use crate::types::EventKind;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Configuration for a watcher.
#[derive(Clone, Debug)]
pub struct WatchConfig {
    /// Max buffered notices before the watcher is dropped.
    /// Default: 256
    pub buffer_size: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { buffer_size: 256 }
    }
}

/// Sent to watchers after the store changes or the channel drops.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoardNotice {
    /// An add/update/remove was applied.
    Applied { kind: EventKind, id: String },
    /// The stream reset the board; `entries` is the new board size.
    Reset { entries: usize },
    /// The push channel closed on a transport error.
    Disconnected { reason: String },
    /// This watcher was dropped.
    Dropped { reason: DropReason },
}

/// Why a watcher was dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Buffer overflowed (slow consumer).
    BufferOverflow,
    /// Explicitly unwatched.
    Unwatched,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

/// Handle for receiving notices.
pub struct BoardWatch {
    pub id: WatchId,
    pub receiver: Receiver<BoardNotice>,
}

impl BoardWatch {
    /// Receive the next notice (blocking).
    pub fn recv(&self) -> Result<BoardNotice, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a notice (non-blocking).
    pub fn try_recv(&self) -> Result<BoardNotice, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<BoardNotice, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Fans notices out to watchers, dropping any that fall behind.
pub struct WatchManager {
    watchers: RwLock<HashMap<WatchId, Sender<BoardNotice>>>,
    next_id: AtomicU64,
}

impl WatchManager {
    pub fn new() -> Self {
        Self {
            watchers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn watch(&self, config: WatchConfig) -> BoardWatch {
        let id = WatchId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(config.buffer_size.max(1));
        self.watchers.write().insert(id, sender);
        BoardWatch { id, receiver }
    }

    pub fn unwatch(&self, id: WatchId) {
        if let Some(sender) = self.watchers.write().remove(&id) {
            // Best effort
            let _ = sender.try_send(BoardNotice::Dropped {
                reason: DropReason::Unwatched,
            });
        }
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.read().len()
    }

    /// Send to every watcher. Watchers that are full or gone are removed.
    pub fn broadcast(&self, notice: BoardNotice) {
        let mut to_remove = Vec::new();

        {
            let watchers = self.watchers.read();
            for (id, sender) in watchers.iter() {
                if sender.try_send(notice.clone()).is_err() {
                    to_remove.push(*id);
                }
            }
        }

        if !to_remove.is_empty() {
            let mut watchers = self.watchers.write();
            for id in to_remove {
                if let Some(sender) = watchers.remove(&id) {
                    let _ = sender.try_send(BoardNotice::Dropped {
                        reason: DropReason::BufferOverflow,
                    });
                }
            }
        }
    }
}

impl Default for WatchManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn applied(id: &str) -> BoardNotice {
        BoardNotice::Applied {
            kind: EventKind::Add,
            id: id.to_string(),
        }
    }

    #[test]
    fn test_watch_unwatch() {
        let manager = WatchManager::new();

        let handle = manager.watch(WatchConfig::default());
        assert_eq!(manager.watcher_count(), 1);

        manager.unwatch(handle.id);
        assert_eq!(manager.watcher_count(), 0);
        assert_eq!(
            handle.try_recv().unwrap(),
            BoardNotice::Dropped {
                reason: DropReason::Unwatched
            }
        );
    }

    #[test]
    fn test_broadcast_in_order() {
        let manager = WatchManager::new();
        let handle = manager.watch(WatchConfig::default());

        manager.broadcast(applied("1"));
        manager.broadcast(BoardNotice::Reset { entries: 0 });

        assert_eq!(handle.recv_timeout(Duration::from_millis(100)).unwrap(), applied("1"));
        assert_eq!(
            handle.recv_timeout(Duration::from_millis(100)).unwrap(),
            BoardNotice::Reset { entries: 0 }
        );
    }

    #[test]
    fn test_drop_slow_watcher() {
        let manager = WatchManager::new();
        let _handle = manager.watch(WatchConfig { buffer_size: 2 });

        for i in 0..10 {
            manager.broadcast(applied(&i.to_string()));
        }

        assert_eq!(manager.watcher_count(), 0);
    }

    #[test]
    fn test_disconnected_receiver_removed() {
        let manager = WatchManager::new();
        let handle = manager.watch(WatchConfig::default());
        drop(handle);

        manager.broadcast(applied("1"));

        assert_eq!(manager.watcher_count(), 0);
    }
}
