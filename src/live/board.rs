//! Wiring between the push channel and the board store.

use crate::channel::{ChannelManager, ChannelState, Transport};
use crate::config::BoardConfig;
use crate::error::Result;
use crate::state::{BoardStore, Clock, Reconciler};
use crate::types::{EventKind, StreamEvent, SubscriptionKey};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::warn;

use super::watch::{BoardNotice, BoardWatch, WatchConfig, WatchId, WatchManager};

/// A live board: one push channel folded into one shared store.
///
/// The store is shared with readers (the presentation layer), but the
/// stream handlers are its only writer.
pub struct LiveBoard {
    channel: ChannelManager,
    reconciler: Reconciler,
    store: Arc<RwLock<BoardStore>>,
    watchers: Arc<WatchManager>,
}

impl LiveBoard {
    pub fn new(config: BoardConfig, transport: Arc<dyn Transport>, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let reconciler = Reconciler::new(clock, config.eviction.clone());
        let board = Self {
            channel: ChannelManager::new(config, transport),
            reconciler,
            store: Arc::new(RwLock::new(BoardStore::new())),
            watchers: Arc::new(WatchManager::new()),
        };
        board.register_handlers();
        Ok(board)
    }

    /// Start streaming `key`, replacing any current stream.
    pub fn start(&self, key: &SubscriptionKey) -> Result<()> {
        self.channel.connect(key)
    }

    pub fn stop(&self) {
        self.channel.disconnect();
    }

    pub fn state(&self) -> ChannelState {
        self.channel.state()
    }

    pub fn channel(&self) -> &ChannelManager {
        &self.channel
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Shared handle to the store.
    pub fn store(&self) -> Arc<RwLock<BoardStore>> {
        self.store.clone()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> BoardStore {
        self.store.read().clone()
    }

    pub fn watch(&self, config: WatchConfig) -> BoardWatch {
        self.watchers.watch(config)
    }

    pub fn unwatch(&self, id: WatchId) {
        self.watchers.unwatch(id);
    }

    fn register_handlers(&self) {
        for kind in EventKind::ALL {
            let reconciler = self.reconciler.clone();
            let store = self.store.clone();
            let watchers = self.watchers.clone();
            self.channel.register_event_listener(kind, move |event| {
                apply_event(&reconciler, &store, &watchers, event);
            });
        }

        let watchers = self.watchers.clone();
        self.channel.on_transport_error(move |reason| {
            watchers.broadcast(BoardNotice::Disconnected {
                reason: reason.to_string(),
            });
        });
    }
}

fn apply_event(
    reconciler: &Reconciler,
    store: &RwLock<BoardStore>,
    watchers: &WatchManager,
    event: &StreamEvent,
) {
    let notice = {
        let mut store = store.write();
        match reconciler.apply(&mut store, event) {
            Ok(Some(id)) => BoardNotice::Applied { kind: event.kind, id },
            Ok(None) => BoardNotice::Reset {
                entries: store.board_data().len(),
            },
            Err(e) => {
                warn!(kind = %event.kind, error = %e, "Dropping malformed event");
                return;
            }
        }
    };
    watchers.broadcast(notice);
}
