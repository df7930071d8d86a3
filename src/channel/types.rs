//! Handler table and lifecycle types for the push channel.

use crate::types::{EventKind, StreamEvent};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Callback invoked with each event of one kind.
pub type EventHandler = Arc<dyn Fn(&StreamEvent) + Send + Sync>;

/// Lifecycle state of the channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connected,
}

/// One handler slot per event kind. Registering again overwrites.
#[derive(Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<EventKind, EventHandler>,
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.handlers.keys().map(|k| k.as_str()).collect();
        kinds.sort_unstable();
        f.debug_struct("HandlerTable").field("registered", &kinds).finish()
    }
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the handler for `kind`, returning the one it replaced.
    pub fn register(&mut self, kind: EventKind, handler: EventHandler) -> Option<EventHandler> {
        self.handlers.insert(kind, handler)
    }

    /// Remove the handler for `kind`. No-op if none is set.
    pub fn unregister(&mut self, kind: EventKind) -> Option<EventHandler> {
        self.handlers.remove(&kind)
    }

    pub fn get(&self, kind: EventKind) -> Option<EventHandler> {
        self.handlers.get(&kind).cloned()
    }

    pub fn contains(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
