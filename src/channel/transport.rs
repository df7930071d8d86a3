//! Seam between the channel manager and the push connection underneath it.

use crate::error::Result;
use std::fmt;
use std::sync::Arc;

/// A raw event as read off the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// An event with an explicit name (`event:` field).
    Named { event: String, data: String },
    /// An unnamed event.
    Message { data: String },
    /// The connection failed or ended.
    Error(String),
}

/// Receives every event from one connection.
#[derive(Clone)]
pub struct EventSink {
    deliver: Arc<dyn Fn(TransportEvent) + Send + Sync>,
}

impl EventSink {
    pub fn new(deliver: impl Fn(TransportEvent) + Send + Sync + 'static) -> Self {
        Self {
            deliver: Arc::new(deliver),
        }
    }

    pub fn send(&self, event: TransportEvent) {
        (self.deliver)(event)
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventSink")
    }
}

/// A live push connection.
pub trait PushConnection: Send {
    /// Stop delivering events and release the connection. Safe to call
    /// more than once, and from the thread that delivers events.
    fn close(&mut self);
}

/// Opens push connections.
pub trait Transport: Send + Sync {
    /// Open a connection to `url`. Events are pushed to `sink`, in order,
    /// until the connection is closed or fails.
    fn open(&self, url: &str, sink: EventSink) -> Result<Box<dyn PushConnection>>;
}
