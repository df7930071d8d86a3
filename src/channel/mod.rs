//! Push channel lifecycle.
//!
//! [`ChannelManager`] owns at most one live connection per process, bound to
//! a subscription key, and multiplexes the raw transport events into typed
//! callbacks:
//! - `reset`, `add`, `remove`, `update` go to the registered handler
//! - unnamed messages are logged only
//! - a transport error closes the connection (no retry)
//!
//! # Example
//!
//! ```ignore
//! let manager = ChannelManager::new(config, Arc::new(SseTransport::new()?));
//!
//! manager.register_event_listener(EventKind::Update, |event| {
//!     println!("update: {}", event.data);
//! });
//! manager.connect(&SubscriptionKey::new("place-sstat")?)?;
//!
//! // Switching stops closes the old stream first
//! manager.connect(&SubscriptionKey::new("place-bbsta")?)?;
//! manager.disconnect();
//! ```

mod manager;
mod sse;
mod transport;
mod types;

pub use manager::{ChannelManager, ErrorListener};
pub use sse::{SseParser, SseTransport};
pub use transport::{EventSink, PushConnection, Transport, TransportEvent};
pub use types::{ChannelState, EventHandler, HandlerTable};
