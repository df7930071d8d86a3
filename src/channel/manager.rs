//! Channel manager: owns the single live push connection.

use crate::config::BoardConfig;
use crate::error::Result;
use crate::types::{EventKind, StreamEvent, SubscriptionKey};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

use super::transport::{EventSink, PushConnection, Transport, TransportEvent};
use super::types::{ChannelState, EventHandler, HandlerTable};

/// Generation value meaning "no live connection".
const NO_CONNECTION: u64 = 0;

/// Callback invoked when a transport error closes the connection.
pub type ErrorListener = Arc<dyn Fn(&str) + Send + Sync>;

/// The connection currently owned by the manager.
struct LiveConnection {
    generation: u64,
    key: SubscriptionKey,
    connection: Box<dyn PushConnection>,
}

/// State reachable from connection sinks.
struct Shared {
    /// Held for the whole of connect/disconnect so close-then-open is atomic.
    lifecycle: Mutex<()>,
    /// Held only briefly; never across transport calls.
    slot: Mutex<Option<LiveConnection>>,
    /// Held while a typed event is checked and handed to its handler, and
    /// while the live generation is retired. Once `close_current` returns, no
    /// handler is still running for the old connection.
    delivery: Mutex<()>,
    /// Generation of the live connection, or `NO_CONNECTION`.
    current: AtomicU64,
    next_generation: AtomicU64,
    handlers: RwLock<HandlerTable>,
    error_listener: RwLock<Option<ErrorListener>>,
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        self.current.load(Ordering::SeqCst) == generation
    }

    /// Route one transport event from the connection tagged `generation`.
    fn dispatch(&self, generation: u64, event: TransportEvent) {
        match event {
            TransportEvent::Named { event, data } => {
                let kind = match event.parse::<EventKind>() {
                    Ok(kind) => kind,
                    Err(_) => {
                        debug!(event = %event, "Ignoring event outside the typed channels");
                        return;
                    }
                };
                let _delivery = self.delivery.lock();
                if !self.is_current(generation) {
                    debug!(generation, "Dropping event from superseded connection");
                    return;
                }
                // Clone out of the table so handlers may re-register.
                let handler = self.handlers.read().get(kind);
                match handler {
                    Some(handler) => {
                        debug!(kind = %kind, "Dispatching event");
                        handler(&StreamEvent { kind, data });
                    }
                    None => debug!(kind = %kind, "No handler registered"),
                }
            }
            TransportEvent::Message { data } => {
                if self.is_current(generation) {
                    debug!(data = %data, "Untyped message");
                }
            }
            TransportEvent::Error(message) => self.fail(generation, &message),
        }
    }

    /// Transport error: close the connection. No retry.
    fn fail(&self, generation: u64, message: &str) {
        if self
            .current
            .compare_exchange(generation, NO_CONNECTION, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        warn!(generation, error = %message, "Push channel failed, closing connection");

        // Not yet stored if the error came out of `open` itself; connect
        // closes it in that case.
        let failed = {
            let mut slot = self.slot.lock();
            match slot.as_ref() {
                Some(live) if live.generation == generation => slot.take(),
                _ => None,
            }
        };
        if let Some(mut live) = failed {
            live.connection.close();
        }

        let listener = self.error_listener.read().clone();
        if let Some(listener) = listener {
            listener(message);
        }
    }
}

/// Owns the lifecycle of one push connection bound to a subscription key.
///
/// At most one connection is live at a time: `connect` always closes the
/// previous connection before opening the next. Events on the four typed
/// channels are forwarded to whatever handler is registered for that kind
/// when the event arrives, so handlers can be changed after connecting.
///
/// # Example
///
/// ```ignore
/// let manager = ChannelManager::new(BoardConfig::from_env()?, Arc::new(SseTransport::new()?));
/// manager.register_event_listener(EventKind::Add, |event| println!("{}", event.data));
/// manager.connect(&SubscriptionKey::new("place-sstat")?)?;
/// ```
pub struct ChannelManager {
    config: BoardConfig,
    transport: Arc<dyn Transport>,
    shared: Arc<Shared>,
}

impl ChannelManager {
    pub fn new(config: BoardConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            shared: Arc::new(Shared {
                lifecycle: Mutex::new(()),
                delivery: Mutex::new(()),
                slot: Mutex::new(None),
                current: AtomicU64::new(NO_CONNECTION),
                next_generation: AtomicU64::new(NO_CONNECTION + 1),
                handlers: RwLock::new(HandlerTable::new()),
                error_listener: RwLock::new(None),
            }),
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Close any existing connection, then open one for `key`.
    pub fn connect(&self, key: &SubscriptionKey) -> Result<()> {
        let _lifecycle = self.shared.lifecycle.lock();

        self.close_current();

        let generation = self.shared.next_generation.fetch_add(1, Ordering::SeqCst);
        let url = self.config.stream_url(key);
        self.shared.current.store(generation, Ordering::SeqCst);

        let mut connection = match self.transport.open(&url, self.sink_for(generation)) {
            Ok(connection) => connection,
            Err(e) => {
                let _ = self.shared.current.compare_exchange(
                    generation,
                    NO_CONNECTION,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                );
                warn!(key = %key, url = %url, error = %e, "Failed to open push channel");
                return Err(e);
            }
        };

        {
            let mut slot = self.shared.slot.lock();
            if self.shared.is_current(generation) {
                *slot = Some(LiveConnection {
                    generation,
                    key: key.clone(),
                    connection,
                });
                info!(key = %key, url = %url, generation, "Push channel connected");
                return Ok(());
            }
        }

        // Failed before it could be stored.
        connection.close();
        Ok(())
    }

    /// Close the live connection, if any.
    pub fn disconnect(&self) {
        let _lifecycle = self.shared.lifecycle.lock();
        self.close_current();
    }

    /// Register the handler for `kind`, replacing any previous one.
    ///
    /// Handlers run one at a time on the transport's delivery thread and must
    /// not call [`connect`](Self::connect) or [`disconnect`](Self::disconnect).
    pub fn register_event_listener<F>(&self, kind: EventKind, callback: F)
    where
        F: Fn(&StreamEvent) + Send + Sync + 'static,
    {
        let handler: EventHandler = Arc::new(callback);
        if self.shared.handlers.write().register(kind, handler).is_some() {
            debug!(kind = %kind, "Replaced event handler");
        }
    }

    /// Remove the handler for `kind`. No-op if none is registered.
    pub fn unregister_event_listener(&self, kind: EventKind) {
        self.shared.handlers.write().unregister(kind);
    }

    pub fn has_listener(&self, kind: EventKind) -> bool {
        self.shared.handlers.read().contains(kind)
    }

    /// Called after a transport error has closed the connection.
    pub fn on_transport_error<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        *self.shared.error_listener.write() = Some(Arc::new(callback));
    }

    pub fn state(&self) -> ChannelState {
        if self.shared.current.load(Ordering::SeqCst) == NO_CONNECTION {
            ChannelState::Disconnected
        } else {
            ChannelState::Connected
        }
    }

    /// Key of the live connection.
    pub fn current_key(&self) -> Option<SubscriptionKey> {
        self.shared.slot.lock().as_ref().map(|live| live.key.clone())
    }

    fn close_current(&self) {
        {
            let _delivery = self.shared.delivery.lock();
            self.shared.current.store(NO_CONNECTION, Ordering::SeqCst);
        }
        let previous = self.shared.slot.lock().take();
        if let Some(mut live) = previous {
            live.connection.close();
            info!(key = %live.key, generation = live.generation, "Push channel closed");
        }
    }

    fn sink_for(&self, generation: u64) -> EventSink {
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        EventSink::new(move |event| {
            if let Some(shared) = shared.upgrade() {
                shared.dispatch(generation, event);
            }
        })
    }
}

impl Drop for ChannelManager {
    fn drop(&mut self) {
        self.disconnect();
    }
}
