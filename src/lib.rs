//! # Departure Board
//!
//! Client-side stream reconciliation for a live transit departure board.
//!
//! ## Core Concepts
//!
//! - **Channel**: one push connection per subscription key, replaced on every connect
//! - **Events**: `reset`, `add`, `update`, `remove`, each carrying a resource
//! - **Store**: board entries plus schedules, trips, and stops, keyed by id
//! - **Reconciler**: folds events into the store, evicting departed entries
//!   once they are past the retention window
//!
//! ## Example
//!
//! ```ignore
//! use departure_board::{BoardConfig, CatalogClient, LiveBoard, SseTransport, SubscriptionKey, SystemClock};
//! use std::sync::Arc;
//!
//! let config = BoardConfig::from_env()?;
//! let board = LiveBoard::new(config.clone(), Arc::new(SseTransport::new()?), Arc::new(SystemClock))?;
//!
//! // Seed the stop catalog and clock
//! let catalog = CatalogClient::new(&config)?;
//! catalog.seed_stops(&mut board.store().write())?;
//! catalog.seed_time(&mut board.store().write())?;
//!
//! // Stream departures for a stop
//! board.start(&SubscriptionKey::new("place-sstat")?)?;
//! ```

pub mod catalog;
pub mod channel;
pub mod config;
pub mod error;
pub mod live;
pub mod state;
pub mod types;

// Re-exports
pub use catalog::{parse_server_time, CatalogClient};
pub use channel::{
    ChannelManager, ChannelState, EventHandler, EventSink, HandlerTable, PushConnection,
    SseParser, SseTransport, Transport, TransportEvent,
};
pub use config::{BoardConfig, EvictionPolicy, DEPARTED_STATUS};
pub use error::{BoardError, Result};
pub use live::{BoardNotice, BoardWatch, DropReason, LiveBoard, WatchConfig, WatchId};
pub use state::{
    departure_clock, sorted_board, sorted_stops, BoardStore, Clock, FixedClock, Reconciler,
    ResourceMap, SystemClock,
};
pub use types::*;
