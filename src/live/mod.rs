//! Live board: channel handlers feeding the reconciler, plus change
//! notifications for observers.
//!
//! # Example
//!
//! ```ignore
//! let board = LiveBoard::new(config, Arc::new(SseTransport::new()?), Arc::new(SystemClock))?;
//! let watch = board.watch(WatchConfig::default());
//!
//! board.start(&SubscriptionKey::new("place-sstat")?)?;
//!
//! loop {
//!     match watch.recv() {
//!         Ok(BoardNotice::Disconnected { .. }) => break,
//!         Ok(_) => render(&board.snapshot()),
//!         Err(_) => break,
//!     }
//! }
//! ```

mod board;
mod watch;

pub use board::LiveBoard;
pub use watch::{BoardNotice, BoardWatch, DropReason, WatchConfig, WatchId, WatchManager};
