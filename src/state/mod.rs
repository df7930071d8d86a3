//! Board state and reconciliation.
//!
//! [`BoardStore`] is a passive container exposing mutation entry points.
//! [`Reconciler`] folds `reset`/`add`/`update`/`remove` resources into it,
//! including the retention rule for departed entries.

mod reconcile;
mod store;
mod views;

pub use reconcile::{Clock, FixedClock, Reconciler, SystemClock};
pub use store::{BoardStore, ResourceMap};
pub use views::{departure_clock, sorted_board, sorted_stops};
