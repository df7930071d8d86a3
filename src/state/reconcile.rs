//! Folding stream events into the board store.

use crate::config::EvictionPolicy;
use crate::error::Result;
use crate::state::store::BoardStore;
use crate::types::{EventKind, Resource, ResourceRecord, StreamEvent, STATUS};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Source of "now" for the eviction rule.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Create a clock stopped at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Applies resources to a [`BoardStore`] through its mutation methods.
///
/// Holds no board state of its own. Events are applied in the order they
/// are handed in; nothing is reordered or deduplicated.
#[derive(Clone)]
pub struct Reconciler {
    clock: Arc<dyn Clock>,
    policy: EvictionPolicy,
}

impl Reconciler {
    /// Create a reconciler reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>, policy: EvictionPolicy) -> Self {
        Self { clock, policy }
    }

    /// The eviction rule in use.
    pub fn policy(&self) -> &EvictionPolicy {
        &self.policy
    }

    /// Decode a raw stream event and apply it. Returns the id of the
    /// resource the event carried, or `None` for a reset.
    ///
    /// On a decode error nothing is applied.
    pub fn apply(&self, store: &mut BoardStore, event: &StreamEvent) -> Result<Option<String>> {
        if event.kind == EventKind::Reset {
            let resources = Resource::decode_many(&event.data)?;
            self.reset(store, resources);
            return Ok(None);
        }

        let resource = Resource::decode(&event.data)?;
        let id = resource.id.clone();
        match event.kind {
            EventKind::Add => self.load(store, resource),
            EventKind::Update => self.update(store, resource),
            EventKind::Remove => self.remove(store, &resource),
            EventKind::Reset => {}
        }
        Ok(Some(id))
    }

    /// Insert or overwrite a resource. Board entries without a departure
    /// time are dropped.
    pub fn load(&self, store: &mut BoardStore, resource: Resource) {
        match ResourceRecord::from(resource) {
            ResourceRecord::Schedule(r) => store.add_schedule(r),
            ResourceRecord::Trip(r) => store.add_trip(r),
            ResourceRecord::Stop(r) => store.add_stop(r),
            ResourceRecord::BoardEntry(entry) => {
                if entry.departure_time.is_some() {
                    store.add_board_data(entry.resource);
                } else {
                    debug!(id = %entry.resource.id, "Skipping board entry without departure time");
                }
            }
        }
    }

    /// Remove a resource by id. Unknown ids are ignored.
    pub fn remove(&self, store: &mut BoardStore, resource: &Resource) {
        match ResourceRecord::from(resource.clone()) {
            ResourceRecord::Schedule(r) => store.remove_schedule(&r),
            ResourceRecord::Trip(r) => store.remove_trip(&r),
            ResourceRecord::Stop(r) => store.remove_stop(&r),
            ResourceRecord::BoardEntry(entry) => store.remove_board_data(&entry.resource),
        }
    }

    /// Apply an update.
    ///
    /// Reference resources and board entries carrying a departure time are
    /// overwritten whole. Anything else is a status-only update against an
    /// existing entry, after which a departed entry past the retention window
    /// is evicted.
    pub fn update(&self, store: &mut BoardStore, resource: Resource) {
        let entry = match ResourceRecord::from(resource) {
            ResourceRecord::BoardEntry(entry) if entry.departure_time.is_none() => entry,
            record => {
                // Full overwrite, identical to an add.
                let resource = match record {
                    ResourceRecord::Schedule(r) | ResourceRecord::Trip(r) | ResourceRecord::Stop(r) => r,
                    ResourceRecord::BoardEntry(entry) => entry.resource,
                };
                self.load(store, resource);
                return;
            }
        };

        let id = entry.resource.id.clone();
        let previous_departure = match store.board_entry(&id) {
            Some(current) => current.departure_time().map(str::to_string),
            None => {
                debug!(id = %id, "Status update for unknown board entry ignored");
                return;
            }
        };

        store.update_board_field(STATUS, &entry.resource);

        let departed = entry.status.as_deref() == Some(self.policy.departed_status.as_str());
        if let (true, Some(departure_time)) = (departed, previous_departure) {
            if self.should_evict(&id, &departure_time) {
                debug!(id = %id, departure_time = %departure_time, "Evicting departed entry");
                store.remove_board_data(&entry.resource);
            }
        }
    }

    /// Clear the stream-owned collections, then load the snapshot the reset
    /// carried.
    pub fn reset<I>(&self, store: &mut BoardStore, resources: I)
    where
        I: IntoIterator<Item = Resource>,
    {
        store.reset_state();
        for resource in resources {
            self.load(store, resource);
        }
    }

    /// Whole minutes elapsed since departure, compared against the window.
    /// Unparseable times are never evicted.
    fn should_evict(&self, id: &str, departure_time: &str) -> bool {
        let departed_at = match DateTime::parse_from_rfc3339(departure_time) {
            Ok(t) => t.with_timezone(&Utc),
            Err(e) => {
                warn!(id = %id, departure_time = %departure_time, error = %e, "Unparseable departure time, keeping entry");
                return false;
            }
        };
        let elapsed = self.clock.now().signed_duration_since(departed_at);
        self.policy.is_expired(elapsed)
    }
}
