//! The board's passive state container.

use crate::types::Resource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Id-keyed collection of resources.
pub type ResourceMap = HashMap<String, Resource>;

/// Materialized view of the live stream plus the seeded stop catalog.
///
/// All writes go through the mutation methods below; fields are never
/// written directly from outside.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BoardStore {
    board_data: ResourceMap,
    schedules: ResourceMap,
    trips: ResourceMap,
    stops: ResourceMap,
    /// Full stop catalog, seeded once and untouched by stream resets.
    all_stops: ResourceMap,
    /// Reference clock seeded from the backend.
    time: Option<DateTime<Utc>>,
}

impl BoardStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // --- Reference state ---

    /// Insert or overwrite a schedule by id.
    pub fn add_schedule(&mut self, schedule: Resource) {
        self.schedules.insert(schedule.id.clone(), schedule);
    }

    /// Remove a schedule by id. No-op if absent.
    pub fn remove_schedule(&mut self, schedule: &Resource) {
        self.schedules.remove(&schedule.id);
    }

    /// Insert or overwrite a trip by id.
    pub fn add_trip(&mut self, trip: Resource) {
        self.trips.insert(trip.id.clone(), trip);
    }

    /// Remove a trip by id. No-op if absent.
    pub fn remove_trip(&mut self, trip: &Resource) {
        self.trips.remove(&trip.id);
    }

    /// Insert or overwrite a stop by id.
    pub fn add_stop(&mut self, stop: Resource) {
        self.stops.insert(stop.id.clone(), stop);
    }

    /// Remove a stop by id. No-op if absent.
    pub fn remove_stop(&mut self, stop: &Resource) {
        self.stops.remove(&stop.id);
    }

    // --- Board entries ---

    /// Insert or overwrite a board entry by id.
    pub fn add_board_data(&mut self, data: Resource) {
        self.board_data.insert(data.id.clone(), data);
    }

    /// Remove a board entry by id. No-op if absent.
    pub fn remove_board_data(&mut self, data: &Resource) {
        self.board_data.remove(&data.id);
    }

    /// Copy a single attribute from `data` onto the existing entry with the
    /// same id. Returns false if no such entry exists.
    ///
    /// A field missing from `data` is removed from the entry.
    pub fn update_board_field(&mut self, field: &str, data: &Resource) -> bool {
        let Some(current) = self.board_data.get_mut(&data.id) else {
            return false;
        };
        match data.attributes.get(field) {
            Some(value) => {
                current.attributes.insert(field.to_string(), value.clone());
            }
            None => {
                current.attributes.remove(field);
            }
        }
        true
    }

    // --- Resets ---

    /// Clear everything the stream owns. The stop catalog and clock stay.
    pub fn reset_state(&mut self) {
        self.board_data.clear();
        self.schedules.clear();
        self.trips.clear();
        self.stops.clear();
    }

    /// Clear the board only.
    pub fn reset_board_data(&mut self) {
        self.board_data.clear();
    }

    // --- Seeded collaborators ---

    /// Replace the stop catalog.
    pub fn set_all_stops<I>(&mut self, stops: I)
    where
        I: IntoIterator<Item = Resource>,
    {
        for stop in stops {
            self.all_stops.insert(stop.id.clone(), stop);
        }
    }

    /// Record the backend clock.
    pub fn set_time(&mut self, time: DateTime<Utc>) {
        self.time = Some(time);
    }

    // --- Reads ---

    /// Current board entries by id.
    pub fn board_data(&self) -> &ResourceMap {
        &self.board_data
    }

    /// Look up one board entry.
    pub fn board_entry(&self, id: &str) -> Option<&Resource> {
        self.board_data.get(id)
    }

    /// Schedules seen on the stream.
    pub fn schedules(&self) -> &ResourceMap {
        &self.schedules
    }

    /// Trips seen on the stream.
    pub fn trips(&self) -> &ResourceMap {
        &self.trips
    }

    /// Stops seen on the stream.
    pub fn stops(&self) -> &ResourceMap {
        &self.stops
    }

    /// The seeded stop catalog.
    pub fn all_stops(&self) -> &ResourceMap {
        &self.all_stops
    }

    /// The seeded backend clock, if fetched.
    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.time
    }
}
