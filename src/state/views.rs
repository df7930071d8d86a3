//! Read-only orderings of store contents for presentation.

use crate::state::store::{BoardStore, ResourceMap};
use crate::types::Resource;
use chrono::DateTime;
use serde_json::Value;

/// Board entries ordered by departure time.
///
/// Departure times are ISO-8601 strings so a lexicographic comparison orders
/// them chronologically within one offset.
pub fn sorted_board(store: &BoardStore) -> Vec<&Resource> {
    let mut entries: Vec<&Resource> = store.board_data().values().collect();
    entries.sort_by(|a, b| {
        a.departure_time()
            .unwrap_or_default()
            .cmp(b.departure_time().unwrap_or_default())
            .then_with(|| a.id.cmp(&b.id))
    });
    entries
}

/// Stops ordered by name. Stops without a name sort first.
pub fn sorted_stops(stops: &ResourceMap) -> Vec<&Resource> {
    let mut sorted: Vec<&Resource> = stops.values().collect();
    sorted.sort_by(|a, b| {
        stop_name(a)
            .cmp(stop_name(b))
            .then_with(|| a.id.cmp(&b.id))
    });
    sorted
}

fn stop_name(stop: &Resource) -> &str {
    stop.attribute("name").and_then(Value::as_str).unwrap_or_default()
}

/// Departure time rendered as a 12-hour clock, e.g. "09:05 AM", in the
/// offset the time was published with.
pub fn departure_clock(entry: &Resource) -> Option<String> {
    let departure = DateTime::parse_from_rfc3339(entry.departure_time()?).ok()?;
    Some(departure.format("%I:%M %p").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resource(value: serde_json::Value) -> Resource {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_sorted_board_by_departure() {
        let mut store = BoardStore::new();
        for (id, time) in [("c", "2024-01-01T12:00:00-05:00"), ("a", "2024-01-01T09:30:00-05:00"), ("b", "2024-01-01T10:15:00-05:00")] {
            store.add_board_data(resource(json!({"id": id, "attributes": {"departure_time": time}})));
        }

        let ids: Vec<&str> = sorted_board(&store).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_sorted_stops_by_name() {
        let mut store = BoardStore::new();
        store.set_all_stops(vec![
            resource(json!({"id": "1", "type": "stop", "attributes": {"name": "Worcester"}})),
            resource(json!({"id": "2", "type": "stop", "attributes": {"name": "Back Bay"}})),
            resource(json!({"id": "3", "type": "stop", "attributes": {}})),
        ]);

        let ids: Vec<&str> = sorted_stops(store.all_stops()).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2", "1"]);
    }

    #[test]
    fn test_departure_clock() {
        let entry = resource(json!({"id": "p", "attributes": {"departure_time": "2024-01-01T21:05:00-05:00"}}));
        assert_eq!(departure_clock(&entry).as_deref(), Some("09:05 PM"));

        let missing = resource(json!({"id": "p", "attributes": {}}));
        assert_eq!(departure_clock(&missing), None);
    }
}
