//! Core types for the departure board.

use crate::error::{BoardError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Identifier of the upstream resource whose event stream is opened
/// (usually a stop id).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionKey(String);

impl SubscriptionKey {
    /// Create a key. Empty or whitespace-only keys are rejected.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(BoardError::InvalidSubscriptionKey(key));
        }
        Ok(SubscriptionKey(key))
    }

    /// The key as sent in the stream URL.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionKey({})", self.0)
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The four typed event channels of the push protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Reset,
    Add,
    Remove,
    Update,
}

impl EventKind {
    /// Every channel a connection listens on.
    pub const ALL: [EventKind; 4] = [
        EventKind::Reset,
        EventKind::Add,
        EventKind::Remove,
        EventKind::Update,
    ];

    /// Wire name of the event, as used in the `event:` field.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Reset => "reset",
            EventKind::Add => "add",
            EventKind::Remove => "remove",
            EventKind::Update => "update",
        }
    }
}

impl FromStr for EventKind {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "reset" => Ok(EventKind::Reset),
            "add" => Ok(EventKind::Add),
            "remove" => Ok(EventKind::Remove),
            "update" => Ok(EventKind::Update),
            other => Err(BoardError::UnknownEventType(other.to_string())),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed event as delivered to a registered handler. The payload is left
/// undecoded; interpreting it is the handler's job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamEvent {
    pub kind: EventKind,
    pub data: String,
}

impl StreamEvent {
    /// Create an event from its kind and raw payload.
    pub fn new(kind: EventKind, data: impl Into<String>) -> Self {
        Self {
            kind,
            data: data.into(),
        }
    }
}

/// Resource kind, derived from the `type` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Schedule,
    Trip,
    Stop,
    /// Anything else is a departure row on the board.
    BoardEntry,
}

impl ResourceKind {
    /// Classify a resource by its `type` field.
    pub fn from_type(resource_type: Option<&str>) -> Self {
        match resource_type {
            Some("schedule") => ResourceKind::Schedule,
            Some("trip") => ResourceKind::Trip,
            Some("stop") => ResourceKind::Stop,
            _ => ResourceKind::BoardEntry,
        }
    }
}

/// Attribute holding a board entry's departure time (ISO-8601).
pub const DEPARTURE_TIME: &str = "departure_time";

/// Attribute holding a board entry's status text.
pub const STATUS: &str = "status";

/// A self-describing record carried by every stream event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    pub attributes: Map<String, Value>,

    /// Fields outside the core shape (relationships, links) kept as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Ids arrive as strings upstream but numeric ids are accepted too.
fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "id must be a string or number, got {}",
            other
        ))),
    }
}

impl Resource {
    /// Create a resource with no extra fields.
    pub fn new(id: impl Into<String>, resource_type: Option<&str>, attributes: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.map(str::to_string),
            attributes,
            extra: Map::new(),
        }
    }

    /// Decode a single resource from an event payload.
    pub fn decode(data: &str) -> Result<Self> {
        serde_json::from_str(data).map_err(BoardError::from)
    }

    /// Decode a payload that may carry a list of resources, a single
    /// resource, or nothing at all.
    pub fn decode_many(data: &str) -> Result<Vec<Self>> {
        let trimmed = data.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Value>(trimmed)? {
            Value::Array(items) => items
                .into_iter()
                .map(|item| serde_json::from_value(item).map_err(BoardError::from))
                .collect(),
            Value::Null => Ok(Vec::new()),
            single => Ok(vec![serde_json::from_value(single)?]),
        }
    }

    /// Kind derived from the `type` field.
    pub fn kind(&self) -> ResourceKind {
        ResourceKind::from_type(self.resource_type.as_deref())
    }

    /// Look up a single attribute.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// The departure time, if present and non-empty.
    pub fn departure_time(&self) -> Option<&str> {
        self.non_empty_str(DEPARTURE_TIME)
    }

    /// The status text, if present and non-empty.
    pub fn status(&self) -> Option<&str> {
        self.non_empty_str(STATUS)
    }

    fn non_empty_str(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// A board entry with its departure fields pulled out of the attribute bag.
#[derive(Clone, Debug, PartialEq)]
pub struct BoardEntry {
    pub departure_time: Option<String>,
    pub status: Option<String>,
    pub resource: Resource,
}

/// A resource tagged by kind.
#[derive(Clone, Debug, PartialEq)]
pub enum ResourceRecord {
    Schedule(Resource),
    Trip(Resource),
    Stop(Resource),
    BoardEntry(BoardEntry),
}

impl From<Resource> for ResourceRecord {
    fn from(resource: Resource) -> Self {
        match resource.kind() {
            ResourceKind::Schedule => ResourceRecord::Schedule(resource),
            ResourceKind::Trip => ResourceRecord::Trip(resource),
            ResourceKind::Stop => ResourceRecord::Stop(resource),
            ResourceKind::BoardEntry => ResourceRecord::BoardEntry(BoardEntry {
                departure_time: resource.departure_time().map(str::to_string),
                status: resource.status().map(str::to_string),
                resource,
            }),
        }
    }
}

impl ResourceRecord {
    /// Id of the wrapped resource.
    pub fn id(&self) -> &str {
        match self {
            ResourceRecord::Schedule(r) | ResourceRecord::Trip(r) | ResourceRecord::Stop(r) => &r.id,
            ResourceRecord::BoardEntry(entry) => &entry.resource.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_key_rejects_empty() {
        assert!(SubscriptionKey::new("").is_err());
        assert!(SubscriptionKey::new("   ").is_err());
        assert_eq!(SubscriptionKey::new("place-sstat").unwrap().as_str(), "place-sstat");
    }

    #[test]
    fn test_event_kind_parse() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
        assert!(matches!(
            "message".parse::<EventKind>(),
            Err(BoardError::UnknownEventType(name)) if name == "message"
        ));
    }

    #[test]
    fn test_decode_numeric_id_without_type() {
        let resource = Resource::decode(r#"{"id":1,"attributes":{"status":"Boarding"}}"#).unwrap();
        assert_eq!(resource.id, "1");
        assert_eq!(resource.kind(), ResourceKind::BoardEntry);
        assert_eq!(resource.status(), Some("Boarding"));
        assert_eq!(resource.departure_time(), None);
    }

    #[test]
    fn test_decode_missing_attributes_is_error() {
        let result = Resource::decode(r#"{"id":"x","type":"prediction"}"#);
        assert!(matches!(result, Err(BoardError::Decode(_))));

        let result = Resource::decode(r#"{"id":"x","attributes":null}"#);
        assert!(matches!(result, Err(BoardError::Decode(_))));
    }

    #[test]
    fn test_decode_keeps_relationships() {
        let resource = Resource::decode(
            r#"{"id":"p1","type":"prediction","attributes":{},"relationships":{"trip":{"data":{"id":"t1"}}}}"#,
        )
        .unwrap();
        assert!(resource.extra.contains_key("relationships"));
    }

    #[test]
    fn test_decode_many_shapes() {
        assert!(Resource::decode_many("").unwrap().is_empty());
        assert!(Resource::decode_many("[]").unwrap().is_empty());

        let many = Resource::decode_many(
            r#"[{"id":"a","type":"stop","attributes":{}},{"id":"b","attributes":{}}]"#,
        )
        .unwrap();
        assert_eq!(many.len(), 2);

        let one = Resource::decode_many(r#"{"id":"a","type":"trip","attributes":{}}"#).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].kind(), ResourceKind::Trip);
    }

    #[test]
    fn test_empty_departure_time_is_absent() {
        let resource = Resource::decode(r#"{"id":"a","attributes":{"departure_time":""}}"#).unwrap();
        assert_eq!(resource.departure_time(), None);

        let resource = Resource::decode(r#"{"id":"a","attributes":{"departure_time":null}}"#).unwrap();
        assert_eq!(resource.departure_time(), None);
    }

    #[test]
    fn test_record_tagging() {
        let resource = Resource::decode(
            r#"{"id":"p","type":"prediction","attributes":{"departure_time":"2024-01-01T10:00:00Z","status":"On time"}}"#,
        )
        .unwrap();
        match ResourceRecord::from(resource) {
            ResourceRecord::BoardEntry(entry) => {
                assert_eq!(entry.departure_time.as_deref(), Some("2024-01-01T10:00:00Z"));
                assert_eq!(entry.status.as_deref(), Some("On time"));
            }
            other => panic!("Expected board entry, got {:?}", other),
        }
    }
}
