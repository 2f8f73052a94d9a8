use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{de::Visitor, Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Name of the discriminant field in every event body delivered by the host.
pub const EVENT_TYPE_FIELD: &str = "eventType";

/// Kinds of lifecycle events the host can deliver.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub enum EventType {
    Invoke,
    Shutdown,
    /// An event kind we don't know about. The original string is kept as is.
    Unknown(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::Invoke => "INVOKE",
            EventType::Shutdown => "SHUTDOWN",
            EventType::Unknown(s) => s,
        }
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        match s {
            "INVOKE" => EventType::Invoke,
            "SHUTDOWN" => EventType::Shutdown,
            other => EventType::Unknown(other.to_owned()),
        }
    }
}

/// Allow casting `EventType` from strings. Never fails: unrecognized kinds become `Unknown`.
impl FromStr for EventType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(EventType::from(s))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

struct EventTypeVisitor;

impl<'de> Visitor<'de> for EventTypeVisitor {
    type Value = EventType;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "the string representation of EventType")
    }

    fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(EventType::from(s))
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(EventTypeVisitor)
    }
}

impl Serialize for EventType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Enumeration of errors that can occur when decoding an event body.
#[derive(Error, Debug)]
pub enum EventParseError {
    #[error("event body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("event body is not a JSON object")]
    NotAnObject,
    #[error("event body has no string eventType field")]
    MissingEventType,
}

/// A single event received from the host's next event endpoint.
///
/// The full body is kept next to the parsed discriminant, so whatever processes the
/// event sees every field the host sent, including the ones we don't model.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleEvent {
    event_type: EventType,
    payload: Map<String, Value>,
}

impl LifecycleEvent {
    /// Decode an event from a raw response body.
    pub fn from_slice(body: &[u8]) -> Result<Self, EventParseError> {
        let value: Value = serde_json::from_slice(body)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, EventParseError> {
        let Value::Object(payload) = value else {
            return Err(EventParseError::NotAnObject);
        };

        let event_type = match payload.get(EVENT_TYPE_FIELD) {
            Some(Value::String(s)) => EventType::from(s.as_str()),
            _ => return Err(EventParseError::MissingEventType),
        };

        Ok(Self {
            event_type,
            payload,
        })
    }

    pub fn event_type(&self) -> &EventType {
        &self.event_type
    }

    pub fn is_shutdown(&self) -> bool {
        self.event_type == EventType::Shutdown
    }

    /// The event body exactly as the host sent it.
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn request_id(&self) -> Option<&str> {
        self.str_field("requestId")
    }

    pub fn invoked_function_arn(&self) -> Option<&str> {
        self.str_field("invokedFunctionArn")
    }

    pub fn shutdown_reason(&self) -> Option<&str> {
        self.str_field("shutdownReason")
    }

    /// Deadline of the current invocation or shutdown, in milliseconds since the epoch.
    pub fn deadline_ms(&self) -> Option<u64> {
        self.payload.get("deadlineMs").and_then(Value::as_u64)
    }

    fn str_field(&self, field: &str) -> Option<&str> {
        self.payload.get(field).and_then(Value::as_str)
    }
}

/// Display an event as its compact JSON body.
impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let body = serde_json::to_string(&self.payload).map_err(|_| fmt::Error)?;
        write!(f, "{body}")
    }
}

impl Serialize for LifecycleEvent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.payload.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LifecycleEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        LifecycleEvent::from_value(value).map_err(serde::de::Error::custom)
    }
}

/// Body of the one-time registration call: the event kinds we want delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub events: Vec<EventType>,
}

impl RegisterRequest {
    pub fn new(events: Vec<EventType>) -> Self {
        Self { events }
    }
}

/// Subscribe to both invocation and shutdown events.
impl Default for RegisterRequest {
    fn default() -> Self {
        Self::new(vec![EventType::Invoke, EventType::Shutdown])
    }
}
