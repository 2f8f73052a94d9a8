use extension_common::{EventType, LifecycleEvent};
use thiserror::Error;
use tracing::info;

/// Raised by an `EventHandler` that could not process an event.
#[derive(Error, Debug)]
#[error("failed to process {event_type} event: {reason}")]
pub struct ProcessingError {
    pub event_type: EventType,
    pub reason: String,
}

impl ProcessingError {
    pub fn new(event: &LifecycleEvent, reason: impl Into<String>) -> Self {
        Self {
            event_type: event.event_type().clone(),
            reason: reason.into(),
        }
    }
}

/// What the agent does when an `EventHandler` fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingFailurePolicy {
    /// Stop the agent with the processing error.
    #[default]
    Propagate,
    /// Log the error and keep polling.
    Isolate,
}

/// Per-event processing hook. Called exactly once for every non-shutdown event, before the
/// next event is requested.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &LifecycleEvent) -> Result<(), ProcessingError>;
}

impl<F> EventHandler for F
where
    F: Fn(&LifecycleEvent) -> Result<(), ProcessingError> + Send + Sync,
{
    fn handle(&self, event: &LifecycleEvent) -> Result<(), ProcessingError> {
        self(event)
    }
}

/// Logs every event it receives with its full body.
pub struct LoggingHandler {
    extension_name: String,
}

impl LoggingHandler {
    pub fn new(extension_name: &str) -> Self {
        Self {
            extension_name: extension_name.to_owned(),
        }
    }
}

impl EventHandler for LoggingHandler {
    fn handle(&self, event: &LifecycleEvent) -> Result<(), ProcessingError> {
        info!(
            extension = %self.extension_name,
            event_type = %event.event_type(),
            request_id = event.request_id(),
            "{}",
            describe_event(&self.extension_name, event)
        );
        Ok(())
    }
}

pub fn describe_event(extension_name: &str, event: &LifecycleEvent) -> String {
    format!("[{extension_name}] Received event: {event}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_describe_event_keeps_full_payload() {
        let original = json!({"eventType": "INVOKE", "foo": "bar"});
        let event = LifecycleEvent::from_value(original.clone()).unwrap();

        let line = describe_event("my-extension", &event);

        let (prefix, body) = line
            .split_once(": ")
            .expect("line should contain a payload");
        assert_eq!(prefix, "[my-extension] Received event");
        let logged: Value = serde_json::from_str(body).expect("payload should be JSON");
        assert_eq!(logged, original);
    }

    #[test]
    fn test_logging_handler_never_fails() {
        let handler = LoggingHandler::new("my-extension");
        let event = LifecycleEvent::from_value(json!({"eventType": "RESTORE"})).unwrap();

        assert!(handler.handle(&event).is_ok());
    }

    #[test]
    fn test_closure_handler() {
        let handler = |event: &LifecycleEvent| match event.request_id() {
            Some(_) => Ok(()),
            None => Err(ProcessingError::new(event, "missing request id")),
        };
        let event = LifecycleEvent::from_value(json!({"eventType": "INVOKE"})).unwrap();

        let error = handler.handle(&event).unwrap_err();

        assert_eq!(error.event_type, EventType::Invoke);
        assert_eq!(
            error.to_string(),
            "failed to process INVOKE event: missing request id"
        );
    }
}
