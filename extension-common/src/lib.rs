//! Types and a client for the host lifecycle API that extensions register with.
pub mod api;
pub mod error;
pub mod event;

pub use api::{ExtensionId, HttpLifecycleApi, LifecycleApi};
pub use error::ApiError;
pub use event::{EventType, LifecycleEvent, RegisterRequest};
