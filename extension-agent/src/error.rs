use extension_common::ApiError;
use thiserror::Error;

use crate::handler::ProcessingError;

/// Enumeration of errors that stop the `ExtensionAgent`. Every one of them is fatal.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("invalid configuration: {0}")]
    Config(#[from] envconfig::Error),
    #[error("could not locate the extension executable: {0}")]
    CurrentExecutable(std::io::Error),
    #[error("could not derive an extension name from {0}")]
    ExtensionName(String),
    #[error("failed to install signal handlers: {0}")]
    SignalSetup(std::io::Error),
    #[error("failed to set up the lifecycle API client: {0}")]
    ApiSetup(ApiError),
    #[error("failed to set up the diagnostic probe: {0}")]
    ProbeSetup(reqwest::Error),
    #[error("registration failed: {0}")]
    Registration(ApiError),
    #[error("the agent is already registered")]
    AlreadyRegistered,
    #[error("the agent must register before polling for events")]
    NotRegistered,
    #[error("the agent has terminated")]
    Terminated,
    #[error("polling for the next event failed: {0}")]
    Poll(ApiError),
    #[error(transparent)]
    Processing(#[from] ProcessingError),
}
