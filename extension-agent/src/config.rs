use std::path::Path;
use std::str::FromStr;
use std::time;

use envconfig::Envconfig;

use crate::error::AgentError;
use crate::handler::ProcessingFailurePolicy;

#[derive(Envconfig, Clone)]
pub struct Config {
    /// Address of the host lifecycle API, usually `host:port`.
    #[envconfig(from = "LIFECYCLE_RUNTIME_API")]
    pub runtime_api: NonEmptyString,

    /// Registered name. Derived from the deployment directory when unset.
    #[envconfig(from = "LIFECYCLE_EXTENSION_NAME")]
    pub extension_name: Option<NonEmptyString>,

    #[envconfig(from = "ENDPOINT", default = "https://google.com")]
    pub probe_endpoint: String,

    #[envconfig(from = "PROBE_ENABLED", default = "true")]
    pub probe_enabled: bool,

    #[envconfig(from = "PROBE_TIMEOUT_MS", default = "5000")]
    pub probe_timeout: EnvMsDuration,

    #[envconfig(from = "ISOLATE_PROCESSING_FAILURES", default = "false")]
    pub isolate_processing_failures: bool,
}

impl Config {
    /// The name to register with. The host only accepts the name of the directory the
    /// extension executable was deployed to, so that is what we use unless overridden.
    pub fn extension_name(&self) -> Result<String, AgentError> {
        if let Some(name) = &self.extension_name {
            return Ok(name.as_str().to_owned());
        }

        let executable = std::env::current_exe().map_err(AgentError::CurrentExecutable)?;

        extension_name_from_path(&executable)
            .ok_or_else(|| AgentError::ExtensionName(executable.display().to_string()))
    }

    pub fn processing_failure_policy(&self) -> ProcessingFailurePolicy {
        if self.isolate_processing_failures {
            ProcessingFailurePolicy::Isolate
        } else {
            ProcessingFailurePolicy::Propagate
        }
    }
}

/// Name of the directory that contains `executable`.
pub fn extension_name_from_path(executable: &Path) -> Option<String> {
    executable
        .parent()?
        .file_name()?
        .to_str()
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
}

#[derive(Debug, Clone, Copy)]
pub struct EnvMsDuration(pub time::Duration);

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEnvMsDurationError;

impl FromStr for EnvMsDuration {
    type Err = ParseEnvMsDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ms = s.parse::<u64>().map_err(|_| ParseEnvMsDurationError)?;

        Ok(EnvMsDuration(time::Duration::from_millis(ms)))
    }
}

#[derive(Debug, Clone)]
pub struct NonEmptyString(pub String);

impl NonEmptyString {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct StringIsEmptyError;

impl FromStr for NonEmptyString {
    type Err = StringIsEmptyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            Err(StringIsEmptyError)
        } else {
            Ok(NonEmptyString(s.to_owned()))
        }
    }
}
