//! Register with the host lifecycle API and process its events until shutdown.
use std::process::ExitCode;

use envconfig::Envconfig;
use extension_common::HttpLifecycleApi;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use extension_agent::agent::{ExitReason, ExtensionAgent};
use extension_agent::config::Config;
use extension_agent::error::AgentError;
use extension_agent::handler::LoggingHandler;
use extension_agent::probe::DiagnosticProbe;
use extension_agent::signals::TerminationSignals;

#[tokio::main]
async fn main() -> ExitCode {
    // RUST_LOG controls verbosity, info by default.
    let fmt_layer = fmt::layer().with_target(true).with_level(true).with_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );
    tracing_subscriber::registry().with(fmt_layer).init();

    match start().await {
        Ok(reason) => {
            info!(?reason, "extension agent exited");
            ExitCode::SUCCESS
        }
        Err(error) => {
            error!(%error, "extension agent failed");
            ExitCode::FAILURE
        }
    }
}

async fn start() -> Result<ExitReason, AgentError> {
    let signals = TerminationSignals::install().map_err(AgentError::SignalSetup)?;

    let config = Config::init_from_env()?;
    let name = config.extension_name()?;

    let api = HttpLifecycleApi::new(config.runtime_api.as_str()).map_err(AgentError::ApiSetup)?;

    let mut agent = ExtensionAgent::new(&name, api, LoggingHandler::new(&name))
        .with_failure_policy(config.processing_failure_policy());

    if config.probe_enabled {
        let probe = DiagnosticProbe::new(&config.probe_endpoint, config.probe_timeout.0)
            .map_err(AgentError::ProbeSetup)?;
        agent = agent.with_probe(probe);
    }

    agent.run_until(signals.recv()).await
}
