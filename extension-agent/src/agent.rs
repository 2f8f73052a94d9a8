use std::future::Future;

use extension_common::{ExtensionId, LifecycleApi, LifecycleEvent, RegisterRequest};
use tracing::{debug, error, info};

use crate::error::AgentError;
use crate::handler::{EventHandler, ProcessingFailurePolicy};
use crate::probe::DiagnosticProbe;
use crate::signals::Signal;

/// Lifecycle of an `ExtensionAgent`. `Terminated` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Unregistered,
    Registered,
    Polling,
    Terminated,
}

/// What to do after an event was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Continue,
    Terminate,
}

/// Why a run of the agent ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The host delivered a SHUTDOWN event.
    Shutdown,
    /// A termination signal arrived first.
    Signalled(Signal),
}

/// Registers with the host lifecycle API and processes the events it delivers, one at a time.
pub struct ExtensionAgent<A, H> {
    /// The name we register with. Must match the deployment directory.
    name: String,
    api: A,
    handler: H,
    failure_policy: ProcessingFailurePolicy,
    /// Optional connectivity check run before and after registration.
    probe: Option<DiagnosticProbe>,
    state: AgentState,
}

impl<A: LifecycleApi, H: EventHandler> ExtensionAgent<A, H> {
    pub fn new(name: &str, api: A, handler: H) -> Self {
        Self {
            name: name.to_owned(),
            api,
            handler,
            failure_policy: ProcessingFailurePolicy::default(),
            probe: None,
            state: AgentState::Unregistered,
        }
    }

    pub fn with_failure_policy(mut self, failure_policy: ProcessingFailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn with_probe(mut self, probe: DiagnosticProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Register for INVOKE and SHUTDOWN events. Happens exactly once: a failure is final and
    /// leaves the agent unregistered.
    pub async fn register(&mut self) -> Result<ExtensionId, AgentError> {
        match self.state {
            AgentState::Unregistered => {}
            AgentState::Terminated => return Err(AgentError::Terminated),
            _ => return Err(AgentError::AlreadyRegistered),
        }

        info!(extension = %self.name, "registering");

        let id = self
            .api
            .register(&self.name, &RegisterRequest::default())
            .await
            .map_err(AgentError::Registration)?;

        info!(extension = %self.name, id = %id, "registered");
        self.state = AgentState::Registered;

        Ok(id)
    }

    /// Wait for the host to deliver the next event. There is no timeout: the host decides
    /// when this returns. Taking `&mut self` keeps at most one poll outstanding.
    pub async fn poll_next_event(
        &mut self,
        id: &ExtensionId,
    ) -> Result<LifecycleEvent, AgentError> {
        match self.state {
            // A poll whose future was dropped before completing leaves us in `Polling`.
            AgentState::Registered | AgentState::Polling => {}
            AgentState::Unregistered => return Err(AgentError::NotRegistered),
            AgentState::Terminated => return Err(AgentError::Terminated),
        }

        debug!(extension = %self.name, "waiting for event");
        self.state = AgentState::Polling;

        match self.api.next_event(id).await {
            Ok(event) => {
                self.state = AgentState::Registered;
                Ok(event)
            }
            Err(error) => {
                self.state = AgentState::Terminated;
                Err(AgentError::Poll(error))
            }
        }
    }

    /// Handle a single event: SHUTDOWN terminates the agent, anything else goes through the
    /// processing hook exactly once.
    pub fn dispatch(&mut self, event: &LifecycleEvent) -> Result<Dispatch, AgentError> {
        match self.state {
            AgentState::Unregistered => return Err(AgentError::NotRegistered),
            AgentState::Terminated => return Err(AgentError::Terminated),
            AgentState::Registered | AgentState::Polling => {}
        }

        if event.is_shutdown() {
            info!(
                extension = %self.name,
                reason = event.shutdown_reason(),
                "received SHUTDOWN event, exiting"
            );
            self.state = AgentState::Terminated;
            return Ok(Dispatch::Terminate);
        }

        match self.handler.handle(event) {
            Ok(()) => Ok(Dispatch::Continue),
            Err(error) => match self.failure_policy {
                ProcessingFailurePolicy::Propagate => {
                    self.state = AgentState::Terminated;
                    Err(AgentError::Processing(error))
                }
                ProcessingFailurePolicy::Isolate => {
                    error!(extension = %self.name, %error, "event processing failed, continuing");
                    Ok(Dispatch::Continue)
                }
            },
        }
    }

    /// Register, then process events until the host asks us to shut down.
    pub async fn run(&mut self) -> Result<ExitReason, AgentError> {
        self.run_probe("before registration").await;
        let id = self.register().await?;
        self.run_probe("after registration").await;

        loop {
            let event = self.poll_next_event(&id).await?;

            if self.dispatch(&event)? == Dispatch::Terminate {
                return Ok(ExitReason::Shutdown);
            }
        }
    }

    /// Like `run`, but give up as soon as `signal` resolves. An outstanding poll is dropped,
    /// not completed or retried.
    pub async fn run_until<S>(&mut self, signal: S) -> Result<ExitReason, AgentError>
    where
        S: Future<Output = Signal>,
    {
        let signal = tokio::select! {
            outcome = self.run() => return outcome,
            signal = signal => signal,
        };

        info!(extension = %self.name, %signal, "received signal, exiting");
        self.state = AgentState::Terminated;

        Ok(ExitReason::Signalled(signal))
    }

    async fn run_probe(&self, stage: &str) {
        if let Some(probe) = &self.probe {
            info!(extension = %self.name, "making diagnostic request {stage}");
            probe.check().await;
        }
    }
}
