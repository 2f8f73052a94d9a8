use std::fmt;
use std::io;

use tokio::signal::unix::{self, SignalKind};

/// Termination signals the host environment may send us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Interrupt,
    Terminate,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Signal::Interrupt => write!(f, "SIGINT"),
            Signal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// SIGINT and SIGTERM listeners. Installing them replaces the default action of killing
/// the process, so this must happen before anything that can block.
pub struct TerminationSignals {
    interrupt: unix::Signal,
    terminate: unix::Signal,
}

impl TerminationSignals {
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            interrupt: unix::signal(SignalKind::interrupt())?,
            terminate: unix::signal(SignalKind::terminate())?,
        })
    }

    /// Resolve with the first termination signal delivered after installation.
    pub async fn recv(mut self) -> Signal {
        tokio::select! {
            _ = self.interrupt.recv() => Signal::Interrupt,
            _ = self.terminate.recv() => Signal::Terminate,
        }
    }
}
