//! Graceful shutdown coordination
//!
//! Captures process-level interrupt/termination signals into a
//! single atomic flag. The listener does nothing but record which
//! signal arrived; all real work (logging, saving) happens on the
//! resolver's normal execution path when it polls the flag between
//! records.

use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

/// A process signal observed by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Interrupt,
    Terminate,
}

impl Signal {
    const SIGINT: i32 = 2;
    const SIGTERM: i32 = 15;

    fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            Self::SIGINT => Some(Self::Interrupt),
            Self::SIGTERM => Some(Self::Terminate),
            _ => None,
        }
    }

    fn raw(self) -> i32 {
        match self {
            Self::Interrupt => Self::SIGINT,
            Self::Terminate => Self::SIGTERM,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt => write!(f, "SIGINT"),
            Self::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Owns the cancellation flag shared between the signal listener
/// and the resolver loop.
#[derive(Debug, Clone, Default)]
pub struct ShutdownCoordinator {
    signal: Arc<AtomicI32>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the signal listener task.
    ///
    /// On unix this waits for SIGINT or SIGTERM; elsewhere for
    /// Ctrl+C. The listener only stores the signal number.
    pub fn install(&self) {
        let flag = self.signal.clone();

        tokio::spawn(async move {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};

                let mut sigterm = match signal(SignalKind::terminate()) {
                    Ok(stream) => stream,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to install SIGTERM handler");
                        return;
                    }
                };

                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        flag.store(Signal::Interrupt.raw(), Ordering::SeqCst);
                    }
                    _ = sigterm.recv() => {
                        flag.store(Signal::Terminate.raw(), Ordering::SeqCst);
                    }
                }
            }

            #[cfg(not(unix))]
            {
                if tokio::signal::ctrl_c().await.is_ok() {
                    flag.store(Signal::Interrupt.raw(), Ordering::SeqCst);
                }
            }
        });
    }

    /// The observed signal, if any. Polled between units of work.
    pub fn triggered(&self) -> Option<Signal> {
        Signal::from_raw(self.signal.load(Ordering::SeqCst))
    }

    /// Record a signal directly (what the listener does on receipt).
    pub fn notify(&self, signal: Signal) {
        self.signal.store(signal.raw(), Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untriggered_by_default() {
        let coordinator = ShutdownCoordinator::new();
        assert_eq!(coordinator.triggered(), None);
    }

    #[test]
    fn test_notify_records_signal_identity() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.notify(Signal::Terminate);
        assert_eq!(coordinator.triggered(), Some(Signal::Terminate));
    }

    #[test]
    fn test_clones_share_the_flag() {
        let coordinator = ShutdownCoordinator::new();
        let observer = coordinator.clone();
        coordinator.notify(Signal::Interrupt);
        assert_eq!(observer.triggered(), Some(Signal::Interrupt));
    }

    #[test]
    fn test_signal_names() {
        assert_eq!(Signal::Interrupt.to_string(), "SIGINT");
        assert_eq!(Signal::Terminate.to_string(), "SIGTERM");
    }
}
