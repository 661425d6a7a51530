//! Drives graceful shutdown from process signals
//!
//! [`sigint_or_sigterm`] returns a [`Shutdown`] and a [`Watch`]. Watches are
//! handed to controllers; when a signal arrives, each watch is notified and
//! shutdown completes once every watch has been released. A second signal
//! aborts the wait.

use tracing::{debug, info};

mod signals;

pub use drain::Watch;

/// Waits for a shutdown signal and then for all watches to be released
#[derive(Debug)]
#[must_use = "call `Shutdown::signaled` to await a signal"]
pub struct Shutdown {
    signals: signals::Signals,
    tx: drain::Signal,
}

/// Indicates that signal handlers could not be registered
#[derive(Debug, thiserror::Error)]
#[error("failed to register signal handler: {0}")]
pub struct RegisterError(#[from] std::io::Error);

/// Indicates that shutdown was cut short by a second signal
#[derive(Copy, Clone, Debug, thiserror::Error)]
#[error("process aborted by signal")]
pub struct Aborted(());

/// Creates a shutdown channel driven by SIGINT and SIGTERM (Ctrl-C and
/// Ctrl-Break on Windows).
pub fn sigint_or_sigterm() -> Result<(Shutdown, Watch), RegisterError> {
    let signals = signals::Signals::new()?;
    let (tx, rx) = drain::channel();
    Ok((Shutdown { signals, tx }, rx))
}

impl Shutdown {
    /// Completes once a signal has been received and every [`Watch`] has been
    /// released.
    pub async fn signaled(self) -> Result<(), Aborted> {
        let Self { mut signals, tx } = self;

        signals.recv().await;
        info!("Shutting down");

        tokio::select! {
            _ = tx.drain() => {
                debug!("Drained");
                Ok(())
            }
            _ = signals.recv() => {
                info!("Aborting shutdown on second signal");
                Err(Aborted(()))
            }
        }
    }
}
