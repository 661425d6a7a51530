#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};
#[cfg(windows)]
use tokio::signal::windows::{ctrl_break, ctrl_c, CtrlBreak, CtrlC};
use tracing::debug;

#[cfg(unix)]
#[derive(Debug)]
pub(super) struct Signals {
    interrupt: Signal,
    terminate: Signal,
}

#[cfg(windows)]
#[derive(Debug)]
pub(super) struct Signals {
    ctrl_c: CtrlC,
    ctrl_break: CtrlBreak,
}

#[cfg(unix)]
impl Signals {
    pub(super) fn new() -> std::io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    pub(super) async fn recv(&mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => debug!("Received SIGINT"),
            _ = self.terminate.recv() => debug!("Received SIGTERM"),
        }
    }
}

#[cfg(windows)]
impl Signals {
    pub(super) fn new() -> std::io::Result<Self> {
        Ok(Self {
            ctrl_c: ctrl_c()?,
            ctrl_break: ctrl_break()?,
        })
    }

    pub(super) async fn recv(&mut self) {
        tokio::select! {
            _ = self.ctrl_c.recv() => debug!("Received Ctrl-C"),
            _ = self.ctrl_break.recv() => debug!("Received Ctrl-Break"),
        }
    }
}
