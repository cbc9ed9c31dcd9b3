//! Handle to the launched server process and signal delivery.
//!
//! Dropping a [`ServerProcess`] does not stop the server. Stopping it is the
//! teardown controller's job; a handle that is simply dropped leaks the
//! process.

use std::process::{Child, ExitStatus};

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tracing::{info, warn};

use crate::error::ServerError;

const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// Opaque owner of the launched server child.
#[derive(Debug)]
pub(crate) struct ServerProcess {
    child: Child,
}

impl ServerProcess {
    pub(crate) const fn new(child: Child) -> Self {
        Self { child }
    }

    /// Operating-system id of the launched child.
    #[must_use]
    pub(crate) fn child_id(&self) -> u32 {
        self.child.id()
    }

    /// Returns the exit status if the child has already exited.
    ///
    /// Never blocks. A child that can no longer be waited on counts as exited
    /// with no status.
    pub(crate) fn exit_status(&mut self) -> Option<ExitStatus> {
        match self.child.try_wait() {
            Ok(status) => status,
            Err(error) => {
                warn!(
                    target: PROCESS_TARGET,
                    pid = self.child.id(),
                    %error,
                    "failed to poll server child"
                );
                None
            }
        }
    }

    /// Returns `true` once the child has exited and been reaped.
    pub(crate) fn has_exited(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(status) => status.is_some(),
            // ECHILD: someone else already reaped it.
            Err(_) => true,
        }
    }

    /// Kills the child outright and reaps it.
    pub(crate) fn force_stop(mut self) {
        let pid = self.child.id();
        if let Err(error) = self.child.kill() {
            warn!(target: PROCESS_TARGET, pid, %error, "failed to kill server child");
        }
        match self.child.wait() {
            Ok(status) => info!(target: PROCESS_TARGET, pid, %status, "server child reaped"),
            Err(error) => warn!(target: PROCESS_TARGET, pid, %error, "failed to reap server child"),
        }
    }
}

/// Sends `SIGTERM` to the process recorded in the pid file.
pub(crate) fn signal_terminate(pid: u32) -> Result<(), ServerError> {
    let raw = i32::try_from(pid).map_err(|_| ServerError::SignalFailed {
        pid,
        source: Errno::EINVAL,
    })?;
    kill(Pid::from_raw(raw), Signal::SIGTERM)
        .map_err(|source| ServerError::SignalFailed { pid, source })?;
    info!(target: PROCESS_TARGET, pid, "termination signal delivered");
    Ok(())
}

/// Returns `true` while a process with `pid` exists (zombies included).
#[cfg(test)]
pub(crate) fn process_exists(pid: u32) -> bool {
    i32::try_from(pid).is_ok_and(|raw| match kill(Pid::from_raw(raw), None) {
        Ok(()) | Err(Errno::EPERM) => true,
        Err(_) => false,
    })
}
