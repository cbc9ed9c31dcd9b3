//! Teardown controller: stop the server, then erase its workspace.
//!
//! ```text
//! Running ──signal──▶ Signaled ──pid file gone──▶ Stopped ──▶ workspace removed
//!                         └──────ceiling hit─────▶ StuckTimeout (workspace kept)
//! ```

use std::fs;
use std::io;
use std::path::Path;

use nix::errno::Errno;
use tracing::{info, warn};

use crate::error::ServerError;
use crate::process::signal_terminate;
use crate::readiness::PollSchedule;
use crate::server::{LIFECYCLE_TARGET, Server};

/// Progress of a server through teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownState {
    /// No stop has been requested yet.
    Running,
    /// The termination signal was delivered; waiting for exit.
    Signaled,
    /// The process has exited.
    Stopped,
    /// The process outlived the shutdown ceiling.
    StuckTimeout,
}

impl Server {
    /// Stops the server and removes its workspace.
    ///
    /// Safe on a partially started handle: with no recorded process id the
    /// signal step is skipped (a launched child is killed outright) and the
    /// workspace is still removed. If the server does not stop in time the
    /// workspace is left in place for inspection and the call may be retried.
    /// Calling it again after success is a no-op.
    pub fn destroy(&mut self) -> Result<(), ServerError> {
        self.destroy_with(PollSchedule::STANDARD)
    }

    pub(crate) fn destroy_with(&mut self, schedule: PollSchedule) -> Result<(), ServerError> {
        match (self.state, self.pid) {
            (TeardownState::Stopped, _) => {}
            (_, Some(pid)) if pid != 0 => self.stop(pid, schedule)?,
            _ => self.stop_unready(),
        }
        remove_workspace(self.workspace().root())?;
        self.released = true;
        Ok(())
    }

    fn stop(&mut self, pid: u32, schedule: PollSchedule) -> Result<(), ServerError> {
        match signal_terminate(pid) {
            Ok(()) => self.state = TeardownState::Signaled,
            // Already gone, e.g. a retry after the server finally exited.
            Err(ServerError::SignalFailed {
                source: Errno::ESRCH,
                ..
            }) if !self.pid_file_path().exists() => {
                info!(target: LIFECYCLE_TARGET, pid, "server already exited; signal skipped");
                self.state = TeardownState::Signaled;
            }
            Err(error) => return Err(error),
        }
        let pid_path = self.pid_file_path().to_path_buf();
        let process = &mut self.process;
        let exited = schedule.run(|| {
            let child_gone = process.as_mut().is_none_or(|child| child.has_exited());
            Ok::<_, ServerError>((!pid_path.exists() && child_gone).then_some(()))
        })?;
        if exited.is_none() {
            self.state = TeardownState::StuckTimeout;
            warn!(
                target: LIFECYCLE_TARGET,
                pid,
                workspace = %self.workspace_dir().display(),
                "server did not stop; workspace kept for inspection"
            );
            return Err(ServerError::ShutdownTimeout {
                pid_path,
                timeout: schedule.ceiling(),
            });
        }
        self.process = None;
        self.state = TeardownState::Stopped;
        info!(target: LIFECYCLE_TARGET, pid, "server stopped");
        Ok(())
    }

    fn stop_unready(&mut self) {
        if let Some(process) = self.process.take() {
            warn!(
                target: LIFECYCLE_TARGET,
                child = process.child_id(),
                "server never reported a pid; killing launched child"
            );
            process.force_stop();
        }
        self.state = TeardownState::Stopped;
    }
}

fn remove_workspace(root: &Path) -> Result<(), ServerError> {
    match fs::remove_dir_all(root) {
        Ok(()) => {
            info!(target: LIFECYCLE_TARGET, workspace = %root.display(), "workspace removed");
            Ok(())
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ServerError::CleanupFailed {
            path: root.to_path_buf(),
            source,
        }),
    }
}
