//! Bounded polling on the pid file.
//!
//! Both readiness and shutdown are observed through the pid file: the server
//! creates it once it accepts connections and removes it on the way out.

use std::fs;
use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{PidFileError, ServerError};
use crate::process::ServerProcess;

const READINESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::readiness");

/// Delay between two pid-file checks.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Number of delays before a wait is abandoned.
pub const POLL_ATTEMPTS: u32 = 100;

/// Fixed polling cadence shared by readiness and shutdown detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PollSchedule {
    interval: Duration,
    attempts: u32,
}

impl PollSchedule {
    pub(crate) const STANDARD: Self = Self::new(POLL_INTERVAL, POLL_ATTEMPTS);

    pub(crate) const fn new(interval: Duration, attempts: u32) -> Self {
        Self { interval, attempts }
    }

    /// Total time a wait may take.
    pub(crate) fn ceiling(self) -> Duration {
        self.interval.saturating_mul(self.attempts)
    }

    /// Runs `probe` until it yields a value or the schedule is exhausted.
    ///
    /// The probe runs once up front and again after every interval, so a
    /// condition that already holds costs no sleep.
    pub(crate) fn run<T, E, F>(self, mut probe: F) -> Result<Option<T>, E>
    where
        F: FnMut() -> Result<Option<T>, E>,
    {
        if let Some(value) = probe()? {
            return Ok(Some(value));
        }
        for attempt in 1..=self.attempts {
            thread::sleep(self.interval);
            if let Some(value) = probe()? {
                debug!(target: READINESS_TARGET, attempt, "poll condition met");
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

/// Blocks until the pid file holds a process id.
///
/// When `process` is supplied the launched child is checked on every tick and
/// an early exit fails the wait immediately.
pub(crate) fn wait_for_ready(
    pid_path: &Path,
    mut process: Option<&mut ServerProcess>,
    schedule: PollSchedule,
) -> Result<u32, ServerError> {
    let outcome = schedule.run(|| {
        if let Some(pid) = read_pid(pid_path)? {
            return Ok(Some(pid));
        }
        match process.as_deref_mut().and_then(ServerProcess::exit_status) {
            Some(status) => Err(ServerError::ServerExited { status }),
            None => Ok(None),
        }
    })?;
    match outcome {
        Some(pid) => {
            info!(
                target: READINESS_TARGET,
                pid,
                pid_file = %pid_path.display(),
                "server reported ready"
            );
            Ok(pid)
        }
        None => Err(ServerError::StartupTimeout {
            pid_path: pid_path.to_path_buf(),
            timeout: schedule.ceiling(),
        }),
    }
}

/// Reads the process id from `path`.
///
/// A missing or still-empty file yields `Ok(None)`.
pub(crate) fn read_pid(path: &Path) -> Result<Option<u32>, ServerError> {
    let failed = |source| ServerError::PidReadFailed {
        path: path.to_path_buf(),
        source,
    };
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(failed(PidFileError::Read(error))),
    };
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed.parse::<u32>().map(Some).map_err(|source| {
        failed(PidFileError::Parse {
            content: trimmed.to_owned(),
            source,
        })
    })
}
