//! Error surface for bootstrapping and tearing down a server instance.

use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use nix::errno::Errno;
use thiserror::Error;

use crate::schema::AdminError;
use crate::server::Server;

/// Errors raised while managing an ephemeral server instance.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A required executable is absent from every search directory.
    #[error("can't find the '{program}' program in {searched} search directories")]
    ExecutableNotFound {
        /// Executable name that was looked up.
        program: String,
        /// Number of directories that were inspected.
        searched: usize,
    },
    /// Printing the server defaults failed.
    #[error("failed to probe defaults from {program:?}: {source}")]
    ProbeFailed {
        /// Server executable that was probed.
        program: PathBuf,
        /// How the probe invocation failed.
        #[source]
        source: CommandFailure,
    },
    /// Every candidate workspace name is already taken.
    #[error("too many temporary workspaces exist under {temp_root:?} ({attempts} names tried)")]
    TooManyWorkspaces {
        /// Directory the workspace was allocated in.
        temp_root: PathBuf,
        /// Number of candidate names tried.
        attempts: u32,
    },
    /// A workspace directory could not be created.
    #[error("failed to create workspace directory {path:?}: {source}")]
    WorkspaceInitFailed {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The data-directory initialiser failed.
    #[error("failed to initialise data directory with {program:?}: {source}")]
    SchemaBootstrapFailed {
        /// Initialiser executable.
        program: PathBuf,
        /// Failure including the captured combined output.
        #[source]
        source: CommandFailure,
    },
    /// The server process could not be started.
    #[error("failed to launch {program:?}: {source}")]
    LaunchFailed {
        /// Server executable.
        program: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The pid file did not appear within the polling ceiling.
    #[error("server did not create {pid_path:?} within {timeout:?}; it looks like it has not started")]
    StartupTimeout {
        /// Pid file that was polled.
        pid_path: PathBuf,
        /// Total polling budget.
        timeout: Duration,
    },
    /// The server exited before it reported readiness.
    #[error("server exited before becoming ready ({status})")]
    ServerExited {
        /// Exit status of the launched child.
        status: ExitStatus,
    },
    /// The pid file could not be read or parsed.
    #[error("failed to read pid file {path:?}: {source}")]
    PidReadFailed {
        /// Pid file path.
        path: PathBuf,
        /// Read or parse failure.
        #[source]
        source: PidFileError,
    },
    /// Creating the scratch schema failed.
    #[error("failed to create scratch schema '{schema}': {source}")]
    SchemaCreateFailed {
        /// Schema that was being created.
        schema: String,
        /// Connection or statement failure.
        #[source]
        source: AdminError,
    },
    /// The termination signal could not be delivered.
    #[error("failed to signal server pid {pid}: {source}")]
    SignalFailed {
        /// Recorded process identifier.
        pid: u32,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
    /// The server did not stop within the polling ceiling.
    #[error("server did not stop within {timeout:?}; workspace kept for inspection, check {pid_path:?}")]
    ShutdownTimeout {
        /// Pid file that is still present.
        pid_path: PathBuf,
        /// Total polling budget.
        timeout: Duration,
    },
    /// The workspace tree could not be removed.
    #[error("failed to remove workspace {path:?}: {source}")]
    CleanupFailed {
        /// Workspace root.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Failure modes of a helper command run to completion.
#[derive(Debug, Error)]
pub enum CommandFailure {
    /// The executable could not be run at all.
    #[error("could not run command: {0}")]
    Spawn(#[source] io::Error),
    /// The command ran but exited unsuccessfully.
    #[error("command exited with {status}: {output}")]
    Exit {
        /// Exit status reported by the command.
        status: ExitStatus,
        /// Captured output, trimmed.
        output: String,
    },
}

/// Reasons a pid file could not be turned into a process identifier.
#[derive(Debug, Error)]
pub enum PidFileError {
    /// Reading the file failed.
    #[error("read failed: {0}")]
    Read(#[source] io::Error),
    /// The content was not a decimal integer.
    #[error("content {content:?} is not a process id: {source}")]
    Parse {
        /// Trimmed file content.
        content: String,
        /// Underlying parse error.
        #[source]
        source: ParseIntError,
    },
}

/// Bootstrap failure paired with whatever part of the instance was built.
///
/// The handle is present as soon as a workspace exists. Callers should run
/// [`Server::destroy`] on it so the workspace and any launched process are
/// released.
#[derive(Debug, Error)]
#[error("server bootstrap failed")]
pub struct StartFailure {
    #[source]
    error: ServerError,
    server: Option<Box<Server>>,
}

impl StartFailure {
    pub(crate) fn new(error: ServerError, server: Option<Server>) -> Self {
        Self {
            error,
            server: server.map(Box::new),
        }
    }

    /// The error that stopped the bootstrap.
    #[must_use]
    pub const fn error(&self) -> &ServerError {
        &self.error
    }

    /// The partially built handle, if a workspace was allocated.
    #[must_use]
    pub fn server(&self) -> Option<&Server> {
        self.server.as_deref()
    }

    /// Splits the failure into the error and the partial handle.
    #[must_use]
    pub fn into_parts(self) -> (ServerError, Option<Server>) {
        (self.error, self.server.map(|server| *server))
    }
}
