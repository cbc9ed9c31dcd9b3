//! The `Server` handle and the bootstrap sequence that produces it.

use std::fmt;
use std::path::{Path, PathBuf};

use tmpmysql_config::Config;
use tracing::{error, info, warn};

use crate::error::{ServerError, StartFailure};
use crate::launch::{initialise_data_dir, spawn_server};
use crate::probe::{Executables, SearchPath, ServerDefaults, probe_defaults};
use crate::process::ServerProcess;
use crate::readiness::{PollSchedule, wait_for_ready};
use crate::schema::{AdminConnector, MysqlAdmin, SCRATCH_SCHEMA, connection_url};
use crate::teardown::TeardownState;
use crate::workspace::Workspace;

pub(crate) const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// One ephemeral server instance and the workspace it owns.
///
/// The handle must be released with [`Server::destroy`]. Dropping it without
/// a successful destroy leaves the process running and the workspace on disk;
/// the drop only logs a warning naming what was leaked.
pub struct Server {
    connection_string: String,
    workspace: Workspace,
    pub(crate) pid: Option<u32>,
    pub(crate) process: Option<ServerProcess>,
    pub(crate) state: TeardownState,
    pub(crate) released: bool,
}

impl Server {
    /// Bootstraps an instance with the default configuration.
    pub fn start() -> Result<Self, StartFailure> {
        ServerBuilder::default().start()
    }

    fn new(workspace: Workspace) -> Self {
        Self {
            connection_string: connection_url(workspace.socket_path(), SCRATCH_SCHEMA),
            workspace,
            pid: None,
            process: None,
            state: TeardownState::Running,
            released: false,
        }
    }

    /// Descriptor a client can use to reach the scratch schema.
    #[must_use]
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// Private directory holding every file of this instance.
    #[must_use]
    pub fn workspace_dir(&self) -> &Path {
        self.workspace.root()
    }

    /// File the server records its process id in.
    #[must_use]
    pub fn pid_file_path(&self) -> &Path {
        self.workspace.pid_path()
    }

    /// Unix socket the server listens on.
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        self.workspace.socket_path()
    }

    /// Process id read from the pid file, once readiness was confirmed.
    #[must_use]
    pub const fn process_id(&self) -> Option<u32> {
        self.pid
    }

    /// Where teardown currently stands.
    #[must_use]
    pub const fn teardown_state(&self) -> TeardownState {
        self.state
    }

    pub(crate) const fn workspace(&self) -> &Workspace {
        &self.workspace
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Server")
            .field("connection_string", &self.connection_string)
            .field("workspace_dir", &self.workspace.root())
            .field("pid", &self.pid)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!(
            target: LIFECYCLE_TARGET,
            workspace = %self.workspace.root().display(),
            pid = ?self.pid,
            "server handle dropped without a successful destroy; process and workspace leaked"
        );
    }
}

/// Assembles the collaborators used to bootstrap a [`Server`].
pub struct ServerBuilder {
    config: Config,
    search_path: SearchPath,
    temp_root: PathBuf,
    admin: Box<dyn AdminConnector>,
    schedule: PollSchedule,
}

impl ServerBuilder {
    /// Builder using `config`, the process `PATH`, and the system temp dir.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            search_path: SearchPath::from_env(),
            temp_root: std::env::temp_dir(),
            admin: Box::new(MysqlAdmin),
            schedule: PollSchedule::STANDARD,
        }
    }

    /// Replaces the executable search path.
    #[must_use]
    pub fn search_path(mut self, search_path: SearchPath) -> Self {
        self.search_path = search_path;
        self
    }

    /// Allocates the workspace under `temp_root` instead of the system temp dir.
    #[must_use]
    pub fn temp_root(mut self, temp_root: impl Into<PathBuf>) -> Self {
        self.temp_root = temp_root.into();
        self
    }

    /// Replaces the client used to create the scratch schema.
    #[must_use]
    pub fn admin_connector(mut self, admin: Box<dyn AdminConnector>) -> Self {
        self.admin = admin;
        self
    }

    #[cfg(test)]
    pub(crate) fn poll_schedule(mut self, schedule: PollSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Runs the bootstrap sequence.
    ///
    /// On failure the returned [`StartFailure`] carries the partial handle
    /// whenever a workspace was allocated; destroy it to release whatever was
    /// created.
    pub fn start(self) -> Result<Server, StartFailure> {
        let executables = Executables::locate(&self.search_path, &self.config)
            .map_err(|error| StartFailure::new(error, None))?;
        let defaults =
            probe_defaults(executables.server()).map_err(|error| StartFailure::new(error, None))?;
        let workspace = Workspace::allocate_in(&self.temp_root)
            .map_err(|error| StartFailure::new(error, None))?;
        let mut server = Server::new(workspace);
        match self.bootstrap(&mut server, &executables, &defaults) {
            Ok(()) => {
                info!(
                    target: LIFECYCLE_TARGET,
                    workspace = %server.workspace_dir().display(),
                    pid = ?server.pid,
                    "server ready"
                );
                Ok(server)
            }
            Err(error) => {
                error!(
                    target: LIFECYCLE_TARGET,
                    workspace = %server.workspace_dir().display(),
                    %error,
                    "server bootstrap failed; destroy the partial handle to clean up"
                );
                Err(StartFailure::new(error, Some(server)))
            }
        }
    }

    fn bootstrap(
        &self,
        server: &mut Server,
        executables: &Executables,
        defaults: &ServerDefaults,
    ) -> Result<(), ServerError> {
        let workspace = server.workspace().clone();
        workspace.prepare()?;
        initialise_data_dir(executables.installer(), defaults, &workspace)?;
        let process = server
            .process
            .insert(spawn_server(executables.server(), defaults, &workspace)?);
        server.pid = Some(wait_for_ready(
            workspace.pid_path(),
            Some(process),
            self.schedule,
        )?);
        self.admin
            .create_schema(workspace.socket_path(), SCRATCH_SCHEMA)
            .map_err(|source| ServerError::SchemaCreateFailed {
                schema: SCRATCH_SCHEMA.to_owned(),
                source,
            })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl fmt::Debug for ServerBuilder {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ServerBuilder")
            .field("config", &self.config)
            .field("search_path", &self.search_path)
            .field("temp_root", &self.temp_root)
            .field("schedule", &self.schedule)
            .finish_non_exhaustive()
    }
}
