//! Ephemeral MySQL servers for tests.
//!
//! A [`Server`] is a throwaway `mysqld` bound to a Unix socket inside a
//! private temporary directory. Bootstrapping runs a fixed sequence:
//!
//! 1. locate `mysqld` and `mysql_install_db` and read the server's defaults;
//! 2. claim a fresh `tmpmysql_NNNN` workspace under the temp directory;
//! 3. initialise a data directory and launch the server with networking off;
//! 4. poll for the pid file (100 ms × 100) to confirm readiness;
//! 5. create the `test` scratch schema over the socket.
//!
//! [`Server::destroy`] reverses it: `SIGTERM`, poll for the pid file to vanish
//! on the same schedule, then remove the workspace. Nothing is reclaimed
//! automatically; a handle dropped without `destroy` leaks its process and
//! workspace.
//!
//! ```rust,no_run
//! use tmpmysql::Server;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = match Server::start() {
//!     Ok(server) => server,
//!     Err(failure) => {
//!         let (error, partial) = failure.into_parts();
//!         if let Some(mut handle) = partial {
//!             handle.destroy()?;
//!         }
//!         return Err(error.into());
//!     }
//! };
//! let url = server.connection_string().to_owned();
//! // ... connect with `mysql_async::Opts::from_url(&url)` ...
//! server.destroy()?;
//! # Ok(()) }
//! ```

mod error;
mod launch;
mod probe;
mod process;
mod readiness;
mod runtime;
mod schema;
mod server;
pub mod telemetry;
mod teardown;
mod workspace;

pub use error::{CommandFailure, PidFileError, ServerError, StartFailure};
pub use probe::{Executables, SearchPath, ServerDefaults, extract_default, probe_defaults};
pub use readiness::{POLL_ATTEMPTS, POLL_INTERVAL};
pub use schema::{ADMIN_USER, AdminConnector, AdminError, MysqlAdmin, SCRATCH_SCHEMA, connection_url};
pub use server::{Server, ServerBuilder};
pub use teardown::TeardownState;
pub use tmpmysql_config::{Config, OrthoConfig};
pub use workspace::{MAX_WORKSPACES, WORKSPACE_PREFIX, Workspace};

#[cfg(test)]
mod tests;
