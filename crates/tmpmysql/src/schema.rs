//! Scratch schema creation over the instance's private socket.

use std::io;
use std::path::{Path, PathBuf};

use mysql_async::prelude::Queryable as _;
use mysql_async::{Conn, OptsBuilder};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use thiserror::Error;
use tracing::info;

use crate::runtime::build_runtime;

const SCHEMA_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::schema");

/// Schema created for the caller inside every instance.
pub const SCRATCH_SCHEMA: &str = "test";

/// Administrative account; freshly initialised data directories leave it
/// without a password.
pub const ADMIN_USER: &str = "root";

/// Connection descriptor for `schema` reachable through `socket`.
///
/// The result is a URL accepted by `mysql_async::Opts::from_url`.
#[must_use]
pub fn connection_url(socket: &Path, schema: &str) -> String {
    let socket_text = socket.to_string_lossy();
    let encoded = utf8_percent_encode(&socket_text, NON_ALPHANUMERIC);
    format!("mysql://{ADMIN_USER}@localhost/{schema}?socket={encoded}")
}

/// Errors raised by the administrative connection.
#[derive(Debug, Error)]
pub enum AdminError {
    /// The async runtime backing the connection could not be built.
    #[error("failed to build connection runtime: {0}")]
    Runtime(#[source] io::Error),
    /// The driver addresses sockets by UTF-8 path.
    #[error("socket path {0:?} is not valid UTF-8")]
    SocketPath(PathBuf),
    /// Connecting to the server failed.
    #[error("failed to connect: {0}")]
    Connect(#[source] mysql_async::Error),
    /// The server rejected the statement.
    #[error("statement failed: {0}")]
    Execute(#[source] mysql_async::Error),
    /// Closing the connection failed after the statement ran.
    #[error("failed to close connection: {0}")]
    Disconnect(#[source] mysql_async::Error),
}

/// Narrow view of the database client used during bootstrap.
pub trait AdminConnector {
    /// Creates `schema` as the administrative user, connecting via `socket`.
    ///
    /// Implementations must close their connection before returning, whether
    /// or not the statement succeeded.
    fn create_schema(&self, socket: &Path, schema: &str) -> Result<(), AdminError>;
}

/// [`AdminConnector`] backed by `mysql_async`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MysqlAdmin;

impl AdminConnector for MysqlAdmin {
    fn create_schema(&self, socket: &Path, schema: &str) -> Result<(), AdminError> {
        let socket_path = socket
            .to_str()
            .ok_or_else(|| AdminError::SocketPath(socket.to_path_buf()))?;
        let runtime = build_runtime().map_err(AdminError::Runtime)?;
        runtime.block_on(create_over_socket(socket_path, schema))?;
        info!(target: SCHEMA_TARGET, schema, socket = %socket.display(), "scratch schema created");
        Ok(())
    }
}

async fn create_over_socket(socket_path: &str, schema: &str) -> Result<(), AdminError> {
    let opts = OptsBuilder::default()
        .socket(Some(socket_path))
        .user(Some(ADMIN_USER))
        .db_name(None::<String>);
    let mut conn = Conn::new(opts).await.map_err(AdminError::Connect)?;
    let executed = conn
        .query_drop(create_statement(schema))
        .await
        .map_err(AdminError::Execute);
    // The connection is closed even when the statement failed.
    let closed = conn.disconnect().await.map_err(AdminError::Disconnect);
    executed.and(closed)
}

fn create_statement(schema: &str) -> String {
    format!("CREATE DATABASE `{schema}` CHARACTER SET utf8mb4")
}
