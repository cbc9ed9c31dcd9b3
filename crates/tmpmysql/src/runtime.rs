//! Helpers for constructing the Tokio runtime used by the admin connection.

use std::io;

use tokio::runtime::{Builder, Runtime};

/// Constructs a current-thread Tokio runtime for one blocking admin call.
///
/// The runtime lives only as long as the call; nothing async outlives the
/// schema initialiser.
pub(crate) fn build_runtime() -> io::Result<Runtime> {
    Builder::new_current_thread().enable_all().build()
}
