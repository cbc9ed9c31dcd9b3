//! Fixed defaults shared by the library and the binary.

use crate::logging::LogFormat;

/// Server executable looked up on the search path.
pub const DEFAULT_SERVER_PROGRAM: &str = "mysqld";

/// Data-directory initialiser looked up on the search path.
pub const DEFAULT_INSTALL_PROGRAM: &str = "mysql_install_db";

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Environment variable holding the colon-separated executable search path.
pub const SEARCH_PATH_VAR: &str = "PATH";

/// Directories searched after the entries of [`SEARCH_PATH_VAR`].
pub const FALLBACK_SEARCH_DIRS: [&str; 6] = [
    "/usr/local/sbin",
    "/usr/local/bin",
    "/usr/sbin",
    "/usr/bin",
    "/sbin",
    "/bin",
];

/// Owned server program name used where allocation is required (e.g. serde).
#[must_use]
pub fn default_server_program() -> String {
    DEFAULT_SERVER_PROGRAM.to_owned()
}

/// Owned initialiser program name used where allocation is required.
#[must_use]
pub fn default_install_program() -> String {
    DEFAULT_INSTALL_PROGRAM.to_owned()
}

/// Owned log filter value used where allocation is required.
#[must_use]
pub fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binary.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
