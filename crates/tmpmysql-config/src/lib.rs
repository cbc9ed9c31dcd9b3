//! Shared configuration for `tmpmysql`.
//!
//! Values are layered by `ortho_config`: built-in defaults, an optional
//! configuration file, `TMPMYSQL_*` environment variables, and finally CLI
//! flags. Only the collaborators a caller may reasonably swap are exposed
//! here (executable names and logging); the polling schedule and workspace
//! naming are fixed by the library.

mod defaults;
mod logging;

use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_INSTALL_PROGRAM, DEFAULT_LOG_FILTER, DEFAULT_SERVER_PROGRAM, FALLBACK_SEARCH_DIRS,
    SEARCH_PATH_VAR, default_install_program, default_log_filter, default_log_format,
    default_server_program,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use ortho_config::OrthoConfig;

/// Configuration consumed by the server bootstrap and the binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "TMPMYSQL")]
pub struct Config {
    /// Name of the server executable to locate.
    #[ortho_config(default = default_server_program())]
    pub server_program: String,
    /// Name of the data-directory initialiser executable to locate.
    #[ortho_config(default = default_install_program())]
    pub install_program: String,
    /// `tracing` filter expression applied by the binary.
    #[ortho_config(default = default_log_filter())]
    pub log_filter: String,
    /// Output format for log lines.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Config {
    /// Name of the server executable to locate.
    #[must_use]
    pub fn server_program(&self) -> &str {
        &self.server_program
    }

    /// Name of the data-directory initialiser executable to locate.
    #[must_use]
    pub fn install_program(&self) -> &str {
        &self.install_program
    }

    /// Filter expression for log output.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Output format for log lines.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_program: default_server_program(),
            install_program: default_install_program(),
            log_filter: default_log_filter(),
            log_format: default_log_format(),
        }
    }
}
