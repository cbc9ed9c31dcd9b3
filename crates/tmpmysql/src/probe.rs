//! Locates the server executables and reads the server's built-in defaults.

use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tmpmysql_config::{Config, FALLBACK_SEARCH_DIRS, SEARCH_PATH_VAR};
use tracing::{debug, info};

use crate::error::{CommandFailure, ServerError};

const PROBE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::probe");

/// Ordered list of directories searched for executables.
///
/// The configured entries are always followed by the conventional system
/// binary directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    /// Builds a search path from `PATH` plus the fallback directories.
    #[must_use]
    pub fn from_env() -> Self {
        let configured = env::var_os(SEARCH_PATH_VAR)
            .map(|value| env::split_paths(&value).collect::<Vec<_>>())
            .unwrap_or_default();
        Self::new(configured)
    }

    /// Builds a search path from explicit directories plus the fallbacks.
    ///
    /// Relative and empty entries are ignored so every match is absolute.
    #[must_use]
    pub fn new<I, P>(configured: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let dirs = configured
            .into_iter()
            .map(Into::into)
            .chain(FALLBACK_SEARCH_DIRS.iter().map(PathBuf::from))
            .filter(|dir| dir.is_absolute())
            .collect();
        Self { dirs }
    }

    /// Directories in search order.
    #[must_use]
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Returns the first existing file called `program` in search order.
    pub fn find(&self, program: &str) -> Result<PathBuf, ServerError> {
        let found = self
            .dirs
            .iter()
            .map(|dir| dir.join(program))
            .find(|candidate| candidate.is_file());
        match found {
            Some(path) => {
                debug!(target: PROBE_TARGET, program, path = %path.display(), "located executable");
                Ok(path)
            }
            None => Err(ServerError::ExecutableNotFound {
                program: program.to_owned(),
                searched: self.dirs.len(),
            }),
        }
    }
}

impl Default for SearchPath {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Absolute paths of the two executables an instance needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executables {
    server: PathBuf,
    installer: PathBuf,
}

impl Executables {
    /// Locates the server and data-directory initialiser named by `config`.
    pub fn locate(search: &SearchPath, config: &Config) -> Result<Self, ServerError> {
        let server = search.find(config.server_program())?;
        let installer = search.find(config.install_program())?;
        info!(
            target: PROBE_TARGET,
            server = %server.display(),
            installer = %installer.display(),
            "server executables located"
        );
        Ok(Self { server, installer })
    }

    /// Server executable.
    #[must_use]
    pub fn server(&self) -> &Path {
        &self.server
    }

    /// Data-directory initialiser executable.
    #[must_use]
    pub fn installer(&self) -> &Path {
        &self.installer
    }
}

/// Settings the server reports through `--print-defaults`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerDefaults {
    /// Installation base directory (`--basedir`).
    pub base_dir: Option<PathBuf>,
    /// Localised error message directory (`--lc-messages-dir`).
    pub messages_dir: Option<PathBuf>,
}

impl ServerDefaults {
    /// Extracts the relevant settings from `--print-defaults` output.
    #[must_use]
    pub fn parse(defaults: &str) -> Self {
        Self {
            base_dir: extract_default(defaults, "basedir").map(PathBuf::from),
            messages_dir: extract_default(defaults, "lc-messages-dir").map(PathBuf::from),
        }
    }
}

/// Runs `server --print-defaults` and parses its output.
pub fn probe_defaults(server: &Path) -> Result<ServerDefaults, ServerError> {
    let failed = |source| ServerError::ProbeFailed {
        program: server.to_path_buf(),
        source,
    };
    let output = Command::new(server)
        .arg("--print-defaults")
        .stdin(Stdio::null())
        .output()
        .map_err(|error| failed(CommandFailure::Spawn(error)))?;
    if !output.status.success() {
        return Err(failed(CommandFailure::Exit {
            status: output.status,
            output: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        }));
    }
    let defaults = ServerDefaults::parse(&String::from_utf8_lossy(&output.stdout));
    info!(
        target: PROBE_TARGET,
        base_dir = ?defaults.base_dir,
        messages_dir = ?defaults.messages_dir,
        "server defaults probed"
    );
    Ok(defaults)
}

/// Returns the value of the first `--name=value` token in `defaults`.
///
/// The value runs up to the next whitespace; an empty value yields
/// `Some("")`, an absent setting yields `None`.
#[must_use]
pub fn extract_default(defaults: &str, name: &str) -> Option<String> {
    let key = format!("--{name}=");
    defaults
        .split_whitespace()
        .find_map(|token| token.strip_prefix(key.as_str()))
        .map(str::to_owned)
}
