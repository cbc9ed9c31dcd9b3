//! Data-directory initialisation and server process launch.

use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{info, warn};

use crate::error::{CommandFailure, ServerError};
use crate::probe::ServerDefaults;
use crate::process::ServerProcess;
use crate::workspace::Workspace;

const LAUNCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::launch");

/// Builds a `--name=value` flag without assuming UTF-8 paths.
fn flag(name: &str, value: &OsStr) -> OsString {
    let mut flag = OsString::from(format!("--{name}="));
    flag.push(value);
    flag
}

/// Arguments for the data-directory initialiser.
#[must_use]
pub(crate) fn installer_arguments(defaults: &ServerDefaults, workspace: &Workspace) -> Vec<OsString> {
    let mut arguments = vec![OsString::from("--no-defaults")];
    if let Some(base_dir) = &defaults.base_dir {
        arguments.push(flag("basedir", base_dir.as_os_str()));
    }
    arguments.push(flag("datadir", workspace.data_dir().as_os_str()));
    arguments
}

/// Arguments for the server: no option files, no TCP listener, and every
/// path pointed inside the workspace.
#[must_use]
pub(crate) fn server_arguments(defaults: &ServerDefaults, workspace: &Workspace) -> Vec<OsString> {
    let mut arguments = vec![
        OsString::from("--no-defaults"),
        OsString::from("--skip-networking"),
    ];
    if let Some(base_dir) = &defaults.base_dir {
        arguments.push(flag("basedir", base_dir.as_os_str()));
    }
    if let Some(messages_dir) = &defaults.messages_dir {
        arguments.push(flag("lc-messages-dir", messages_dir.as_os_str()));
    }
    arguments.extend([
        flag("datadir", workspace.data_dir().as_os_str()),
        flag("tmpdir", workspace.tmp_dir().as_os_str()),
        flag("pid-file", workspace.pid_path().as_os_str()),
        flag("socket", workspace.socket_path().as_os_str()),
    ]);
    arguments
}

/// Runs the data-directory initialiser to completion.
///
/// On a non-zero exit the combined stdout and stderr are logged and returned
/// inside the error.
pub(crate) fn initialise_data_dir(
    installer: &Path,
    defaults: &ServerDefaults,
    workspace: &Workspace,
) -> Result<(), ServerError> {
    let failed = |source| ServerError::SchemaBootstrapFailed {
        program: installer.to_path_buf(),
        source,
    };
    let output = Command::new(installer)
        .args(installer_arguments(defaults, workspace))
        .stdin(Stdio::null())
        .output()
        .map_err(|error| failed(CommandFailure::Spawn(error)))?;
    if !output.status.success() {
        let mut raw = String::from_utf8_lossy(&output.stdout).into_owned();
        raw.push_str(&String::from_utf8_lossy(&output.stderr));
        let combined = raw.trim().to_owned();
        warn!(
            target: LAUNCH_TARGET,
            status = %output.status,
            output = %combined,
            "data directory initialisation failed"
        );
        return Err(failed(CommandFailure::Exit {
            status: output.status,
            output: combined,
        }));
    }
    info!(
        target: LAUNCH_TARGET,
        data_dir = %workspace.data_dir().display(),
        "data directory initialised"
    );
    Ok(())
}

/// Starts the server in the background without waiting for readiness.
pub(crate) fn spawn_server(
    server: &Path,
    defaults: &ServerDefaults,
    workspace: &Workspace,
) -> Result<ServerProcess, ServerError> {
    let child = Command::new(server)
        .args(server_arguments(defaults, workspace))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| ServerError::LaunchFailed {
            program: server.to_path_buf(),
            source,
        })?;
    let process = ServerProcess::new(child);
    info!(
        target: LAUNCH_TARGET,
        child = process.child_id(),
        socket = %workspace.socket_path().display(),
        "server process launched"
    );
    Ok(process)
}
