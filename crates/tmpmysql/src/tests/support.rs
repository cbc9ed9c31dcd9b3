//! Fake server installations built from shell scripts.
//!
//! The scripts understand just enough of the real command lines to exercise
//! the lifecycle: the server answers `--print-defaults`, honours
//! `--pid-file=`, and reacts to `SIGTERM` according to its
//! [`ServerBehaviour`]; the initialiser marks the data directory it was given.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tmpmysql_config::{Config, DEFAULT_INSTALL_PROGRAM, DEFAULT_SERVER_PROGRAM};

use crate::probe::SearchPath;
use crate::readiness::PollSchedule;
use crate::schema::AdminConnector;
use crate::server::ServerBuilder;

/// Schedule used by tests that drive a whole lifecycle.
pub(crate) const FAST_SCHEDULE: PollSchedule = PollSchedule::new(Duration::from_millis(20), 50);

/// How the fake server reacts once launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ServerBehaviour {
    /// Writes its pid file and removes it on `SIGTERM`.
    Cooperative,
    /// Writes its pid file and ignores `SIGTERM`.
    IgnoresTerm,
    /// Keeps running without ever writing a pid file.
    NeverReady,
    /// Exits with status 3 straight away.
    ExitsImmediately,
    /// Writes something that is not a process id into its pid file.
    WritesGarbagePid,
}

/// How the fake data-directory initialiser behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InstallerBehaviour {
    Succeeds,
    Fails,
}

const SERVER_PREAMBLE: &str = r#"#!/bin/sh
PID_FILE=""
for arg in "$@"; do
    case "$arg" in
        --print-defaults)
            echo "mysqld would have been started with the following arguments:"
            echo "--basedir=/usr --lc-messages-dir=/usr/share/mysql --port=3306"
            exit 0
            ;;
        --pid-file=*) PID_FILE="${arg#--pid-file=}" ;;
    esac
done
"#;

const INSTALLER_PREAMBLE: &str = r#"#!/bin/sh
DATA_DIR=""
for arg in "$@"; do
    case "$arg" in
        --datadir=*) DATA_DIR="${arg#--datadir=}" ;;
    esac
done
"#;

const IDLE_LOOP: &str = "while :; do sleep 1 & wait $!; done\n";

fn server_body(behaviour: ServerBehaviour) -> String {
    let body = match behaviour {
        ServerBehaviour::Cooperative => {
            "trap 'rm -f \"$PID_FILE\"; exit 0' TERM\necho $$ > \"$PID_FILE\"\n"
        }
        ServerBehaviour::IgnoresTerm => "trap '' TERM\necho $$ > \"$PID_FILE\"\n",
        ServerBehaviour::NeverReady => "trap 'exit 0' TERM\n",
        ServerBehaviour::ExitsImmediately => "exit 3\n",
        ServerBehaviour::WritesGarbagePid => "trap 'exit 0' TERM\necho garbage > \"$PID_FILE\"\n",
    };
    format!("{SERVER_PREAMBLE}{body}{IDLE_LOOP}")
}

fn installer_script(behaviour: InstallerBehaviour) -> String {
    let body = match behaviour {
        InstallerBehaviour::Succeeds => "touch \"$DATA_DIR/installed\"\n",
        InstallerBehaviour::Fails => concat!(
            "echo \"installing system tables\"\n",
            "echo \"cannot write data directory\" >&2\n",
            "exit 1\n",
        ),
    };
    format!("{INSTALLER_PREAMBLE}{body}")
}

fn write_executable(path: &Path, script: &str) {
    fs::write(path, script).expect("write fake executable");
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("mark executable");
}

/// A directory of fake executables plus a private temp root for workspaces.
pub(crate) struct FakeInstall {
    bin: TempDir,
    temp_root: TempDir,
}

impl FakeInstall {
    pub(crate) fn new(server: ServerBehaviour, installer: InstallerBehaviour) -> Self {
        let bin = TempDir::new().expect("bin dir");
        let temp_root = TempDir::new().expect("temp root");
        write_executable(&bin.path().join(DEFAULT_SERVER_PROGRAM), &server_body(server));
        write_executable(
            &bin.path().join(DEFAULT_INSTALL_PROGRAM),
            &installer_script(installer),
        );
        Self { bin, temp_root }
    }

    pub(crate) fn server_path(&self) -> PathBuf {
        self.bin.path().join(DEFAULT_SERVER_PROGRAM)
    }

    pub(crate) fn installer_path(&self) -> PathBuf {
        self.bin.path().join(DEFAULT_INSTALL_PROGRAM)
    }

    pub(crate) fn search_path(&self) -> SearchPath {
        SearchPath::new([self.bin.path()])
    }

    pub(crate) fn temp_root(&self) -> &Path {
        self.temp_root.path()
    }

    /// Builder wired to this installation with a fast poll schedule.
    pub(crate) fn builder(&self, admin: Box<dyn AdminConnector>) -> ServerBuilder {
        ServerBuilder::new(Config::default())
            .search_path(self.search_path())
            .temp_root(self.temp_root())
            .admin_connector(admin)
            .poll_schedule(FAST_SCHEDULE)
    }
}
