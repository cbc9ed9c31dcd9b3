//! Crate-level lifecycle tests against fake server installations.

use std::fs;
use std::path::Path;

use mockall::mock;
use mockall::predicate::{always, eq};
use rstest::rstest;

use tmpmysql_config::Config;

use crate::error::{PidFileError, ServerError};
use crate::process::process_exists;
use crate::schema::{AdminConnector, AdminError, SCRATCH_SCHEMA};
use crate::server::ServerBuilder;
use crate::teardown::TeardownState;

pub(crate) mod support;


use support::{FakeInstall, InstallerBehaviour, ServerBehaviour};

mock! {
    pub(crate) Admin {}
    impl AdminConnector for Admin {
        fn create_schema(&self, socket: &Path, schema: &str) -> Result<(), AdminError>;
    }
}

/// Admin double that accepts any single schema creation.
pub(crate) fn accepting_admin() -> Box<MockAdmin> {
    let mut admin = MockAdmin::new();
    admin
        .expect_create_schema()
        .with(always(), eq(SCRATCH_SCHEMA))
        .times(1)
        .returning(|_, _| Ok(()));
    Box::new(admin)
}

/// Admin double whose schema creation always fails.
pub(crate) fn rejecting_admin() -> Box<MockAdmin> {
    let mut admin = MockAdmin::new();
    admin
        .expect_create_schema()
        .times(1)
        .returning(|socket, _| Err(AdminError::SocketPath(socket.to_path_buf())));
    Box::new(admin)
}

#[test]
fn start_and_destroy_leave_no_trace() {
    let install = FakeInstall::new(ServerBehaviour::Cooperative, InstallerBehaviour::Succeeds);
    let mut server = install
        .builder(accepting_admin())
        .start()
        .expect("server should start");

    let workspace = server.workspace_dir().to_path_buf();
    let name = workspace
        .file_name()
        .and_then(|name| name.to_str())
        .expect("workspace name");
    assert_eq!(name, "tmpmysql_0000");
    assert!(workspace.join("data/installed").exists());
    assert!(server.pid_file_path().exists());
    assert!(server.process_id().is_some_and(|pid| pid > 0));
    assert!(server.connection_string().ends_with("sock"));
    assert_eq!(server.teardown_state(), TeardownState::Running);

    server.destroy().expect("destroy should succeed");
    assert_eq!(server.teardown_state(), TeardownState::Stopped);
    assert!(!workspace.exists());
}

#[test]
fn schema_is_created_over_the_workspace_socket() {
    let install = FakeInstall::new(ServerBehaviour::Cooperative, InstallerBehaviour::Succeeds);
    let expected_socket = install.temp_root().join("tmpmysql_0000").join("sock");
    let mut admin = MockAdmin::new();
    admin
        .expect_create_schema()
        .withf(move |socket, schema| socket == expected_socket && schema == "test")
        .times(1)
        .returning(|_, _| Ok(()));
    let mut server = install
        .builder(Box::new(admin))
        .start()
        .expect("server should start");
    server.destroy().expect("destroy");
}

#[test]
fn destroy_twice_is_a_no_op() {
    let install = FakeInstall::new(ServerBehaviour::Cooperative, InstallerBehaviour::Succeeds);
    let mut server = install
        .builder(accepting_admin())
        .start()
        .expect("server should start");
    server.destroy().expect("first destroy");
    server.destroy().expect("second destroy");
    assert_eq!(server.teardown_state(), TeardownState::Stopped);
}

#[test]
fn concurrent_instances_get_distinct_workspaces() {
    let install = FakeInstall::new(ServerBehaviour::Cooperative, InstallerBehaviour::Succeeds);
    let mut first = install
        .builder(accepting_admin())
        .start()
        .expect("first server");
    let mut second = install
        .builder(accepting_admin())
        .start()
        .expect("second server");
    assert_ne!(first.workspace_dir(), second.workspace_dir());
    assert_ne!(first.connection_string(), second.connection_string());
    first.destroy().expect("destroy first");
    assert!(second.pid_file_path().exists());
    second.destroy().expect("destroy second");
}

#[test]
fn missing_executables_fail_before_any_workspace_exists() {
    let install = FakeInstall::new(ServerBehaviour::Cooperative, InstallerBehaviour::Succeeds);
    let config = Config {
        install_program: "tmpmysql-definitely-missing".to_owned(),
        ..Config::default()
    };
    let failure = ServerBuilder::new(config)
        .search_path(install.search_path())
        .temp_root(install.temp_root())
        .admin_connector(Box::new(MockAdmin::new()))
        .start()
        .expect_err("start should fail");
    let ServerError::ExecutableNotFound { program, searched } = failure.error() else {
        panic!("expected ExecutableNotFound, got {:?}", failure.error());
    };
    assert_eq!(program, "tmpmysql-definitely-missing");
    assert!(*searched > 0);
    assert!(failure.server().is_none());
    let leftovers = fs::read_dir(install.temp_root()).expect("read temp root").count();
    assert_eq!(leftovers, 0);
}

#[rstest]
#[case::initialiser_fails(ServerBehaviour::Cooperative, InstallerBehaviour::Fails)]
#[case::server_exits(ServerBehaviour::ExitsImmediately, InstallerBehaviour::Succeeds)]
#[case::never_ready(ServerBehaviour::NeverReady, InstallerBehaviour::Succeeds)]
fn failed_bootstraps_hand_back_a_destroyable_handle(
    #[case] server: ServerBehaviour,
    #[case] installer: InstallerBehaviour,
) {
    let install = FakeInstall::new(server, installer);
    let failure = install
        .builder(Box::new(MockAdmin::new()))
        .start()
        .expect_err("start should fail");
    let (error, partial) = failure.into_parts();
    match (server, installer) {
        (_, InstallerBehaviour::Fails) => {
            assert!(matches!(error, ServerError::SchemaBootstrapFailed { .. }));
        }
        (ServerBehaviour::ExitsImmediately, _) => {
            assert!(matches!(error, ServerError::ServerExited { status } if status.code() == Some(3)));
        }
        _ => assert!(matches!(error, ServerError::StartupTimeout { .. })),
    }
    let mut handle = partial.expect("partial handle");
    let workspace = handle.workspace_dir().to_path_buf();
    assert!(workspace.exists());
    handle.destroy().expect("partial destroy");
    assert!(!workspace.exists());
}

#[test]
fn the_server_binary_is_found_in_the_fake_installation() {
    let install = FakeInstall::new(ServerBehaviour::Cooperative, InstallerBehaviour::Succeeds);
    let found = install
        .search_path()
        .find(tmpmysql_config::DEFAULT_SERVER_PROGRAM)
        .expect("server should be found");
    assert_eq!(found, install.server_path());
}

#[test]
fn schema_failure_is_reported_and_the_partial_handle_tears_down() {
    let install = FakeInstall::new(ServerBehaviour::Cooperative, InstallerBehaviour::Succeeds);
    let failure = install
        .builder(rejecting_admin())
        .start()
        .expect_err("start should fail");
    let (error, partial) = failure.into_parts();
    let ServerError::SchemaCreateFailed { schema, source } = error else {
        panic!("expected SchemaCreateFailed, got {error:?}");
    };
    assert_eq!(schema, SCRATCH_SCHEMA);
    assert!(matches!(source, AdminError::SocketPath(_)));

    let mut handle = partial.expect("partial handle");
    let pid = handle.process_id().expect("server became ready");
    let workspace = handle.workspace_dir().to_path_buf();
    handle.destroy().expect("destroy");
    assert!(!process_exists(pid));
    assert!(!workspace.exists());
}

#[test]
fn failed_signal_aborts_teardown_and_keeps_the_workspace() {
    let install = FakeInstall::new(ServerBehaviour::Cooperative, InstallerBehaviour::Succeeds);
    let mut server = install
        .builder(accepting_admin())
        .start()
        .expect("server should start");
    let real_pid = server.pid.replace(99_999_999);

    let result = server.destroy();
    let Err(ServerError::SignalFailed { pid, .. }) = result else {
        panic!("expected SignalFailed, got {result:?}");
    };
    assert_eq!(pid, 99_999_999);
    assert!(server.workspace_dir().join("data").is_dir());
    assert_eq!(server.teardown_state(), TeardownState::Running);

    server.pid = real_pid;
    server.destroy().expect("destroy with the real pid");
    assert!(!server.workspace_dir().exists());
}

#[test]
fn destroy_after_the_server_already_exited_succeeds() {
    let install = FakeInstall::new(ServerBehaviour::Cooperative, InstallerBehaviour::Succeeds);
    let mut server = install
        .builder(accepting_admin())
        .start()
        .expect("server should start");
    let pid = server.process_id().expect("pid");
    // SIGKILL skips the trap, so the pid file stays behind until removed here.
    server.process.take().expect("launched child").force_stop();
    fs::remove_file(server.pid_file_path()).expect("remove stale pid file");
    assert!(!process_exists(pid));

    server.destroy().expect("destroy should treat the server as stopped");
    assert_eq!(server.teardown_state(), TeardownState::Stopped);
    assert!(!server.workspace_dir().exists());
}

#[test]
fn malformed_pid_file_fails_startup_and_teardown_kills_the_child() {
    let install = FakeInstall::new(ServerBehaviour::WritesGarbagePid, InstallerBehaviour::Succeeds);
    let failure = install
        .builder(Box::new(MockAdmin::new()))
        .start()
        .expect_err("start should fail");
    let (error, partial) = failure.into_parts();
    let ServerError::PidReadFailed {
        source: PidFileError::Parse { content, .. },
        ..
    } = error
    else {
        panic!("expected PidReadFailed, got {error:?}");
    };
    assert_eq!(content, "garbage");

    let mut handle = partial.expect("partial handle");
    assert!(handle.process_id().is_none());
    let child = handle
        .process
        .as_ref()
        .map(crate::process::ServerProcess::child_id)
        .expect("launched child");
    let workspace = handle.workspace_dir().to_path_buf();
    handle.destroy().expect("destroy");
    assert!(!process_exists(child));
    assert!(!workspace.exists());
}
