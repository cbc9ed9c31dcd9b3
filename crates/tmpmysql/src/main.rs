//! Starts a throwaway MySQL server, reports where it lives, and tears it down.

use std::io::{self, Write};
use std::process::ExitCode;

use tmpmysql::{Config, OrthoConfig as _, ServerBuilder, telemetry};

fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(error) => {
            report(&format!("failed to load configuration: {error}"));
            return ExitCode::FAILURE;
        }
    };
    if let Err(error) = telemetry::initialise(&config) {
        report(&error.to_string());
        return ExitCode::FAILURE;
    }
    run(config)
}

fn run(config: Config) -> ExitCode {
    let mut server = match ServerBuilder::new(config).start() {
        Ok(server) => server,
        Err(failure) => {
            let (error, partial) = failure.into_parts();
            report(&error.to_string());
            if let Some(mut server) = partial
                && let Err(cleanup) = server.destroy()
            {
                report(&cleanup.to_string());
            }
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = io::stdout().lock();
    let written = writeln!(stdout, "workspace: {}", server.workspace_dir().display())
        .and_then(|()| writeln!(stdout, "connection: {}", server.connection_string()));
    let destroyed = server.destroy();

    if let Err(error) = written {
        report(&format!("failed to write output: {error}"));
        return ExitCode::FAILURE;
    }
    if let Err(error) = destroyed {
        report(&error.to_string());
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn report(message: &str) {
    let mut stderr = io::stderr().lock();
    writeln!(stderr, "tmpmysql: {message}").ok();
}
