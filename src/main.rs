//! sysupdate-mock entry point.
//!
//! Runs the mock service or talks to a running one:
//! - Configuration loading from `SYSUPDATE_MOCK_*`
//! - IPC listener setup
//! - Signal handling for graceful shutdown
//!
//! ## CLI Subcommands
//!
//! - `sysupdate-mock` or `sysupdate-mock serve` - Run the mock service (default)
//! - `sysupdate-mock targets|jobs|versions|describe|...` - Query a running mock

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use sysupdate_mock::cli::{self, config_cmd};
use sysupdate_mock::config as mock_config;
use sysupdate_mock::ipc::run_server;
use sysupdate_mock::{telemetry, Service, ServiceConfig};

/// Exit code for malformed command lines.
const EXIT_USAGE: u8 = 2;

/// Time left for connection tasks to write out signals emitted during shutdown.
const SIGNAL_FLUSH: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> ExitCode {
    let (socket_override, args) = match split_socket_flag(std::env::args().skip(1).collect()) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::from(EXIT_USAGE);
        }
    };
    let socket_path = socket_override.unwrap_or_else(cli::get_socket_path);
    let command = args.first().map(|s| s.as_str()).unwrap_or("serve");
    let operands: Vec<&str> = args.iter().skip(1).map(|s| s.as_str()).collect();

    match command {
        "serve" | "" => {
            let env = mock_config::load();
            if let Err(e) = telemetry::init_logging(&env.log) {
                eprintln!("Failed to initialize logging: {}", e);
                return ExitCode::FAILURE;
            }
            telemetry::init_metrics();
            match run_service(socket_path, ServiceConfig::from(env)).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("Server error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        "targets" => exit(cli::run_targets(&socket_path).await),
        "jobs" => exit(cli::run_jobs(&socket_path).await),
        "versions" => match operands.as_slice() {
            [target] => exit(cli::run_versions(&socket_path, target).await),
            _ => usage_error("versions"),
        },
        "describe" => match operands.as_slice() {
            [target, version] => exit(cli::run_describe(&socket_path, target, version).await),
            _ => usage_error("describe"),
        },
        "check-new" => match operands.as_slice() {
            [target] => exit(cli::run_check_new(&socket_path, target).await),
            _ => usage_error("check-new"),
        },
        "update" => {
            let offline = operands.contains(&"--offline");
            let wait = operands.contains(&"--wait");
            let positional: Vec<&str> = operands
                .iter()
                .copied()
                .filter(|a| !a.starts_with("--"))
                .collect();
            let unknown_flag = operands
                .iter()
                .any(|a| a.starts_with("--") && *a != "--offline" && *a != "--wait");
            match positional.as_slice() {
                [target, version] if !unknown_flag => {
                    exit(cli::run_update(&socket_path, target, version, offline, wait).await)
                }
                _ => usage_error("update"),
            }
        }
        "cancel" => match operands.as_slice() {
            [id] => match id.parse::<u64>() {
                Ok(id) => exit(cli::run_cancel(&socket_path, id).await),
                Err(_) => {
                    eprintln!("Invalid job id: {}", id);
                    ExitCode::from(EXIT_USAGE)
                }
            },
            _ => usage_error("cancel"),
        },
        "vacuum" => match operands.as_slice() {
            [target] => exit(cli::run_vacuum(&socket_path, target).await),
            _ => usage_error("vacuum"),
        },
        "monitor" => exit(cli::run_monitor(&socket_path).await),
        "ping" => exit(cli::run_ping(&socket_path).await),
        "machine-id" => exit(cli::run_machine_id(&socket_path).await),
        "config" => {
            let subcommand = operands.first().copied().unwrap_or("show");
            match subcommand {
                "show" => {
                    config_cmd::run_show();
                    ExitCode::SUCCESS
                }
                "defaults" => {
                    config_cmd::run_defaults();
                    ExitCode::SUCCESS
                }
                _ => {
                    eprintln!("Unknown config subcommand: {}", subcommand);
                    print_command_help("config");
                    ExitCode::from(EXIT_USAGE)
                }
            }
        }
        "help" | "--help" | "-h" => {
            if let Some(subcommand) = operands.first() {
                print_command_help(subcommand);
            } else {
                print_usage();
            }
            ExitCode::SUCCESS
        }
        "version" | "--version" | "-V" => {
            println!("sysupdate-mock {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            ExitCode::from(EXIT_USAGE)
        }
    }
}

fn exit(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn usage_error(command: &str) -> ExitCode {
    eprintln!("Wrong arguments for '{}'.", command);
    print_command_help(command);
    ExitCode::from(EXIT_USAGE)
}

/// Pull `--socket PATH` out of the argument list.
fn split_socket_flag(args: Vec<String>) -> Result<(Option<String>, Vec<String>), String> {
    let mut socket = None;
    let mut rest = Vec::with_capacity(args.len());
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if arg == "--socket" {
            match iter.next() {
                Some(path) => socket = Some(path),
                None => return Err("--socket requires a path".to_string()),
            }
        } else if let Some(path) = arg.strip_prefix("--socket=") {
            socket = Some(path.to_string());
        } else {
            rest.push(arg);
        }
    }
    Ok((socket, rest))
}

async fn run_service(
    socket_path: String,
    config: ServiceConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = Service::new(config)?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let mut server_handle = tokio::spawn(run_server(
        socket_path,
        Arc::clone(&service.ipc_handler),
        Arc::clone(&service.connections),
        shutdown_rx,
        service.config.ipc_server.clone(),
    ));

    // Wait for Ctrl+C, unless the server gives up first (e.g. bind failed)
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("Shutdown signal received, draining");
        }
        joined = &mut server_handle => {
            let error: Box<dyn std::error::Error> = match joined {
                Ok(Ok(())) => "IPC server stopped unexpectedly".into(),
                Ok(Err(e)) => e.into(),
                Err(e) => e.into(),
            };
            tracing::error!(error = %error, "IPC server exited");
            service.shutdown().await;
            return Err(error);
        }
    }

    // Signal the server loop to stop accepting
    let _ = shutdown_tx.send(true);

    let report = service.shutdown().await;
    if !report.jobs_drained {
        tracing::warn!("Some jobs were still registered at shutdown");
    }

    // Connections stay up until the runtime exits; give their forwarders a
    // moment to deliver the final JobRemoved signals.
    if report.cancelled_jobs > 0 {
        tokio::time::sleep(SIGNAL_FLUSH).await;
    }

    if let Err(e) = server_handle.await? {
        tracing::error!(error = %e, "Server error");
    }
    tracing::info!("Shutdown complete");

    Ok(())
}

fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        "sysupdate-mock - in-memory org.freedesktop.sysupdate1 service v{}

USAGE:
    sysupdate-mock [--socket PATH] [COMMAND] [ARGS]

COMMANDS:
    serve                          Run the mock service (default)
    targets                        List update targets
    jobs                           List running jobs
    versions <target>              List versions of a target
    describe <target> <version>    Print the description of a version
    check-new <target>             Print the newer version, if any
    update <target> <version>      Start an update job
    cancel <job-id>                Cancel a running job
    vacuum <target>                Remove old instances (simulated)
    monitor                        Print every emitted signal
    ping                           Check the service answers
    machine-id                     Print the service machine id
    config                         Show configuration (show, defaults)
    version                        Show version information
    help [COMMAND]                 Show help

OPTIONS:
    --socket PATH  Override IPC socket path

ENVIRONMENT:
    SYSUPDATE_MOCK_SOCKET_PATH   IPC socket path (default: /tmp/sysupdate-mock.sock)
    SYSUPDATE_MOCK_TICK_MS       Progress interval in ms (default: 100)
    SYSUPDATE_MOCK_PROGRESS_STEP Progress per tick in percent (default: 5)
    SYSUPDATE_MOCK_LOG           Log filter (default: info)
    SYSUPDATE_MOCK_LOG_FORMAT    pretty or json (default: pretty)

EXIT CODES:
    0  Success
    1  Call failed
    2  Usage error
    3  Connection error
",
        version
    );
}

/// Print detailed help for a specific command.
fn print_command_help(command: &str) {
    match command {
        "serve" => {
            eprintln!(
                "sysupdate-mock serve - Run the mock service

USAGE:
    sysupdate-mock serve [--socket PATH]

DESCRIPTION:
    Publishes the manager, the 'os' target and any running update jobs
    on the IPC socket until Ctrl+C. On shutdown, in-flight calls are
    drained and running jobs are cancelled.
"
            );
        }
        "update" => {
            eprintln!(
                "sysupdate-mock update - Start an update job

USAGE:
    sysupdate-mock update <target> <version> [--offline] [--wait]

OPTIONS:
    --offline  Set the offline flag on the job
    --wait     Print progress until the job is removed

EXAMPLES:
    sysupdate-mock update os 2.0.0
    sysupdate-mock update os 2.0.0 --offline --wait
"
            );
        }
        "cancel" => {
            eprintln!(
                "sysupdate-mock cancel - Cancel a running job

USAGE:
    sysupdate-mock cancel <job-id>

DESCRIPTION:
    Jumps the job to 100% and removes it. Job ids are shown by
    'sysupdate-mock jobs'.
"
            );
        }
        "versions" | "check-new" | "vacuum" => {
            eprintln!(
                "sysupdate-mock {} - Target query

USAGE:
    sysupdate-mock {} <target>
",
                command, command
            );
        }
        "describe" => {
            eprintln!(
                "sysupdate-mock describe - Print a version description

USAGE:
    sysupdate-mock describe <target> <version>
"
            );
        }
        "config" => {
            eprintln!(
                "sysupdate-mock config - Show configuration

USAGE:
    sysupdate-mock config <SUBCOMMAND>

SUBCOMMANDS:
    show           Show effective configuration
    defaults       Show default configuration
"
            );
        }
        _ => {
            eprintln!(
                "No detailed help available for '{}'. Use 'sysupdate-mock help' for general usage.",
                command
            );
        }
    }
}
