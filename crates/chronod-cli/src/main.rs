use std::process::ExitCode;

use clap::Parser;
use tracing::{error, warn};

mod cli;
mod client;
mod server;

use chronod_core::config::ChronodConfig;
use chronod_protocol::server_running;
use cli::{exit_code, exit_code_for, Cli};
use client::Request;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chronod=info".into()),
        )
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = exit_code_for(&e);
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    // config: CHRONOD_CONFIG path > ~/.chronod/chronod.toml > defaults
    let config_path = std::env::var("CHRONOD_CONFIG").ok();
    let config = ChronodConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("config load failed ({e}), using defaults");
        ChronodConfig::default()
    });

    let Some(request) = Request::from_cli(cli.command) else {
        // Hidden `serve` role: run the daemon in the foreground.
        return match server::run(&config).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("server failed: {e:#}");
                ExitCode::from(exit_code::SERVER_FAILED)
            }
        };
    };

    if !server_running(&config.channel.request_socket) {
        // A socket file nobody answers is a leftover from a crashed server;
        // clear it so the fresh instance can bind.
        let stale = std::path::Path::new(&config.channel.request_socket);
        if stale.exists() {
            let _ = std::fs::remove_file(stale);
        }

        println!("No scheduler server running — starting one in the background.");
        return match spawn_background_server() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("failed to start the scheduler server: {e}");
                ExitCode::from(exit_code::SERVER_FAILED)
            }
        };
    }

    match client::run(request, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[{}] {e}", e.code());
            ExitCode::from(exit_code::CLIENT_FAILED)
        }
    }
}

/// Re-exec this binary as a detached background server.
fn spawn_background_server() -> std::io::Result<()> {
    use std::process::Stdio;

    let exe = std::env::current_exe()?;
    std::process::Command::new(exe)
        .arg("serve")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    Ok(())
}
