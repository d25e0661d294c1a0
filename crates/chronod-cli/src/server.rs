//! Server role: owns the registry and the request channel, dispatches
//! queries serially until Shutdown.

use anyhow::Context;
use chronod_core::config::ChronodConfig;
use chronod_core::ChronodError;
use chronod_logger::control::{spawn_control, spawn_signal_bridge};
use chronod_logger::{Logger, Verbosity};
use chronod_protocol::{Command, Query, Reply, ReplySender, RequestChannel};
use chronod_scheduler::{AddRequest, RegistryHandle, ScheduleKind};
use tracing::{info, warn};

/// Run the daemon until a Shutdown query arrives. Startup failures release
/// what was acquired and surface as an error; per-request failures only ever
/// log.
pub async fn run(config: &ChronodConfig) -> anyhow::Result<()> {
    let logger = Logger::init(&config.log).context("logger initialization failed")?;
    let _ = logger.write(Verbosity::High, "scheduler server starting");

    let control = spawn_control(logger.clone());
    spawn_signal_bridge(control);

    let runtime = chronod_scheduler::start(Some(logger.clone()));
    let registry = runtime.registry();
    register_snapshot(&logger, registry.clone());

    let channel = match RequestChannel::bind(&config.channel.request_socket) {
        Ok(channel) => channel,
        Err(e) => {
            let _ = logger.write(
                Verbosity::Low,
                &format!("cannot open request channel: {e}"),
            );
            runtime.shutdown();
            let _ = logger.close();
            return Err(e).context("request channel bind failed (server already running?)");
        }
    };

    info!(path = %channel.path().display(), "listening for queries");
    let _ = logger.write(Verbosity::High, "scheduler server started");

    loop {
        let query = match channel.recv_query().await {
            Ok(query) => query,
            Err(e @ ChronodError::ChannelReceive { .. }) => {
                let _ = logger.write(Verbosity::Low, &format!("receive failed: {e}"));
                warn!("receive failed: {e}");
                continue;
            }
            Err(e) => {
                let _ = logger.write(Verbosity::Low, &format!("invalid command: {e}"));
                warn!("invalid command: {e}");
                continue;
            }
        };

        match query.command {
            Command::Relative | Command::Absolute | Command::Periodic => {
                handle_add(&registry, &logger, query);
            }
            Command::Display => handle_display(&registry, &logger, query.reply_to).await,
            Command::Cancel => {
                if registry.cancel(query.task_id) {
                    let _ = logger.write(
                        Verbosity::Standard,
                        &format!("task {} cancelled", query.task_id),
                    );
                    info!(task_id = query.task_id, "task cancelled");
                } else {
                    let _ = logger.write(
                        Verbosity::Standard,
                        &format!("task {} not found", query.task_id),
                    );
                    info!(task_id = query.task_id, "cancel target not found");
                }
            }
            Command::Shutdown => {
                let _ = logger.write(Verbosity::High, "scheduler server shutting down");
                info!("shutdown requested");
                registry.drain_all();
                runtime.shutdown();
                break;
            }
        }
    }

    drop(channel); // unlinks the request socket
    let _ = logger.close();
    Ok(())
}

fn handle_add(registry: &RegistryHandle, logger: &Logger, query: Query) {
    let kind = match query.command {
        Command::Absolute => ScheduleKind::Absolute,
        Command::Periodic => ScheduleKind::Periodic,
        _ => ScheduleKind::Relative,
    };
    let request = AddRequest {
        kind,
        program: query.program,
        args: query.args,
        spec: query.offset,
    };
    match registry.add(request) {
        Ok(id) => {
            let _ = logger.write(Verbosity::Standard, &format!("task {id} added"));
            info!(task_id = id, "task added");
        }
        Err(e) => {
            let _ = logger.write(Verbosity::Standard, &format!("failed to add task: {e}"));
            warn!("failed to add task: {e}");
        }
    }
}

/// Stream one Reply per task to the client's channel, then the terminator.
async fn handle_display(registry: &RegistryHandle, logger: &Logger, reply_to: Option<String>) {
    let Some(path) = reply_to else {
        let _ = logger.write(Verbosity::Low, "display query without a reply channel");
        warn!("display query without a reply channel");
        return;
    };
    let sender = match ReplySender::connect(&path) {
        Ok(sender) => sender,
        Err(e) => {
            let _ = logger.write(Verbosity::Low, &format!("cannot open reply channel: {e}"));
            warn!("cannot open reply channel: {e}");
            return;
        }
    };

    for task in registry.list() {
        let line = task.to_string();
        match sender.send_reply(&Reply::line(&line)).await {
            Ok(()) => {
                let _ = logger.write(Verbosity::Standard, &line);
            }
            Err(e) => {
                let _ = logger.write(Verbosity::Low, &format!("reply send failed: {e}"));
                warn!("reply send failed: {e}");
            }
        }
    }
    let _ = sender.send_reply(&Reply::end()).await;
}

/// Snapshot dumps report the live registry, not just logger state.
fn register_snapshot(logger: &Logger, registry: RegistryHandle) {
    logger.set_snapshot_source(move || {
        let tasks = registry.list();
        let mut out = format!(
            "pid: {}\npending tasks: {}\n",
            std::process::id(),
            tasks.len()
        );
        for task in &tasks {
            out.push_str(&task.to_string());
            out.push('\n');
        }
        out
    });
}
