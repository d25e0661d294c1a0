//! Client role: one validated request per invocation, replies drained for
//! Display only.

use chronod_core::config::ChronodConfig;
use chronod_core::{Result, TimeSpec};
use chronod_protocol::{Command, Query, ReplyChannel, RequestSender};
use tracing::{debug, warn};

use crate::cli::{CliCommand, ScheduleArgs};

/// A client request with the `serve` role already routed away.
#[derive(Debug)]
pub enum Request {
    Schedule {
        command: Command,
        spec: TimeSpec,
        program: String,
        args: Vec<String>,
    },
    Display,
    Cancel(u64),
    Shutdown,
}

impl Request {
    /// None for the hidden `serve` subcommand, which is not a client role.
    pub fn from_cli(command: CliCommand) -> Option<Request> {
        match command {
            CliCommand::Relative(args) => Some(schedule(Command::Relative, args)),
            CliCommand::Absolute(args) => Some(schedule(Command::Absolute, args)),
            CliCommand::Periodic(args) => Some(schedule(Command::Periodic, args)),
            CliCommand::Display => Some(Request::Display),
            CliCommand::Cancel { task_id } => Some(Request::Cancel(task_id)),
            CliCommand::Shutdown => Some(Request::Shutdown),
            CliCommand::Serve => None,
        }
    }
}

fn schedule(command: Command, args: ScheduleArgs) -> Request {
    Request::Schedule {
        command,
        spec: TimeSpec::new(args.years, args.days, args.hours, args.minutes, args.seconds),
        program: args.program,
        args: args.args,
    }
}

/// Send one request to the running server; for Display, stream replies to
/// stdout until the terminator.
pub async fn run(request: Request, config: &ChronodConfig) -> Result<()> {
    let socket = &config.channel.request_socket;
    match request {
        Request::Schedule {
            command,
            spec,
            program,
            args,
        } => {
            let sender = RequestSender::connect(socket)?;
            sender
                .send_query(&Query::schedule(command, spec, program, args))
                .await
        }
        Request::Cancel(task_id) => {
            let sender = RequestSender::connect(socket)?;
            sender.send_query(&Query::cancel(task_id)).await
        }
        Request::Shutdown => {
            let sender = RequestSender::connect(socket)?;
            sender.send_query(&Query::shutdown()).await
        }
        Request::Display => display(socket, &config.channel.reply_dir).await,
    }
}

/// The reply channel must exist before the query is sent, so a fast server
/// cannot answer into the void.
async fn display(socket: &str, reply_dir: &str) -> Result<()> {
    let reply = ReplyChannel::bind_for(reply_dir, std::process::id())?;
    let sender = RequestSender::connect(socket)?;
    sender
        .send_query(&Query::display(reply.path().display().to_string()))
        .await?;

    loop {
        match reply.recv_reply().await {
            Ok(r) if r.is_end() => {
                debug!("display stream complete");
                break;
            }
            Ok(line) => println!("{}", line.data),
            Err(e) => {
                // A lost reply ends the listing; it does not fail the client.
                warn!("reply receive failed: {e}");
                break;
            }
        }
    }
    Ok(())
}
