use std::{
    collections::HashSet,
    io::{self, BufRead},
    net::Shutdown,
    os::unix::net::UnixStream,
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};

use anyhow::Context;
use clap::Args;
use log::debug;
use logmirror_protocol::{
    Delivery, PublishReply, PublishRequest,
    codec::{read_message_opt, write_message},
};
use logmirror_runtime::default_socket_path;

use crate::commands::CommandResult;

#[derive(Debug, Args)]
pub struct PublishArgs {
    /// Messages to publish; read one per line from stdin until EOF when omitted
    pub messages: Vec<String>,

    /// Path to the worker's Unix domain socket
    #[arg(long)]
    pub socket_path: Option<PathBuf>,

    /// Seconds to wait for the worker to settle the messages
    #[arg(long, default_value = "30")]
    pub timeout: u64,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PublishSummary {
    pub acked: usize,
    pub nacked: usize,
    pub unanswered: usize,
}

impl PublishSummary {
    pub fn all_acked(&self) -> bool {
        self.nacked == 0 && self.unanswered == 0
    }
}

pub fn run(args: PublishArgs) -> ExitCode {
    match execute(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("[error] {e}");
            ExitCode::from(2)
        }
    }
}

/// Collect one message per line. Publishing starts only once `input` ends.
fn read_messages(input: impl BufRead) -> io::Result<Vec<String>> {
    input.lines().collect()
}

fn execute(args: PublishArgs) -> CommandResult<ExitCode> {
    let messages = if args.messages.is_empty() {
        read_messages(io::stdin().lock())?
    } else {
        args.messages
    };

    let socket_path = args.socket_path.unwrap_or_else(default_socket_path);
    let mut stream = UnixStream::connect(&socket_path).with_context(|| {
        format!(
            "failed to connect to logmirror worker at {}",
            socket_path.display()
        )
    })?;

    let summary = publish_all(&mut stream, &messages, Duration::from_secs(args.timeout))?;

    println!(
        "acked: {}  nacked: {}  unanswered: {}",
        summary.acked, summary.nacked, summary.unanswered
    );

    if summary.all_acked() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}

/// Send every message, then collect one reply per message until the worker
/// closes the connection or `timeout` passes without a reply.
pub fn publish_all(
    stream: &mut UnixStream,
    messages: &[String],
    timeout: Duration,
) -> anyhow::Result<PublishSummary> {
    for (id, msg) in messages.iter().enumerate() {
        let req = PublishRequest {
            id: id as u64,
            data: msg.as_bytes().to_vec(),
        };
        write_message(stream, &req).context("failed to send message")?;
    }
    stream.shutdown(Shutdown::Write)?;

    stream.set_read_timeout(Some(timeout.max(Duration::from_millis(1))))?;

    let mut pending: HashSet<u64> = (0..messages.len() as u64).collect();
    let mut summary = PublishSummary::default();

    while !pending.is_empty() {
        let reply: PublishReply = match read_message_opt(stream) {
            Ok(Some(reply)) => reply,
            Ok(None) => break,
            Err(e) => {
                debug!("Stopped waiting for replies: {e:#}");
                break;
            }
        };

        if !pending.remove(&reply.id) {
            debug!("Ignoring reply for unknown message {}", reply.id);
            continue;
        }

        match reply.delivery {
            Delivery::Ack => summary.acked += 1,
            Delivery::Nack => summary.nacked += 1,
        }
    }

    summary.unanswered = pending.len();
    Ok(summary)
}

#[cfg(test)]
#[path = "publish_tests.rs"]
mod tests;
