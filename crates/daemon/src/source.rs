//! Local publish socket exposed as a [`MessageSource`].
//!
//! Publishers connect to a Unix socket and stream [`PublishRequest`] frames.
//! Each connection gets a reader thread that turns requests into messages for
//! the session, and a reply writer that sends one [`PublishReply`] per message
//! as it is settled. Replies for messages still pending when a session ends
//! are written after `receive` has returned.

use std::{
    fs, io,
    net::Shutdown,
    os::unix::net::{UnixListener, UnixStream},
    path::{Path, PathBuf},
    thread::{self, ScopedJoinHandle},
    time::Duration,
};

use crossbeam::channel::{self, Sender};
use log::{debug, error, info, warn};
use logmirror_core::{Handler, Message, MessageSource, Outcome, ReceiveContext, SourceError};
use logmirror_protocol::{
    Delivery, PublishReply, PublishRequest,
    codec::{read_message_opt, write_message},
};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// RAII guard that ensures the Unix socket file is removed on shutdown,
/// even if we return early or panic.
struct SocketGuard {
    path: PathBuf,
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path)
            && err.kind() != io::ErrorKind::NotFound
        {
            error!(
                "Failed to remove Unix socket at {} on shutdown: {err}",
                self.path.display()
            );
        }
    }
}

pub struct SocketSource {
    subscription: String,
    listener: UnixListener,
    guard: SocketGuard,
}

impl SocketSource {
    pub fn bind(subscription: impl Into<String>, socket_path: &Path) -> Result<Self, SourceError> {
        let unavailable = |what: &str, err: io::Error| {
            SourceError::Unavailable(format!("{what} {}: {err}", socket_path.display()))
        };

        if let Some(parent) = socket_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| unavailable("failed to create socket directory for", e))?;
        }

        // Clean up stale socket if it exists.
        if socket_path.exists() {
            fs::remove_file(socket_path)
                .map_err(|e| unavailable("failed to remove existing socket at", e))?;
        }

        let listener = UnixListener::bind(socket_path)
            .map_err(|e| unavailable("failed to bind Unix socket at", e))?;
        listener
            .set_nonblocking(true)
            .map_err(|e| unavailable("failed to configure Unix socket at", e))?;

        info!("Accepting publishers on {}", socket_path.display());

        Ok(Self {
            subscription: subscription.into(),
            listener,
            guard: SocketGuard {
                path: socket_path.to_path_buf(),
            },
        })
    }

    pub fn path(&self) -> &Path {
        &self.guard.path
    }
}

impl MessageSource for SocketSource {
    fn subscription(&self) -> &str {
        &self.subscription
    }

    fn receive(&self, ctx: &ReceiveContext, handler: &Handler<'_>) -> Result<(), SourceError> {
        thread::scope(|s| {
            // Live readers and the handles used to stop them.
            let mut connections: Vec<(ScopedJoinHandle<'_, ()>, UnixStream)> = Vec::new();

            let result = loop {
                if ctx.is_done() {
                    break Ok(());
                }

                // Publishers that hung up no longer need a descriptor here.
                connections.retain(|(reader, _)| !reader.is_finished());

                match self.listener.accept() {
                    Ok((stream, _addr)) => match open_connection(stream) {
                        Ok((reader, control, replies)) => {
                            let handle = s.spawn(move || read_loop(reader, replies, handler));
                            connections.push((handle, control));
                        }
                        Err(err) => warn!("Dropping publisher connection: {err}"),
                    },
                    Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => {
                        thread::sleep(POLL_INTERVAL.min(ctx.remaining()));
                    }
                    Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => {
                        error!("Accept error: {err}");
                        break Err(SourceError::Io(err));
                    }
                }
            };

            // Unblock readers; replies can still be written.
            for (_, conn) in &connections {
                let _ = conn.shutdown(Shutdown::Read);
            }

            result
        })
    }
}

/// Split an accepted stream into the reader half, a handle used to stop it,
/// and the sender feeding its reply writer.
fn open_connection(
    stream: UnixStream,
) -> io::Result<(UnixStream, UnixStream, Sender<PublishReply>)> {
    stream.set_nonblocking(false)?;
    let control = stream.try_clone()?;
    let writer = stream.try_clone()?;
    Ok((stream, control, spawn_reply_writer(writer)))
}

/// The writer outlives the session's receive call: it exits once every
/// message from this connection has been settled.
fn spawn_reply_writer(mut stream: UnixStream) -> Sender<PublishReply> {
    let (tx, rx) = channel::unbounded::<PublishReply>();

    thread::spawn(move || {
        for reply in rx.iter() {
            if let Err(err) = write_message(&mut stream, &reply) {
                debug!("Publisher went away before reply {}: {err:#}", reply.id);
                break;
            }
        }
    });

    tx
}

fn read_loop(mut stream: UnixStream, replies: Sender<PublishReply>, handler: &Handler<'_>) {
    loop {
        match read_message_opt::<_, PublishRequest>(&mut stream) {
            Ok(Some(req)) => {
                let replies = replies.clone();
                let id = req.id;
                handler(Message::new(req.data, move |outcome: Outcome| {
                    let delivery = match outcome {
                        Outcome::Ack => Delivery::Ack,
                        Outcome::Nack => Delivery::Nack,
                    };
                    let _ = replies.send(PublishReply { id, delivery });
                }));
            }
            Ok(None) => break,
            Err(err) => {
                debug!("Publisher connection closed: {err:#}");
                break;
            }
        }
    }
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
