//! Ownership of the single external player process

use crate::backend::PlayerBackend;
use crate::error::{Error, Result};
use crate::state::Channel;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::{getpgid, Pid};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, error, info};

/// A running player and what it was launched with.
#[derive(Debug)]
pub struct PlaybackSession {
    child: Child,
    pub channel: Channel,
    pub url: String,
}

impl PlaybackSession {
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

pub struct ProcessController {
    backend: Option<PlayerBackend>,
    ipc_path: PathBuf,
    session: Option<PlaybackSession>,
}

impl ProcessController {
    pub fn new(backend: Option<PlayerBackend>, ipc_path: PathBuf) -> Self {
        Self {
            backend,
            ipc_path,
            session: None,
        }
    }

    pub fn backend(&self) -> Option<&PlayerBackend> {
        self.backend.as_ref()
    }

    pub fn ipc_path(&self) -> &Path {
        &self.ipc_path
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    /// Launches the player for `url` in its own process group.
    ///
    /// Any previous session is terminated first and a stale control socket is
    /// removed so the new player can bind it.
    pub fn start(&mut self, url: &str, channel: Channel, volume: u8) -> Result<()> {
        let backend = self.backend.as_ref().ok_or(Error::NoPlayer)?;
        let args = backend.command_line(url, volume, Some(&self.ipc_path));

        if let Some(previous) = self.session.take() {
            terminate(previous);
        }
        remove_socket(&self.ipc_path);

        info!(channel = channel.number(), ?args, "starting player");
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| Error::config("empty player command"))?;
        let child = Command::new(program)
            .args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0)
            .spawn()
            .map_err(Error::Spawn)?;

        self.session = Some(PlaybackSession {
            child,
            channel,
            url: url.to_string(),
        });
        Ok(())
    }

    /// Terminates the session's process group, if any, and clears the socket.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            terminate(session);
        }
        remove_socket(&self.ipc_path);
    }

    pub fn is_alive(&mut self) -> bool {
        self.session.as_mut().is_some_and(PlaybackSession::is_alive)
    }
}

/// Sends SIGTERM to the whole process group of a still-running session.
fn terminate(mut session: PlaybackSession) {
    if !session.is_alive() {
        return;
    }
    let Some(pid) = session.pid() else {
        return;
    };
    let pid = Pid::from_raw(pid as i32);
    let result = getpgid(Some(pid)).and_then(|pgid| killpg(pgid, Signal::SIGTERM));
    match result {
        Ok(()) => info!(pid = pid.as_raw(), "stopped player"),
        Err(e) => error!(pid = pid.as_raw(), "kill error: {}", e),
    }
}

fn remove_socket(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => debug!(path = %path.display(), "could not remove control socket: {}", e),
    }
}
