//! Control surface exposed to the frontend, plus load/unload

use crate::backend::{self, PlayerBackend, PlayerKind};
use crate::config::Settings;
use crate::controller::ProcessController;
use crate::error::{Error, Result};
use crate::ipc;
use crate::metadata::{self, MetadataClient, NowPlaying, SharedNowPlaying};
use crate::state::{Channel, DesiredState, PlayerState, Target};
use crate::watchdog;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Snapshot returned by every control call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub available: bool,
    pub playing: bool,
    pub channel: Option<u8>,
    pub player: Option<PlayerKind>,
    pub volume: u8,
    pub autoconnect: bool,
}

/// One plugin instance: the player state, the metadata snapshot and the two
/// background loops.
pub struct Plugin {
    settings: Settings,
    state: Arc<Mutex<PlayerState>>,
    now_playing: SharedNowPlaying,
    metadata: MetadataClient,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Plugin {
    /// Builds a plugin around an already selected backend without starting
    /// the background loops.
    pub fn new(settings: Settings, backend: Option<PlayerBackend>) -> Result<Self> {
        settings.validate()?;
        let metadata = MetadataClient::new(
            settings.metadata_url.clone(),
            &settings.user_agent,
            settings.metadata_timeout(),
        )?;
        let controller = ProcessController::new(backend, settings.ipc_path());
        let state = PlayerState::new(controller, DesiredState::from_settings(&settings));

        Ok(Self {
            settings,
            state: Arc::new(Mutex::new(state)),
            now_playing: Arc::new(RwLock::new(NowPlaying::default())),
            metadata,
            cancel: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Probes for a player, then starts the watchdog and metadata loops.
    pub async fn load(settings: Settings) -> Result<Self> {
        let backend = backend::detect();
        info!(player = ?backend.as_ref().map(|b| b.kind), "loaded");
        if backend.is_none() {
            warn!("No player found (mpv or Flatpak MPV/VLC).");
        }

        let plugin = Self::new(settings, backend)?;
        plugin.start_background().await;
        Ok(plugin)
    }

    /// Spawns the watchdog and metadata loops. Calling it twice is a no-op.
    pub async fn start_background(&self) {
        let mut tasks = self.tasks.lock().await;
        if !tasks.is_empty() {
            return;
        }

        tasks.push(tokio::spawn(watchdog::run(
            self.state.clone(),
            self.settings.watchdog_interval(),
            self.cancel.clone(),
        )));
        tasks.push(tokio::spawn(metadata::run(
            self.metadata.clone(),
            self.now_playing.clone(),
            self.settings.metadata_interval(),
            self.cancel.clone(),
        )));
    }

    /// Cancels both loops and stops playback.
    pub async fn unload(&self) {
        self.cancel.cancel();
        let tasks: Vec<_> = self.tasks.lock().await.drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!("background task ended abnormally: {}", e);
            }
        }
        self.stop().await;
        info!("unloaded");
    }

    pub async fn get_status(&self) -> Status {
        let mut state = self.state.lock().await;
        status(&mut state)
    }

    /// Stores the clamped volume and pushes it to a running player if it can.
    pub async fn set_volume(&self, volume: i64) -> Status {
        let mut state = self.state.lock().await;
        let volume = state.desired.set_volume(volume);
        push_live_volume(&mut state, volume, self.settings.ipc_timeout()).await;
        status(&mut state)
    }

    /// Best-effort live volume change; false when nothing could be applied.
    ///
    /// The desired volume is recorded either way and used on the next launch.
    pub async fn apply_live_volume(&self, volume: i64) -> bool {
        let mut state = self.state.lock().await;
        let volume = state.desired.set_volume(volume);
        push_live_volume(&mut state, volume, self.settings.ipc_timeout()).await
    }

    pub async fn set_autoconnect(&self, enabled: bool) -> Status {
        let mut state = self.state.lock().await;
        state.desired.autoconnect = enabled;
        status(&mut state)
    }

    /// Switches to `channel` (1, anything else means 2).
    ///
    /// Asking for the channel that is already playing leaves the player alone.
    pub async fn play(&self, channel: i64) -> Result<Status> {
        let mut state = self.state.lock().await;
        if state.controller.backend().is_none() {
            return Err(Error::NoPlayer);
        }

        let channel = Channel::from_raw(channel);
        if state.playing_channel() == Some(channel) {
            return Ok(status(&mut state));
        }

        let url = self.settings.stream_url(channel).to_string();
        state.switch_to(Target { channel, url })?;
        Ok(status(&mut state))
    }

    pub async fn stop(&self) -> Status {
        let mut state = self.state.lock().await;
        state.stop();
        status(&mut state)
    }

    pub async fn get_now_playing(&self) -> NowPlaying {
        self.now_playing.read().await.clone()
    }

    /// Runs one metadata fetch outside the regular cadence.
    pub async fn refresh_now_playing(&self) -> bool {
        self.metadata.refresh(&self.now_playing).await
    }

    /// PID of the current player process, for diagnostics.
    pub async fn player_pid(&self) -> Option<u32> {
        let state = self.state.lock().await;
        state.controller.session().and_then(|s| s.pid())
    }
}

fn status(state: &mut PlayerState) -> Status {
    let channel = state.playing_channel();
    let player = state.controller.backend().map(|b| b.kind);
    Status {
        available: player.is_some(),
        playing: channel.is_some(),
        channel: channel.map(|c| c.number()),
        player,
        volume: state.desired.volume(),
        autoconnect: state.desired.autoconnect,
    }
}

async fn push_live_volume(state: &mut PlayerState, volume: u8, timeout: Duration) -> bool {
    let supports_ipc = state
        .controller
        .backend()
        .is_some_and(|b| b.supports_ipc);
    if !supports_ipc || !state.controller.is_alive() {
        return false;
    }
    let path = state.controller.ipc_path();
    if !path.exists() {
        return false;
    }

    match ipc::set_volume(path, volume, timeout).await {
        Ok(()) => {
            debug!(volume, "volume applied live");
            true
        }
        Err(e) => {
            debug!(volume, "live volume change failed: {}", e);
            false
        }
    }
}
