//! Desired playback state and its reconciliation against the running player

use crate::config::Settings;
use crate::controller::ProcessController;
use crate::error::Result;
use tracing::{error, info};

/// One of the two fixed stations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    One,
    Two,
}

impl Channel {
    /// Any value other than 1 selects channel 2.
    pub fn from_raw(raw: i64) -> Self {
        if raw == 1 {
            Channel::One
        } else {
            Channel::Two
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            Channel::One => 1,
            Channel::Two => 2,
        }
    }
}

pub fn clamp_volume(volume: i64) -> u8 {
    volume.clamp(0, 100) as u8
}

/// The channel and stream the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub channel: Channel,
    pub url: String,
}

/// What the user wants, independent of what the player is doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredState {
    pub target: Option<Target>,
    volume: u8,
    pub autoconnect: bool,
}

impl DesiredState {
    pub fn new(volume: i64, autoconnect: bool) -> Self {
        Self {
            target: None,
            volume: clamp_volume(volume),
            autoconnect,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.volume.into(), settings.autoconnect)
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Stores the clamped volume and returns it.
    pub fn set_volume(&mut self, volume: i64) -> u8 {
        self.volume = clamp_volume(volume);
        self.volume
    }
}

/// Everything the control surface and the watchdog mutate together.
pub struct PlayerState {
    pub controller: ProcessController,
    pub desired: DesiredState,
}

impl PlayerState {
    pub fn new(controller: ProcessController, desired: DesiredState) -> Self {
        Self { controller, desired }
    }

    pub fn playing_channel(&mut self) -> Option<Channel> {
        if self.controller.is_alive() {
            self.controller.session().map(|s| s.channel)
        } else {
            None
        }
    }

    /// Stops any session and launches `target`, recording it as desired on success.
    pub fn switch_to(&mut self, target: Target) -> Result<()> {
        self.stop();
        self.controller
            .start(&target.url, target.channel, self.desired.volume())?;
        self.desired.target = Some(target);
        Ok(())
    }

    pub fn stop(&mut self) {
        self.controller.stop();
        self.desired.target = None;
    }

    /// One watchdog pass: restart the player if it died while autoconnect is on.
    ///
    /// Returns true when a restart was attempted.
    pub fn reconcile(&mut self) -> bool {
        if !self.desired.autoconnect {
            return false;
        }
        let Some(target) = self.desired.target.clone() else {
            return false;
        };
        if self.controller.is_alive() {
            return false;
        }

        info!(channel = target.channel.number(), "player died; restarting (autoconnect)");
        if let Err(e) = self
            .controller
            .start(&target.url, target.channel, self.desired.volume())
        {
            error!(channel = target.channel.number(), "watchdog restart failed: {}", e);
        }
        true
    }
}
