//! Player backend selection
//!
//! The plugin never decodes audio itself. At load time it looks for an
//! external player, preferring a plain `mpv` on `PATH`, then the Flatpak
//! builds of MPV and VLC. The first hit is kept for the lifetime of the
//! process.

use serde::Serialize;
use std::path::Path;
use std::process::{Command, Stdio};

pub const MPV_FLATPAK_ID: &str = "io.mpv.Mpv";
pub const VLC_FLATPAK_ID: &str = "org.videolan.VLC";

const WINDOW_TITLE: &str = "NTS Radio";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerKind {
    Mpv,
    MpvFlatpak,
    VlcFlatpak,
}

/// The external player chosen at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerBackend {
    pub kind: PlayerKind,
    /// Program and leading arguments, e.g. `["flatpak", "run", "io.mpv.Mpv"]`
    pub cmd_prefix: Vec<String>,
    /// Whether the player exposes a JSON IPC socket for live property changes
    pub supports_ipc: bool,
}

impl PlayerBackend {
    pub fn mpv() -> Self {
        Self {
            kind: PlayerKind::Mpv,
            cmd_prefix: vec!["mpv".to_string()],
            supports_ipc: true,
        }
    }

    pub fn mpv_flatpak() -> Self {
        Self {
            kind: PlayerKind::MpvFlatpak,
            cmd_prefix: flatpak_run(MPV_FLATPAK_ID),
            supports_ipc: true,
        }
    }

    pub fn vlc_flatpak() -> Self {
        Self {
            kind: PlayerKind::VlcFlatpak,
            cmd_prefix: flatpak_run(VLC_FLATPAK_ID),
            supports_ipc: false,
        }
    }

    /// Builds the full command line for playing `url`.
    ///
    /// mpv-family players get the IPC server flag when `ipc_path` is given and
    /// the backend supports it. VLC has no volume flag in percent, so the
    /// volume is passed as a linear gain.
    pub fn command_line(&self, url: &str, volume: u8, ipc_path: Option<&Path>) -> Vec<String> {
        let mut cmd = self.cmd_prefix.clone();
        match self.kind {
            PlayerKind::Mpv | PlayerKind::MpvFlatpak => {
                cmd.extend([
                    "--no-video".to_string(),
                    "--keep-open=no".to_string(),
                    "--really-quiet".to_string(),
                    format!("--title={WINDOW_TITLE}"),
                    format!("--volume={volume}"),
                ]);
                if let (true, Some(path)) = (self.supports_ipc, ipc_path) {
                    cmd.push(format!("--input-ipc-server={}", path.display()));
                }
            }
            PlayerKind::VlcFlatpak => {
                cmd.extend([
                    "--intf".to_string(),
                    "dummy".to_string(),
                    "--no-video".to_string(),
                    "--quiet".to_string(),
                    format!("--gain={:.2}", f32::from(volume) / 100.0),
                ]);
            }
        }
        cmd.push(url.to_string());
        cmd
    }
}

fn flatpak_run(app_id: &str) -> Vec<String> {
    vec!["flatpak".to_string(), "run".to_string(), app_id.to_string()]
}

/// Answers "is this player installed?" questions during selection.
pub trait Probe {
    /// True if `program` can be executed from `PATH`.
    fn has_program(&self, program: &str) -> bool;
    /// True if the Flatpak application `app_id` is installed.
    fn has_flatpak_app(&self, app_id: &str) -> bool;
}

/// Probes the real system by running the candidate programs.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl Probe for SystemProbe {
    fn has_program(&self, program: &str) -> bool {
        Command::new(program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }

    fn has_flatpak_app(&self, app_id: &str) -> bool {
        Command::new("flatpak")
            .args(["info", app_id])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

/// Picks the first available backend in priority order, or `None`.
pub fn select_backend(probe: &impl Probe) -> Option<PlayerBackend> {
    if probe.has_program("mpv") {
        return Some(PlayerBackend::mpv());
    }
    if !probe.has_program("flatpak") {
        return None;
    }
    if probe.has_flatpak_app(MPV_FLATPAK_ID) {
        return Some(PlayerBackend::mpv_flatpak());
    }
    if probe.has_flatpak_app(VLC_FLATPAK_ID) {
        return Some(PlayerBackend::vlc_flatpak());
    }
    None
}

/// Probes the running system once.
pub fn detect() -> Option<PlayerBackend> {
    select_backend(&SystemProbe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeProbe {
        programs: Vec<&'static str>,
        apps: Vec<&'static str>,
        asked_apps: RefCell<Vec<String>>,
    }

    impl Probe for FakeProbe {
        fn has_program(&self, program: &str) -> bool {
            self.programs.contains(&program)
        }

        fn has_flatpak_app(&self, app_id: &str) -> bool {
            self.asked_apps.borrow_mut().push(app_id.to_string());
            self.apps.contains(&app_id)
        }
    }

    #[test]
    fn test_prefers_mpv_on_path() {
        let probe = FakeProbe {
            programs: vec!["mpv", "flatpak"],
            apps: vec![MPV_FLATPAK_ID, VLC_FLATPAK_ID],
            ..Default::default()
        };
        assert_eq!(select_backend(&probe), Some(PlayerBackend::mpv()));
        assert!(probe.asked_apps.borrow().is_empty());
    }

    #[test]
    fn test_flatpak_priority_order() {
        let probe = FakeProbe {
            programs: vec!["flatpak"],
            apps: vec![VLC_FLATPAK_ID, MPV_FLATPAK_ID],
            ..Default::default()
        };
        assert_eq!(select_backend(&probe).map(|b| b.kind), Some(PlayerKind::MpvFlatpak));

        let probe = FakeProbe {
            programs: vec!["flatpak"],
            apps: vec![VLC_FLATPAK_ID],
            ..Default::default()
        };
        let backend = select_backend(&probe).unwrap();
        assert_eq!(backend.kind, PlayerKind::VlcFlatpak);
        assert!(!backend.supports_ipc);
    }

    #[test]
    fn test_no_flatpak_skips_app_probes() {
        let probe = FakeProbe {
            apps: vec![MPV_FLATPAK_ID],
            ..Default::default()
        };
        assert_eq!(select_backend(&probe), None);
        assert!(probe.asked_apps.borrow().is_empty());
    }

    #[test]
    fn test_mpv_command_line() {
        let cmd = PlayerBackend::mpv_flatpak().command_line(
            "http://radio/stream",
            55,
            Some(Path::new("/run/nts/mpv.sock")),
        );
        assert_eq!(
            cmd,
            vec![
                "flatpak",
                "run",
                "io.mpv.Mpv",
                "--no-video",
                "--keep-open=no",
                "--really-quiet",
                "--title=NTS Radio",
                "--volume=55",
                "--input-ipc-server=/run/nts/mpv.sock",
                "http://radio/stream",
            ]
        );
    }

    #[test]
    fn test_mpv_command_line_without_socket() {
        let cmd = PlayerBackend::mpv().command_line("http://radio/stream", 0, None);
        assert!(!cmd.iter().any(|arg| arg.starts_with("--input-ipc-server")));
        assert_eq!(cmd.last().map(String::as_str), Some("http://radio/stream"));
    }

    #[test]
    fn test_vlc_command_line_ignores_socket() {
        let cmd = PlayerBackend::vlc_flatpak().command_line(
            "http://radio/stream2",
            70,
            Some(Path::new("/tmp/ignored.sock")),
        );
        assert_eq!(
            cmd,
            vec![
                "flatpak",
                "run",
                "org.videolan.VLC",
                "--intf",
                "dummy",
                "--no-video",
                "--quiet",
                "--gain=0.70",
                "http://radio/stream2",
            ]
        );
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(serde_json::to_string(&PlayerKind::Mpv).unwrap(), "\"mpv\"");
        assert_eq!(
            serde_json::to_string(&PlayerKind::MpvFlatpak).unwrap(),
            "\"mpv_flatpak\""
        );
        assert_eq!(
            serde_json::to_string(&PlayerKind::VlcFlatpak).unwrap(),
            "\"vlc_flatpak\""
        );
    }
}
