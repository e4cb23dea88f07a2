//! Command-line interface for the standalone runner

use crate::plugin::Plugin;
use clap::Parser;
use serde::Serialize;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

/// Command-line arguments for nts-radio
#[derive(Parser, Debug)]
#[command(author, version, about = "Play the two NTS Radio channels through an external player", long_about = None)]
pub struct Args {
    /// Config file path
    #[arg(short, long, env = "NTS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for the player control socket
    #[arg(short, long, env = "NTS_RUNTIME_DIR")]
    pub runtime_dir: Option<PathBuf>,

    /// Initial volume (0-100)
    #[arg(short, long, env = "NTS_VOLUME")]
    pub volume: Option<i64>,

    /// Do not restart the player when it exits unexpectedly
    #[arg(long)]
    pub no_autoconnect: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info", env = "NTS_LOG_LEVEL")]
    pub log_level: String,
}

/// One line of input on stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    Play(i64),
    Stop,
    Volume(i64),
    Autoconnect(bool),
    NowPlaying,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or_else(|| "empty command".to_string())?;
        let arg = words.next();
        if words.next().is_some() {
            return Err(format!("too many arguments for `{name}`"));
        }

        match (name.to_lowercase().as_str(), arg) {
            ("status", None) => Ok(Command::Status),
            ("play", Some(n)) => parse_int(n).map(Command::Play),
            ("stop", None) => Ok(Command::Stop),
            ("volume", Some(n)) => parse_int(n).map(Command::Volume),
            ("autoconnect", Some(flag)) => parse_flag(flag).map(Command::Autoconnect),
            ("now", None) => Ok(Command::NowPlaying),
            ("quit" | "q", None) => Ok(Command::Quit),
            _ => Err(format!("unknown command: {}", line.trim())),
        }
    }
}

fn parse_int(s: &str) -> Result<i64, String> {
    s.parse().map_err(|_| format!("not a number: {s}"))
}

fn parse_flag(s: &str) -> Result<bool, String> {
    match s.to_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(format!("expected on/off, got {s}")),
    }
}

fn encode<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| encode_error(e))
}

fn encode_error(message: impl std::fmt::Display) -> String {
    serde_json::json!({ "error": message.to_string() }).to_string()
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, line: &str) -> io::Result<()> {
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}

/// Answers one JSON line per command until EOF or `quit`.
async fn serve<R, W>(plugin: &Plugin, input: R, output: &mut W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    write_line(output, &encode(&plugin.get_status().await)).await?;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let reply = match Command::parse(&line) {
            Ok(Command::Status) => encode(&plugin.get_status().await),
            Ok(Command::Play(channel)) => match plugin.play(channel).await {
                Ok(status) => encode(&status),
                Err(e) => encode_error(e),
            },
            Ok(Command::Stop) => encode(&plugin.stop().await),
            Ok(Command::Volume(volume)) => encode(&plugin.set_volume(volume).await),
            Ok(Command::Autoconnect(enabled)) => encode(&plugin.set_autoconnect(enabled).await),
            Ok(Command::NowPlaying) => encode(&plugin.get_now_playing().await),
            Ok(Command::Quit) => break,
            Err(e) => encode_error(e),
        };
        write_line(output, &reply).await?;
    }
    Ok(())
}

/// Runs the command loop until EOF, `quit`, `shutdown` or an I/O error, then
/// unloads the plugin. The plugin is unloaded on every path, so a detached
/// player never outlives the runner.
pub async fn run<R, W, S>(plugin: &Plugin, input: R, mut output: W, shutdown: S) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Future<Output = ()>,
{
    let result = tokio::select! {
        result = serve(plugin, input, &mut output) => result,
        _ = shutdown => {
            info!("shutdown requested");
            Ok(())
        }
    };
    plugin.unload().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("status"), Ok(Command::Status));
        assert_eq!(Command::parse("  play 1 "), Ok(Command::Play(1)));
        assert_eq!(Command::parse("PLAY 7"), Ok(Command::Play(7)));
        assert_eq!(Command::parse("volume -5"), Ok(Command::Volume(-5)));
        assert_eq!(Command::parse("autoconnect off"), Ok(Command::Autoconnect(false)));
        assert_eq!(Command::parse("autoconnect on"), Ok(Command::Autoconnect(true)));
        assert_eq!(Command::parse("now"), Ok(Command::NowPlaying));
        assert_eq!(Command::parse("stop"), Ok(Command::Stop));
        assert_eq!(Command::parse("q"), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(Command::parse("").is_err());
        assert!(Command::parse("play").is_err());
        assert!(Command::parse("play one").is_err());
        assert!(Command::parse("stop now").is_err());
        assert!(Command::parse("autoconnect maybe").is_err());
        assert!(Command::parse("rewind").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from(["nts-radio", "--volume", "30", "--no-autoconnect"]);
        assert_eq!(args.volume, Some(30));
        assert!(args.no_autoconnect);
        assert!(args.config.is_none());
    }
}
