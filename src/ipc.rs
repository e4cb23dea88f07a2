//! Live volume changes over mpv's JSON IPC socket

use crate::error::{Error, Result};
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;

/// Newline-terminated mpv command setting the `volume` property.
pub fn volume_command(volume: u8) -> String {
    let mut msg = json!({ "command": ["set_property", "volume", volume] }).to_string();
    msg.push('\n');
    msg
}

/// Connects once, sends the volume command and closes the connection.
pub async fn set_volume(path: &Path, volume: u8, timeout: Duration) -> Result<()> {
    let msg = volume_command(volume);
    let send = async {
        let mut stream = UnixStream::connect(path).await?;
        stream.write_all(msg.as_bytes()).await?;
        stream.shutdown().await
    };
    tokio::time::timeout(timeout, send)
        .await
        .map_err(|_| Error::IpcTimeout)?
        .map_err(Error::Ipc)
}
