//! Restarts the player when it dies while autoconnect is enabled

use crate::state::PlayerState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Reconciles every `interval` until `cancel` fires.
///
/// There is no backoff and no retry limit: a player that keeps dying is
/// relaunched on every tick.
pub async fn run(state: Arc<Mutex<PlayerState>>, interval: Duration, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }
        let restarted = state.lock().await.reconcile();
        trace!(restarted, "watchdog tick");
    }
}
