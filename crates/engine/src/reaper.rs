//! Single consumer of the launcher's exit channel.
//!
//! Removes the registry entry of every exited process. Job rows are
//! left alone: the liveness sweep requeues whatever the dead process
//! still held, so exit handling stays a pure registry concern.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::launcher::ProcessExit;
use crate::registry::ProcessRegistry;

/// Drain exit events until the channel closes or shutdown is signalled.
pub async fn run_reaper(
    mut exit_rx: mpsc::UnboundedReceiver<ProcessExit>,
    registry: Arc<ProcessRegistry>,
    cancel: CancellationToken,
) {
    loop {
        let exit = tokio::select! {
            _ = cancel.cancelled() => break,
            exit = exit_rx.recv() => match exit {
                Some(exit) => exit,
                None => break,
            },
        };
        match registry.remove(&exit.shebang).await {
            Some(entry) => {
                tracing::info!(shebang = %exit.shebang, process_uuid = ?entry.uuid,
                    "Exited interpreter removed from registry");
            }
            None => {
                // Already replaced by a newer spawn or swept earlier.
                tracing::debug!(shebang = %exit.shebang,
                    "Exit event for an unregistered interpreter");
            }
        }
    }
}
