use std::sync::Arc;
use std::time::Duration;

use kanal::AsyncSender;
use tinybeast_core::triggers::TriggerEvent;
use tokio_util::sync::CancellationToken;

use crate::state::AppState;

/// Feed OS clipboard changes into the clipboard port
pub async fn watcher_io(
    state: Arc<AppState>,
    cancel: CancellationToken,
    clipboard_tx: AsyncSender<TriggerEvent>,
) -> anyhow::Result<()> {
    let poll = {
        let config = state.config.read().await;
        Duration::from_millis(config.ui.clipboard_poll_ms.max(50))
    };

    tracing::info!("Starting clipboard watcher");

    let tx = clipboard_tx.clone();
    tokio::select! {
        result = tinybeast_io::clipboard::watch_clipboard(poll, move |text| {
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Err(e) = tx.send(TriggerEvent::ClipboardCopied(text)).await {
                    tracing::error!("Failed to send clipboard text to app: {}", e);
                }
            });
        }) => {
            if let Err(e) = result {
                // Headless sessions have no clipboard; the rest of the app keeps running
                tracing::warn!("Clipboard watcher unavailable: {e}");
                cancel.cancelled().await;
            }
        }
        _ = cancel.cancelled() => {
            tracing::info!("Clipboard watcher stopping");
        }
    }

    Ok(())
}
