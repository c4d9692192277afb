use std::time::Duration;

use arboard::Clipboard;
use tinybeast_core::triggers::ClipboardReader;
use tokio::time;

/// Remembers the last clipboard text so only changes are reported
#[derive(Debug, Default)]
pub struct ClipboardChange {
    last_text: String,
}

impl ClipboardChange {
    pub fn observe(&mut self, text: String) -> Option<String> {
        if text.is_empty() || text == self.last_text {
            return None;
        }
        self.last_text = text.clone();
        Some(text)
    }
}

/// Poll the system clipboard and call `on_text` whenever it changes.
///
/// Whatever is on the clipboard at startup is treated as already seen.
pub async fn watch_clipboard<F>(poll: Duration, mut on_text: F) -> Result<(), anyhow::Error>
where
    F: FnMut(String) + Send + 'static,
{
    let mut clipboard = Clipboard::new()?;
    let mut change = ClipboardChange::default();
    if let Ok(text) = clipboard.get_text() {
        change.observe(text);
    }

    let mut interval = time::interval(poll);

    loop {
        interval.tick().await;
        if let Ok(text) = clipboard.get_text()
            && let Some(text) = change.observe(text)
        {
            on_text(text);
        }
    }
}

/// One-shot reads, opening the clipboard per call
pub struct SystemClipboard;

impl ClipboardReader for SystemClipboard {
    fn read_text(&self) -> Option<String> {
        let mut clipboard = match Clipboard::new() {
            Ok(clipboard) => clipboard,
            Err(e) => {
                tracing::warn!("Clipboard unavailable: {e}");
                return None;
            }
        };
        clipboard.get_text().ok().filter(|text| !text.is_empty())
    }
}
