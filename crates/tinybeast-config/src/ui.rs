use serde::{Deserialize, Serialize};

fn default_debounce_ms() -> u64 {
    700
}

fn default_clipboard_poll_ms() -> u64 {
    500
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct UiConfig {
    /// Quiet period before typed text is dispatched
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_clipboard_poll_ms")]
    pub clipboard_poll_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            clipboard_poll_ms: default_clipboard_poll_ms(),
        }
    }
}
