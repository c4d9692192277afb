use std::env;

use serde::{Deserialize, Serialize};

use self::dictionary::DictionaryConfig;
use self::network::NetworkConfig;
use self::speech::SpeechConfig;
use self::translator::TranslatorConfig;
use self::ui::UiConfig;

pub mod dictionary;
pub mod network;
pub mod settings;
pub mod speech;
pub mod translator;
pub mod ui;

pub use settings::Settings;

#[derive(Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub ui: UiConfig,
    pub translator: TranslatorConfig,
    pub dictionary: DictionaryConfig,
    pub speech: SpeechConfig,
}

impl Config {
    /// Defaults overridden by environment variables
    pub fn new() -> Self {
        let mut config = Config::default();

        if let Some(debounce_ms) = env_parse("DEBOUNCE_MS") {
            config.ui.debounce_ms = debounce_ms;
        }
        if let Some(poll_ms) = env_parse("CLIPBOARD_POLL_MS") {
            config.ui.clipboard_poll_ms = poll_ms;
        }
        if let Some(timeout) = env_parse("TIMEOUT_SECONDS") {
            config.network.timeout_seconds = timeout;
        }
        if let Ok(providers) = env::var("TRANSLATOR_PROVIDERS") {
            config.translator.providers = providers
                .split(',')
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect();
        }
        if let Ok(url) = env::var("MYMEMORY_URL") {
            config.translator.api_url = url;
        }
        if let Ok(email) = env::var("MYMEMORY_EMAIL") {
            config.translator.email = Some(email);
        }
        if let Ok(url) = env::var("DICT_SOURCE_URL") {
            config.dictionary.source_url = url;
        }
        if let Ok(dir) = env::var("DICT_DATA_DIR") {
            config.dictionary.data_dir = Some(dir);
        }
        if let Ok(url) = env::var("TTS_URL") {
            config.speech.tts_url = url;
        }
        if let Some(volume) = env_parse("TTS_VOLUME") {
            config.speech.volume = volume;
        }

        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
