use serde::{Deserialize, Serialize};

fn default_tts_url() -> String {
    "https://translate.google.com/translate_tts".to_string()
}

fn default_volume() -> f32 {
    1.0
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SpeechConfig {
    #[serde(default = "default_tts_url")]
    pub tts_url: String,
    /// Between 0.0 and 1.0
    #[serde(default = "default_volume")]
    pub volume: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            tts_url: default_tts_url(),
            volume: default_volume(),
        }
    }
}
