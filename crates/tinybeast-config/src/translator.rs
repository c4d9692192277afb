use serde::{Deserialize, Serialize};

fn default_providers() -> Vec<String> {
    ["google", "cambridge", "sentencedict", "mymemory"]
        .map(String::from)
        .to_vec()
}

fn default_api_url() -> String {
    "https://api.mymemory.translated.net/get".to_string()
}

fn default_google_url() -> String {
    "https://translate.google.com/m".to_string()
}

fn default_cambridge_url() -> String {
    "https://dictionary.cambridge.org/dictionary".to_string()
}

fn default_sentencedict_url() -> String {
    "https://sentencedict.com".to_string()
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Online providers by priority. The first one with a translation
    /// supplies the primary text.
    #[serde(default = "default_providers")]
    pub providers: Vec<String>,
    /// MyMemory endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Raises the MyMemory daily quota when set
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "default_google_url")]
    pub google_url: String,
    #[serde(default = "default_cambridge_url")]
    pub cambridge_url: String,
    #[serde(default = "default_sentencedict_url")]
    pub sentencedict_url: String,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            providers: default_providers(),
            api_url: default_api_url(),
            email: None,
            google_url: default_google_url(),
            cambridge_url: default_cambridge_url(),
            sentencedict_url: default_sentencedict_url(),
        }
    }
}
