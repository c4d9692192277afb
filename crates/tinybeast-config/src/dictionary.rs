use serde::{Deserialize, Serialize};

fn default_source_url() -> String {
    "http://localhost:8000/dicts/{id}.json".to_string()
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DictionaryConfig {
    /// Download location, `{id}` is replaced by the dictionary id
    #[serde(default = "default_source_url")]
    pub source_url: String,
    /// Install directory, platform data dir when unset
    #[serde(default)]
    pub data_dir: Option<String>,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            source_url: default_source_url(),
            data_dir: None,
        }
    }
}

impl DictionaryConfig {
    pub fn source_url_for(&self, id: &str) -> String {
        self.source_url.replace("{id}", id)
    }
}
