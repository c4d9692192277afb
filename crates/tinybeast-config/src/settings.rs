use serde::{Deserialize, Serialize};
use tinybeast_types::{DictId, LangCode, Mode, SourceLang};

fn default_to() -> LangCode {
    "en".to_string()
}

/// Fields restored at startup and written back at shutdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    #[serde(alias = "activeTab")]
    pub mode: Mode,
    pub from: SourceLang,
    #[serde(default = "default_to")]
    pub to: LangCode,
    pub selected_offline_dict: Option<DictId>,
    pub downloaded_dicts: Vec<DictId>,
    pub should_translate_clipboard: bool,
    pub should_translate_selected_text: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: Mode::Online,
            from: SourceLang::Auto,
            to: default_to(),
            selected_offline_dict: None,
            downloaded_dicts: Vec::new(),
            should_translate_clipboard: false,
            should_translate_selected_text: false,
        }
    }
}
