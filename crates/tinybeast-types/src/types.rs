use std::fmt;

use serde::{Deserialize, Serialize};

/// Language code as understood by the online providers ("en", "zh-CN", ...)
pub type LangCode = String;

/// Placeholder text rendered while an offline dictionary boots up
pub const INITIALIZING_MESSAGE: &str = "initializing, wait for a moment...";

/// Identifier of an installable offline dictionary
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DictId(String);

impl DictId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DictId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DictId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DictId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Online,
    Offline,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Online => f.write_str("online"),
            Mode::Offline => f.write_str("offline"),
        }
    }
}

/// Source side of the language pair; only the source may be auto-detected
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceLang {
    #[default]
    Auto,
    Lang(LangCode),
}

impl SourceLang {
    pub fn as_str(&self) -> &str {
        match self {
            SourceLang::Auto => "auto",
            SourceLang::Lang(code) => code,
        }
    }
}

impl From<String> for SourceLang {
    fn from(value: String) -> Self {
        match value.trim() {
            "" | "auto" => SourceLang::Auto,
            code => SourceLang::Lang(code.to_string()),
        }
    }
}

impl From<&str> for SourceLang {
    fn from(value: &str) -> Self {
        SourceLang::from(value.to_string())
    }
}

impl From<SourceLang> for String {
    fn from(value: SourceLang) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for SourceLang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the online aggregator. Each provider fills its own part.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregatedTranslation {
    pub primary: String,
    /// Provider of `primary`
    pub provider: String,
    /// Translation-memory hits
    #[serde(default)]
    pub alternatives: Vec<MemoryMatch>,
    /// Learner dictionary senses, single words only
    #[serde(default)]
    pub definitions: Vec<Definition>,
    /// Example sentences using the query
    #[serde(default)]
    pub examples: Vec<String>,
    /// Providers that contributed, in priority order
    #[serde(default)]
    pub sources: Vec<String>,
}

impl AggregatedTranslation {
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
            && self.alternatives.is_empty()
            && self.definitions.is_empty()
            && self.examples.is_empty()
    }
}

/// One sense from an online learner dictionary
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Definition {
    pub headword: String,
    #[serde(default)]
    pub pos: String,
    pub meaning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}

/// Translation-memory hit returned next to the primary translation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMatch {
    pub segment: String,
    pub translation: String,
    pub accuracy: f32,
}

/// One headword entry of an offline dictionary
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OfflineTranslation {
    #[serde(default)]
    pub pos: String,
    #[serde(default)]
    pub senses: Vec<Sense>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etymology_text: Option<String>,
    #[serde(default)]
    pub etymology_templates: Vec<EtymologyTemplate>,
    #[serde(default)]
    pub related: Vec<WordRef>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sense {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub glosses: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub form_of: Vec<WordRef>,
    #[serde(default)]
    pub alt_of: Vec<WordRef>,
    #[serde(default)]
    pub examples: Vec<Example>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WordRef {
    pub word: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EtymologyTemplate {
    #[serde(default)]
    pub expansion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Example {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, rename = "ref")]
    pub reference: Option<String>,
    #[serde(default)]
    pub english: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Whatever occupies the translation slot of the UI
#[derive(Debug, Clone, PartialEq)]
pub enum TranslationOutput {
    Online(AggregatedTranslation),
    Offline(OfflineTranslation),
    /// First-use placeholder for an offline dictionary
    Initializing,
    /// Backend failure, rendered in the same slot as a translation
    Error(String),
}

impl TranslationOutput {
    /// Text that can be fed back as a query or spoken
    pub fn primary_text(&self) -> Option<&str> {
        match self {
            TranslationOutput::Online(t) if !t.primary.is_empty() => Some(&t.primary),
            _ => None,
        }
    }
}

/// Observable state of the translation panel
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderState {
    pub query: String,
    pub result: Option<TranslationOutput>,
    pub is_loading: bool,
    pub mode: Mode,
    pub from: SourceLang,
    pub to: LangCode,
    pub offline_dict: Option<DictId>,
}

/// Progress event emitted by the dictionary backend while acquiring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadProgress {
    pub dict: DictId,
    pub percentage: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    Clipboard,
    Selection,
    Manual,
}

impl fmt::Display for TextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextSource::Clipboard => f.write_str("Clipboard"),
            TextSource::Selection => f.write_str("Selection"),
            TextSource::Manual => f.write_str("Manual"),
        }
    }
}

/// Events flowing from the front end and OS watchers into the app
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    QueryText(String),
    Submit,
    Clear,
    SetLanguagePair {
        from: SourceLang,
        to: LangCode,
    },
    SwapLanguages,
    SetMode {
        mode: Mode,
        dict: Option<DictId>,
    },
    FocusChanged(bool),
    TextSelected(String),
    ClipboardCopied(String),
    SetAutoTranslate {
        clipboard: Option<bool>,
        selection: Option<bool>,
    },
    Download(DictId),
    CancelDownload(DictId),
    DeleteDictionary(DictId),
    SelectDictionary(DictId),
    ListDictionaries,
    SpeakQuery,
    SpeakTranslation,
    Quit,
}
