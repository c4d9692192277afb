use tinybeast_types::{LangCode, Mode, SourceLang};

/// Languages selectable for online translation, display name and code
pub const ONLINE_LANGUAGES: &[(&str, &str)] = &[
    ("Afrikaans", "af"),
    ("Albanian", "sq"),
    ("Arabic", "ar"),
    ("Armenian", "hy"),
    ("Bengali", "bn"),
    ("Bosnian", "bs"),
    ("Bulgarian", "bg"),
    ("Catalan", "ca"),
    ("Chinese", "zh-CN"),
    ("Croatian", "hr"),
    ("Czech", "cs"),
    ("Danish", "da"),
    ("Dutch", "nl"),
    ("English", "en"),
    ("Esperanto", "eo"),
    ("Estonian", "et"),
    ("Filipino", "tl"),
    ("Finnish", "fi"),
    ("French", "fr"),
    ("German", "de"),
    ("Greek", "el"),
    ("Gujarati", "gu"),
    ("Hindi", "hi"),
    ("Hungarian", "hu"),
    ("Icelandic", "is"),
    ("Indonesian", "id"),
    ("Italian", "it"),
    ("Japanese", "ja"),
    ("Javanese", "jw"),
    ("Kannada", "kn"),
    ("Khmer", "km"),
    ("Korean", "ko"),
    ("Latin", "la"),
    ("Latvian", "lv"),
    ("Macedonian", "mk"),
    ("Malayalam", "ml"),
    ("Marathi", "mr"),
    ("Myanmar (Burmese)", "my"),
    ("Nepali", "ne"),
    ("Norwegian", "no"),
    ("Persian", "fa"),
    ("Polish", "pl"),
    ("Portuguese", "pt"),
    ("Romanian", "ro"),
    ("Russian", "ru"),
    ("Serbian", "sr"),
    ("Sinhala", "si"),
    ("Slovak", "sk"),
    ("Spanish", "es"),
    ("Sundanese", "su"),
    ("Swahili", "sw"),
    ("Swedish", "sv"),
    ("Tamil", "ta"),
    ("Telugu", "te"),
    ("Thai", "th"),
    ("Turkish", "tr"),
    ("Ukrainian", "uk"),
    ("Urdu", "ur"),
    ("Vietnamese", "vi"),
    ("Welsh", "cy"),
];

/// Languages the speech backend has no voice for
const UNSPEAKABLE: &[&str] = &["fa"];

pub fn is_online_language(code: &str) -> bool {
    ONLINE_LANGUAGES.iter().any(|(_, c)| *c == code)
}

pub fn language_name(code: &str) -> Option<&'static str> {
    ONLINE_LANGUAGES
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(name, _)| *name)
}

/// Exchange source and target. An auto-detect source has no language to move
/// into the target slot, so the target alternates between English and French.
pub fn swap_pair(from: &SourceLang, to: &LangCode) -> (SourceLang, LangCode) {
    let new_from = SourceLang::Lang(to.clone());
    let new_to = match from {
        SourceLang::Auto if to == "en" => "fr".to_string(),
        SourceLang::Auto => "en".to_string(),
        SourceLang::Lang(code) => code.clone(),
    };
    (new_from, new_to)
}

pub fn is_speakable(lang: &str) -> bool {
    !UNSPEAKABLE.contains(&lang)
}

/// Language of the query text for the active mode
pub fn query_language<'a>(mode: Mode, from: &'a SourceLang, offline_dict: Option<&'a str>) -> &'a str {
    match mode {
        Mode::Online => from.as_str(),
        Mode::Offline => offline_dict.unwrap_or("auto"),
    }
}
