use async_trait::async_trait;
use scraper::{ElementRef, Html};
use tinybeast_types::{AggregatedTranslation, Definition, LangCode, SourceLang};

use crate::html::{first_text, selector, text_of};
use crate::{ProviderMetadata, TranslateError, Translator};

const PROVIDER: &str = "cambridge";

/// Language code to Cambridge dictionary name
const DICTIONARIES: &[(&str, &str)] = &[
    ("en", "english"),
    ("fr", "french"),
    ("de", "german"),
    ("es", "spanish"),
    ("pt", "portuguese"),
    ("it", "italian"),
    ("no", "norwegian"),
    ("pl", "polish"),
    ("id", "indonesian"),
    ("nl", "dutch"),
    ("ja", "japanese"),
    ("ar", "arabic"),
    ("ca", "catalan"),
    ("zh-CN", "chinese-simplified"),
    ("zh-TW", "chinese-traditional"),
    ("cs", "czech"),
    ("da", "danish"),
    ("hi", "hindi"),
    ("ko", "korean"),
    ("ms", "malay"),
    ("ru", "russian"),
    ("th", "thai"),
    ("tr", "turkish"),
    ("uk", "ukrainian"),
    ("vi", "vietnamese"),
];

/// Only available as English -> X
const SEMI_BILINGUAL: &[&str] = &[
    "ar", "ca", "zh-CN", "zh-TW", "cs", "da", "hi", "ko", "ms", "ru", "th", "tr", "uk", "vi",
];

/// Scrapes Cambridge learner dictionary entries for single words
#[derive(Clone)]
pub struct CambridgeTranslator {
    client: reqwest::Client,
    base_url: String,
}

impl CambridgeTranslator {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl Translator for CambridgeTranslator {
    async fn translate(
        &self,
        text: &str,
        from: &SourceLang,
        to: &LangCode,
    ) -> Result<AggregatedTranslation, TranslateError> {
        let word = text.trim().to_lowercase();
        if word.is_empty() || word.contains(char::is_whitespace) {
            return Ok(AggregatedTranslation::default());
        }
        let Some(dictionary) = dictionary_path(from, to) else {
            tracing::debug!("No Cambridge dictionary for {from}|{to}");
            return Ok(AggregatedTranslation::default());
        };

        let url = format!("{}/{dictionary}/{word}", self.base_url.trim_end_matches('/'));
        tracing::debug!("Cambridge request {url}");

        let response = self.client.get(&url).send().await?;
        if response.status() == 404 {
            return Ok(AggregatedTranslation::default());
        }
        if response.status() == 429 {
            return Err(TranslateError::RateLimitExceeded);
        }
        if !response.status().is_success() {
            return Err(TranslateError::ApiError(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        parse_page(&body)
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: "Cambridge Dictionary".to_string(),
            requires_api_key: false,
            free_tier_available: true,
        }
    }
}

fn dictionary_name(code: &str) -> Option<&'static str> {
    DICTIONARIES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Path segment of the dictionary covering `from -> to`, if Cambridge has one
fn dictionary_path(from: &SourceLang, to: &str) -> Option<String> {
    let from = match from {
        SourceLang::Auto => "en",
        SourceLang::Lang(code) => code.as_str(),
    };
    let from_name = dictionary_name(from)?;
    let to_name = dictionary_name(to).unwrap_or("english");

    if from == "en" {
        return Some(match to_name {
            "english" => "english".to_string(),
            name => format!("english-{name}"),
        });
    }
    if from_name == to_name || to_name != "english" || SEMI_BILINGUAL.contains(&from) {
        return None;
    }
    Some(format!("{from_name}-english"))
}

fn parse_page(body: &str) -> Result<AggregatedTranslation, TranslateError> {
    let document = Html::parse_document(body);
    let entry = selector(".entry-body__el")?;
    let bilingual = selector(".kdic")?;

    let mut entries: Vec<ElementRef<'_>> = document.select(&entry).collect();
    if entries.is_empty() {
        entries = document.select(&bilingual).collect();
    }

    let headword = selector(".headword")?;
    let pos = selector(".pos")?;
    let block = selector(".def-block")?;
    let meaning = selector(".def")?;
    let translation = selector(".trans")?;
    let example = selector(".examp")?;

    let mut definitions = Vec::new();
    for entry in entries {
        let word = first_text(entry, &headword).unwrap_or_default();
        let part_of_speech = first_text(entry, &pos).unwrap_or_default();

        for sense in entry.select(&block) {
            let Some(text) = first_text(sense, &meaning) else {
                continue;
            };
            definitions.push(Definition {
                headword: word.clone(),
                pos: part_of_speech.clone(),
                meaning: text.trim_end_matches(':').trim_end().to_string(),
                translation: first_text(sense, &translation),
                examples: sense
                    .select(&example)
                    .map(text_of)
                    .filter(|e| !e.is_empty())
                    .collect(),
            });
        }
    }

    Ok(AggregatedTranslation {
        provider: PROVIDER.to_string(),
        definitions,
        ..Default::default()
    })
}
