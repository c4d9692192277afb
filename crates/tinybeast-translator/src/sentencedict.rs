use async_trait::async_trait;
use scraper::Html;
use tinybeast_types::{AggregatedTranslation, LangCode, SourceLang};

use crate::html::{selector, text_of};
use crate::{ProviderMetadata, TranslateError, Translator};

const PROVIDER: &str = "sentencedict";
const MAX_EXAMPLES: usize = 10;

/// English example sentences from sentencedict.com
#[derive(Clone)]
pub struct SentencedictTranslator {
    client: reqwest::Client,
    base_url: String,
}

impl SentencedictTranslator {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl Translator for SentencedictTranslator {
    async fn translate(
        &self,
        text: &str,
        from: &SourceLang,
        _to: &LangCode,
    ) -> Result<AggregatedTranslation, TranslateError> {
        // English queries only
        if !matches!(from, SourceLang::Auto) && from.as_str() != "en" {
            return Ok(AggregatedTranslation::default());
        }
        let text = text.trim().to_lowercase();
        if text.is_empty() {
            return Ok(AggregatedTranslation::default());
        }

        let url = format!("{}/{text}.html", self.base_url.trim_end_matches('/'));
        let response = self.client.get(&url).send().await?;
        if response.status() == 404 {
            return Ok(AggregatedTranslation::default());
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
            name: "Sentencedict".to_string(),
            requires_api_key: false,
            free_tier_available: true,
        }
    }
}

fn parse_page(body: &str) -> Result<AggregatedTranslation, TranslateError> {
    let document = Html::parse_document(body);
    let sentences = selector("#all > div")?;

    let examples = document
        .select(&sentences)
        .map(text_of)
        .map(|sentence| strip_numbering(&sentence).to_string())
        .filter(|sentence| !sentence.is_empty())
        .take(MAX_EXAMPLES)
        .collect();

    Ok(AggregatedTranslation {
        provider: PROVIDER.to_string(),
        examples,
        ..Default::default()
    })
}

/// "12, Some sentence." -> "Some sentence."
fn strip_numbering(sentence: &str) -> &str {
    let rest = sentence.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() == sentence.len() {
        return sentence;
    }
    match rest.strip_prefix([',', '.', ')']) {
        Some(rest) => rest.trim_start(),
        None => sentence,
    }
}
