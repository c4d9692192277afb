use async_trait::async_trait;
use scraper::Html;
use tinybeast_types::{AggregatedTranslation, LangCode, SourceLang};

use crate::html::{selector, text_of};
use crate::{ProviderMetadata, TranslateError, Translator};

const PROVIDER: &str = "google";

/// Scrapes the basic-HTML Google Translate page
#[derive(Clone)]
pub struct GoogleTranslator {
    client: reqwest::Client,
    page_url: String,
}

impl GoogleTranslator {
    pub fn new(client: reqwest::Client, page_url: String) -> Self {
        Self { client, page_url }
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(
        &self,
        text: &str,
        from: &SourceLang,
        to: &LangCode,
    ) -> Result<AggregatedTranslation, TranslateError> {
        let text = text.trim().to_lowercase();
        tracing::debug!("Google request {from}|{to}: {} chars", text.len());

        let response = self
            .client
            .get(&self.page_url)
            .query(&[("sl", from.as_str()), ("tl", to.as_str()), ("q", text.as_str())])
            .send()
            .await?;

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
            name: "Google Translate".to_string(),
            requires_api_key: false,
            free_tier_available: true,
        }
    }
}

fn parse_page(body: &str) -> Result<AggregatedTranslation, TranslateError> {
    let document = Html::parse_document(body);
    let result = selector(".result-container")?;

    let primary = document
        .select(&result)
        .next()
        .map(text_of)
        .ok_or_else(|| TranslateError::ApiError("No translation in page".to_string()))?;

    Ok(AggregatedTranslation {
        primary,
        provider: PROVIDER.to_string(),
        ..Default::default()
    })
}
