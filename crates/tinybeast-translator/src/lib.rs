pub mod aggregate;
pub mod cambridge;
pub mod google;
mod html;
pub mod mymemory;
pub mod sentencedict;

pub use aggregate::AggregatingTranslator;
pub use cambridge::CambridgeTranslator;
pub use google::GoogleTranslator;
pub use mymemory::MyMemoryTranslator;
pub use sentencedict::SentencedictTranslator;

use tinybeast_types::{AggregatedTranslation, LangCode, SourceLang};

/// Online translation provider interface
#[async_trait::async_trait]
pub trait Translator: Send + Sync {
    /// Translate text, `from` may be auto-detect
    async fn translate(
        &self,
        text: &str,
        from: &SourceLang,
        to: &LangCode,
    ) -> Result<AggregatedTranslation, TranslateError>;

    /// Provider metadata
    fn metadata(&self) -> ProviderMetadata;
}

#[derive(Debug, Clone)]
pub struct ProviderMetadata {
    pub name: String,
    pub requires_api_key: bool,
    pub free_tier_available: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}
