use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use tinybeast_types::{AggregatedTranslation, LangCode, SourceLang};

use crate::{ProviderMetadata, TranslateError, Translator};

/// Queries every provider at once and merges their parts.
///
/// Providers are listed by priority: the first non-empty `primary` wins and
/// the other parts are concatenated in order. Failing providers are skipped
/// unless nothing at all came back.
pub struct AggregatingTranslator {
    providers: Vec<Arc<dyn Translator>>,
}

impl AggregatingTranslator {
    pub fn new(providers: Vec<Arc<dyn Translator>>) -> Self {
        Self { providers }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl Translator for AggregatingTranslator {
    async fn translate(
        &self,
        text: &str,
        from: &SourceLang,
        to: &LangCode,
    ) -> Result<AggregatedTranslation, TranslateError> {
        let calls = self
            .providers
            .iter()
            .map(|provider| provider.translate(text, from, to));
        let results = join_all(calls).await;

        let names = self.providers.iter().map(|p| p.metadata().name);
        merge(names.zip(results))
    }

    fn metadata(&self) -> ProviderMetadata {
        let parts: Vec<ProviderMetadata> = self.providers.iter().map(|p| p.metadata()).collect();
        ProviderMetadata {
            name: parts
                .iter()
                .map(|m| m.name.as_str())
                .collect::<Vec<_>>()
                .join(" + "),
            requires_api_key: parts.iter().any(|m| m.requires_api_key),
            free_tier_available: parts.iter().all(|m| m.free_tier_available),
        }
    }
}

fn merge(
    results: impl Iterator<Item = (String, Result<AggregatedTranslation, TranslateError>)>,
) -> Result<AggregatedTranslation, TranslateError> {
    let mut merged = AggregatedTranslation::default();
    let mut first_error = None;

    for (name, result) in results {
        let part = match result {
            Ok(part) => part,
            Err(e) => {
                tracing::warn!("{name} failed: {e}");
                first_error.get_or_insert(e);
                continue;
            }
        };
        if part.is_empty() {
            tracing::debug!("{name} had nothing");
            continue;
        }

        if merged.primary.is_empty() && !part.primary.is_empty() {
            merged.primary = part.primary;
            merged.provider = part.provider.clone();
        }
        merged.alternatives.extend(part.alternatives);
        merged.definitions.extend(part.definitions);
        merged.examples.extend(part.examples);
        merged.sources.push(part.provider);
    }

    match first_error {
        Some(e) if merged.sources.is_empty() => Err(e),
        _ => Ok(merged),
    }
}
