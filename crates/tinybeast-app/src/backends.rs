use std::sync::Arc;

use anyhow::bail;
use tinybeast_config::speech::SpeechConfig;
use tinybeast_config::translator::TranslatorConfig;
use tinybeast_core::speaker::SpeechBackend;
use tinybeast_translator::{
    AggregatingTranslator, CambridgeTranslator, GoogleTranslator, MyMemoryTranslator,
    SentencedictTranslator, Translator,
};

/// Online providers in configured order. Unknown names are skipped.
pub fn build_translator(
    config: &TranslatorConfig,
    client: &reqwest::Client,
) -> anyhow::Result<AggregatingTranslator> {
    let mut providers: Vec<Arc<dyn Translator>> = Vec::new();

    for name in &config.providers {
        let provider: Arc<dyn Translator> = match name.as_str() {
            "google" => Arc::new(GoogleTranslator::new(client.clone(), config.google_url.clone())),
            "cambridge" => Arc::new(CambridgeTranslator::new(
                client.clone(),
                config.cambridge_url.clone(),
            )),
            "sentencedict" => Arc::new(SentencedictTranslator::new(
                client.clone(),
                config.sentencedict_url.clone(),
            )),
            "mymemory" => Arc::new(MyMemoryTranslator::new(
                client.clone(),
                config.api_url.clone(),
                config.email.clone(),
            )),
            other => {
                tracing::warn!("Unknown online provider {other:?}, skipping");
                continue;
            }
        };
        providers.push(provider);
    }

    if providers.is_empty() {
        bail!("No usable online provider in {:?}", config.providers);
    }
    Ok(AggregatingTranslator::new(providers))
}

#[cfg(feature = "audio")]
pub fn build_speech(config: &SpeechConfig, client: &reqwest::Client) -> Option<Arc<dyn SpeechBackend>> {
    use tinybeast_io::speech::{GttsSpeech, RodioOutput};

    tracing::info!("Speech via {}", config.tts_url);
    Some(Arc::new(GttsSpeech::new(
        client.clone(),
        config.tts_url.clone(),
        Arc::new(RodioOutput::new(config.volume)),
    )))
}

#[cfg(not(feature = "audio"))]
pub fn build_speech(_config: &SpeechConfig, _client: &reqwest::Client) -> Option<Arc<dyn SpeechBackend>> {
    tracing::info!("Built without the audio feature, speech is disabled");
    None
}
