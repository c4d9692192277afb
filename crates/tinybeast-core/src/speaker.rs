use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::language::is_speakable;

/// Text-to-speech boundary
#[async_trait::async_trait]
pub trait SpeechBackend: Send + Sync {
    async fn speak(&self, text: &str, lang: &str) -> Result<(), SpeechError>;
}

#[derive(Debug, thiserror::Error)]
#[error("Speech failed: {0}")]
pub struct SpeechError(pub String);

/// Fire-and-forget speech with a single call in flight
#[derive(Clone)]
pub struct Speaker {
    backend: Option<Arc<dyn SpeechBackend>>,
    speaking: Arc<AtomicBool>,
}

impl Speaker {
    pub fn new(backend: Option<Arc<dyn SpeechBackend>>) -> Self {
        Self {
            backend,
            speaking: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    /// Returns false when the request was ignored
    pub fn speak(&self, text: &str, lang: &str) -> bool {
        let text = text.trim();
        if text.is_empty() || !is_speakable(lang) {
            return false;
        }

        let Some(backend) = self.backend.clone() else {
            tracing::debug!("No speech backend configured");
            return false;
        };

        // Don't start again if already speaking
        if self.speaking.swap(true, Ordering::SeqCst) {
            tracing::debug!("Speech already in flight, ignoring");
            return false;
        }

        let speaking = self.speaking.clone();
        let text = text.to_string();
        let lang = lang.to_string();

        tokio::spawn(async move {
            if let Err(e) = backend.speak(&text, &lang).await {
                tracing::warn!("{e}");
            }
            speaking.store(false, Ordering::SeqCst);
        });

        true
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::Notify;

    use super::*;

    struct GatedSpeech {
        release: Notify,
        spoken: kanal::AsyncSender<(String, String)>,
    }

    #[async_trait::async_trait]
    impl SpeechBackend for GatedSpeech {
        async fn speak(&self, text: &str, lang: &str) -> Result<(), SpeechError> {
            self.spoken
                .send((text.to_string(), lang.to_string()))
                .await
                .map_err(|e| SpeechError(e.to_string()))?;
            self.release.notified().await;
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn second_call_is_ignored_while_speaking() {
        let (tx, rx) = kanal::unbounded_async();
        let backend = Arc::new(GatedSpeech {
            release: Notify::new(),
            spoken: tx,
        });
        let speaker = Speaker::new(Some(backend.clone()));

        assert!(speaker.speak("hello", "en"));
        assert_eq!(rx.recv().await.unwrap(), ("hello".to_string(), "en".to_string()));
        assert!(!speaker.speak("again", "en"));

        backend.release.notify_one();
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(!speaker.is_speaking());
        assert!(speaker.speak("again", "en"));
    }

    #[tokio::test]
    async fn skips_empty_text_and_persian() {
        let (tx, _rx) = kanal::unbounded_async();
        let backend = Arc::new(GatedSpeech {
            release: Notify::new(),
            spoken: tx,
        });
        let speaker = Speaker::new(Some(backend));

        assert!(!speaker.speak("   ", "en"));
        assert!(!speaker.speak("سلام", "fa"));
        assert!(!speaker.is_speaking());
    }

    #[tokio::test]
    async fn no_backend_is_a_no_op() {
        let speaker = Speaker::new(None);
        assert!(!speaker.speak("hello", "en"));
    }
}
