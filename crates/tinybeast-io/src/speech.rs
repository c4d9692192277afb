use std::sync::Arc;

use tinybeast_core::speaker::{SpeechBackend, SpeechError};

/// Longest text the TTS endpoint accepts in one request
const MAX_CHARS_PER_REQUEST: usize = 200;

/// Blocking playback of one MP3 clip
pub trait AudioOutput: Send + Sync {
    fn play(&self, clip: Vec<u8>) -> Result<(), SpeechError>;
}

/// Google Translate text-to-speech, played through an [`AudioOutput`]
pub struct GttsSpeech {
    client: reqwest::Client,
    tts_url: String,
    output: Arc<dyn AudioOutput>,
}

impl GttsSpeech {
    pub fn new(client: reqwest::Client, tts_url: String, output: Arc<dyn AudioOutput>) -> Self {
        Self {
            client,
            tts_url,
            output,
        }
    }

    async fn fetch(&self, text: &str, lang: &str, idx: usize, total: usize) -> Result<Vec<u8>, SpeechError> {
        let textlen = text.chars().count().to_string();
        let idx = idx.to_string();
        let total = total.to_string();

        let response = self
            .client
            .get(&self.tts_url)
            .query(&[
                ("ie", "UTF-8"),
                ("q", text),
                ("tl", lang),
                ("total", total.as_str()),
                ("idx", idx.as_str()),
                ("textlen", textlen.as_str()),
                ("client", "tw-ob"),
            ])
            .send()
            .await
            .map_err(|e| SpeechError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SpeechError(format!("TTS request failed with HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SpeechError(e.to_string()))?;

        // Rate limiting comes back as an HTML page
        if bytes.is_empty() || bytes.starts_with(b"<html") || bytes.starts_with(b"<!DOCTYPE") {
            return Err(SpeechError("TTS service returned no audio".to_string()));
        }

        Ok(bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl SpeechBackend for GttsSpeech {
    async fn speak(&self, text: &str, lang: &str) -> Result<(), SpeechError> {
        let lang = if lang == "auto" { "en" } else { lang };
        let chunks = split_text(text, MAX_CHARS_PER_REQUEST);
        tracing::debug!("Speaking {} chars in {lang} as {} clip(s)", text.len(), chunks.len());

        // Fetch everything first so playback has no gaps
        let mut clips = Vec::with_capacity(chunks.len());
        for (idx, chunk) in chunks.iter().enumerate() {
            clips.push(self.fetch(chunk, lang, idx, chunks.len()).await?);
        }

        let output = self.output.clone();
        tokio::task::spawn_blocking(move || clips.into_iter().try_for_each(|clip| output.play(clip)))
            .await
            .map_err(|e| SpeechError(e.to_string()))?
    }
}

/// Split on whitespace into pieces of at most `max` chars. A single word
/// longer than `max` is cut.
fn split_text(text: &str, max: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word;
        while word.chars().count() > max {
            let cut = word.char_indices().nth(max).map_or(word.len(), |(i, _)| i);
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            chunks.push(word[..cut].to_string());
            word = &word[cut..];
        }

        let needed = current.chars().count() + word.chars().count() + usize::from(!current.is_empty());
        if needed > max && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(feature = "audio")]
pub use self::rodio_output::RodioOutput;

#[cfg(feature = "audio")]
mod rodio_output {
    use std::io::Cursor;

    use tinybeast_core::speaker::SpeechError;

    use super::AudioOutput;

    /// Default output device via rodio
    pub struct RodioOutput {
        volume: f32,
    }

    impl RodioOutput {
        pub fn new(volume: f32) -> Self {
            Self {
                volume: volume.clamp(0.0, 1.0),
            }
        }
    }

    impl AudioOutput for RodioOutput {
        fn play(&self, clip: Vec<u8>) -> Result<(), SpeechError> {
            let (_stream, handle) =
                rodio::OutputStream::try_default().map_err(|e| SpeechError(e.to_string()))?;
            let sink = rodio::Sink::try_new(&handle).map_err(|e| SpeechError(e.to_string()))?;
            let source = rodio::Decoder::new(Cursor::new(clip)).map_err(|e| SpeechError(e.to_string()))?;

            sink.set_volume(self.volume);
            sink.append(source);
            sink.sleep_until_end();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    use super::*;

    #[derive(Default)]
    struct RecordingOutput {
        clips: Mutex<Vec<Vec<u8>>>,
    }

    impl AudioOutput for RecordingOutput {
        fn play(&self, clip: Vec<u8>) -> Result<(), SpeechError> {
            self.clips.lock().unwrap().push(clip);
            Ok(())
        }
    }

    /// Answer one request with `body`, handing the request line back
    async fn serve_once(body: &'static [u8]) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (line_tx, line_rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    return;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let request = String::from_utf8_lossy(&request).into_owned();
            let line = request.lines().next().unwrap_or_default().to_string();
            let _ = line_tx.send(line);

            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: audio/mpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
            socket.flush().await.unwrap();
        });

        (format!("http://{addr}/translate_tts"), line_rx)
    }

    fn speech(url: String, output: Arc<RecordingOutput>) -> GttsSpeech {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        GttsSpeech::new(client, url, output)
    }

    #[tokio::test]
    async fn test_speak_fetches_and_plays_clip() {
        let (url, request) = serve_once(b"ID3\x04\x00fake-mp3").await;
        let output = Arc::new(RecordingOutput::default());

        speech(url, output.clone()).speak("bonjour", "fr").await.unwrap();

        let line = request.await.unwrap();
        assert!(line.starts_with("GET /translate_tts?"));
        assert!(line.contains("q=bonjour"));
        assert!(line.contains("tl=fr"));
        assert!(line.contains("client=tw-ob"));
        assert_eq!(output.clips.lock().unwrap().as_slice(), &[b"ID3\x04\x00fake-mp3".to_vec()]);
    }

    #[tokio::test]
    async fn test_auto_language_is_spoken_as_english() {
        let (url, request) = serve_once(b"ID3").await;
        let output = Arc::new(RecordingOutput::default());

        speech(url, output).speak("hello", "auto").await.unwrap();
        assert!(request.await.unwrap().contains("tl=en"));
    }

    #[tokio::test]
    async fn test_html_reply_is_an_error() {
        let (url, _request) = serve_once(b"<html><body>Too many requests</body></html>").await;
        let output = Arc::new(RecordingOutput::default());

        let err = speech(url, output.clone()).speak("hello", "en").await.unwrap_err();
        assert!(err.to_string().contains("no audio"));
        assert!(output.clips.lock().unwrap().is_empty());
    }

    #[test]
    fn test_split_text_respects_limit() {
        assert_eq!(split_text("  one two  ", 200), vec!["one two"]);
        assert!(split_text("   ", 200).is_empty());

        let text = "word ".repeat(90);
        let chunks = split_text(&text, 200);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 200));
        assert_eq!(chunks.join(" "), text.trim());

        assert_eq!(split_text("abcdef gh", 4), vec!["abcd", "ef", "gh"]);
    }
}
