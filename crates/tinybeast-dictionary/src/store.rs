use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::StreamExt;
use tinybeast_config::dictionary::DictionaryConfig;
use tinybeast_core::dictionary::{
    DictionaryError, DictionaryInstaller, OfflineDictionary, ProgressSink,
};
use tinybeast_types::{DictId, DownloadProgress, OfflineTranslation};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Headword to entry map of one installed dictionary
type WordIndex = HashMap<String, OfflineTranslation>;

/// Highest percentage reported while bytes are still arriving
const DOWNLOAD_CEILING: u8 = 98;
/// Reported once the download is complete and installation starts
const PROCESSING: u8 = 99;

/// Dictionaries stored as `<data dir>/<id>.json`, fetched over HTTP
pub struct FsDictionaryStore {
    data_dir: PathBuf,
    config: DictionaryConfig,
    client: reqwest::Client,
    cache: RwLock<HashMap<DictId, Arc<WordIndex>>>,
}

impl FsDictionaryStore {
    pub fn new(data_dir: impl Into<PathBuf>, config: DictionaryConfig, client: reqwest::Client) -> Self {
        Self {
            data_dir: data_dir.into(),
            config,
            client,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Uses the configured directory, or the platform data directory
    pub fn from_config(config: &DictionaryConfig, client: reqwest::Client) -> Result<Self, DictionaryError> {
        let data_dir = match &config.data_dir {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .ok_or_else(|| {
                    DictionaryError::Io(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "no platform data directory",
                    ))
                })?
                .join("TinyBeast")
                .join("dictionaries"),
        };

        Ok(Self::new(data_dir, config.clone(), client))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_for(&self, dict: &DictId) -> PathBuf {
        self.data_dir.join(format!("{dict}.json"))
    }

    fn partial_path_for(&self, dict: &DictId) -> PathBuf {
        self.data_dir.join(format!("{dict}.json.part"))
    }

    async fn index(&self, dict: &DictId) -> Result<Arc<WordIndex>, DictionaryError> {
        if let Some(index) = self.cache.read().await.get(dict) {
            return Ok(index.clone());
        }

        let path = self.path_for(dict);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DictionaryError::NotInstalled(dict.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!("Loading dictionary {dict} from {}", path.display());
        let index = Arc::new(parse_index(bytes).await?);
        tracing::info!("Dictionary {dict} loaded with {} headwords", index.len());

        self.cache
            .write()
            .await
            .insert(dict.clone(), index.clone());
        Ok(index)
    }

    async fn report(&self, progress: &ProgressSink, dict: &DictId, percentage: u8) {
        let event = DownloadProgress {
            dict: dict.clone(),
            percentage,
        };
        if progress.send(event).await.is_err() {
            tracing::debug!("Progress receiver for {dict} dropped");
        }
    }

    /// Stream the dictionary into `part`, reporting 0-98%
    async fn fetch(
        &self,
        dict: &DictId,
        part: &Path,
        progress: &ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<(), DictionaryError> {
        let url = self.config.source_url_for(dict.as_str());
        tracing::debug!("Fetching {url}");

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DictionaryError::Cancelled),
            response = self.client.get(&url).send() => {
                response.map_err(|e| DictionaryError::Network(e.to_string()))?
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(DictionaryError::Http(status.as_u16()));
        }

        let total = response.content_length().filter(|len| *len > 0);
        let mut out = tokio::fs::File::create(part).await?;
        let mut stream = response.bytes_stream();
        let mut received: u64 = 0;
        let mut last_reported = 0u8;

        self.report(progress, dict, 0).await;

        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DictionaryError::Cancelled),
                chunk = stream.next() => chunk,
            };
            let Some(chunk) = chunk else { break };
            let chunk = chunk.map_err(|e| DictionaryError::Network(e.to_string()))?;

            out.write_all(&chunk).await?;
            received += chunk.len() as u64;

            if let Some(total) = total {
                let percentage = (received.min(total) * u64::from(DOWNLOAD_CEILING) / total) as u8;
                if percentage > last_reported {
                    last_reported = percentage;
                    self.report(progress, dict, percentage).await;
                }
            }
        }

        out.flush().await?;
        Ok(())
    }

    /// Fetch into `part`, then parse and move it into place
    async fn install(
        &self,
        dict: &DictId,
        part: &Path,
        progress: &ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<(), DictionaryError> {
        self.fetch(dict, part, progress, cancel).await?;

        // Past this point the install runs to completion
        self.report(progress, dict, PROCESSING).await;

        let bytes = tokio::fs::read(part).await?;
        let index = parse_index(bytes).await.inspect_err(|e| {
            tracing::error!("Downloaded dictionary {dict} is invalid: {e}");
        })?;

        tokio::fs::rename(part, self.path_for(dict)).await?;
        self.cache
            .write()
            .await
            .insert(dict.clone(), Arc::new(index));

        tracing::info!("Installed dictionary {dict} into {}", self.data_dir.display());
        Ok(())
    }
}

async fn discard_partial(part: &Path) {
    if let Err(e) = tokio::fs::remove_file(part).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!("Failed to remove {}: {e}", part.display());
    }
}

async fn parse_index(bytes: Vec<u8>) -> Result<WordIndex, DictionaryError> {
    tokio::task::spawn_blocking(move || serde_json::from_slice::<WordIndex>(&bytes))
        .await
        .map_err(|e| DictionaryError::Parse(e.to_string()))?
        .map_err(|e| DictionaryError::Parse(e.to_string()))
}

#[async_trait::async_trait]
impl OfflineDictionary for FsDictionaryStore {
    async fn lookup(&self, dict: &DictId, text: &str) -> Result<OfflineTranslation, DictionaryError> {
        let index = self.index(dict).await?;
        let word = text.trim();

        if let Some(entry) = index.get(word) {
            return Ok(entry.clone());
        }
        index
            .get(&word.to_lowercase())
            .cloned()
            .ok_or(DictionaryError::NotFound)
    }
}

#[async_trait::async_trait]
impl DictionaryInstaller for FsDictionaryStore {
    async fn acquire(
        &self,
        dict: &DictId,
        progress: ProgressSink,
        cancel: CancellationToken,
    ) -> Result<(), DictionaryError> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        let part = self.partial_path_for(dict);

        let result = self.install(dict, &part, &progress, &cancel).await;
        if result.is_err() {
            discard_partial(&part).await;
        }
        result
    }

    async fn remove(&self, dict: &DictId) -> Result<(), DictionaryError> {
        match tokio::fs::remove_file(self.path_for(dict)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Dictionary file for {dict} already missing");
            }
            Err(e) => return Err(e.into()),
        }

        self.cache.write().await.remove(dict);
        Ok(())
    }
}
