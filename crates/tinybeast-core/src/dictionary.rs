use kanal::AsyncSender;
use tinybeast_types::{DictId, DownloadProgress, OfflineTranslation};
use tokio_util::sync::CancellationToken;

/// Sink the installer reports `(dict, percentage)` events into
pub type ProgressSink = AsyncSender<DownloadProgress>;

/// Lookup in an installed offline dictionary
#[async_trait::async_trait]
pub trait OfflineDictionary: Send + Sync {
    async fn lookup(&self, dict: &DictId, text: &str) -> Result<OfflineTranslation, DictionaryError>;
}

/// Acquisition and removal of offline dictionaries
#[async_trait::async_trait]
pub trait DictionaryInstaller: Send + Sync {
    /// Download and install. Reports progress 0-99 into `progress` and
    /// resolves `Err(Cancelled)` once `cancel` fires before installation starts.
    async fn acquire(
        &self,
        dict: &DictId,
        progress: ProgressSink,
        cancel: CancellationToken,
    ) -> Result<(), DictionaryError>;

    async fn remove(&self, dict: &DictId) -> Result<(), DictionaryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DictionaryError {
    #[error("Unknown dictionary: {0}")]
    UnknownDictionary(DictId),

    #[error("Dictionary {0} is not installed")]
    NotInstalled(DictId),

    #[error("not found")]
    NotFound,

    #[error("Download cancelled")]
    Cancelled,

    #[error("HTTP {0}")]
    Http(u16),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
