use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use kanal::AsyncSender;
use tinybeast_types::{DictId, DownloadProgress};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::dictionary::{DictionaryError, DictionaryInstaller};
use crate::error::LifecycleError;
use crate::registry::{DictStatus, SharedRegistry};

/// Percentage at which a download is considered to be installing
const PROCESSING_THRESHOLD: u8 = 99;

/// Notifications for the presentation and persistence layers
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    StatusChanged {
        dict: DictId,
        status: DictStatus,
    },
    /// Downloaded set or selection changed and should be persisted
    DownloadedSetChanged {
        downloaded: Vec<DictId>,
        selected: Option<DictId>,
    },
    CancelRequested(DictId),
    DownloadFailed {
        dict: DictId,
        cancelled: bool,
        message: String,
    },
    DeleteFailed {
        dict: DictId,
        message: String,
    },
}

struct Inner {
    registry: SharedRegistry,
    installer: Arc<dyn DictionaryInstaller>,
    events_tx: AsyncSender<LifecycleEvent>,
    downloads: Mutex<HashMap<DictId, CancellationToken>>,
    removals: Mutex<HashSet<DictId>>,
}

/// Drives each dictionary through
/// `NotDownloaded -> Downloading -> Processing -> Installed -> NotDownloaded`.
///
/// Every operation is independent per dictionary. State only moves on
/// backend acknowledgement.
#[derive(Clone)]
pub struct DictionaryLifecycleManager {
    inner: Arc<Inner>,
}

impl DictionaryLifecycleManager {
    pub fn new(
        registry: SharedRegistry,
        installer: Arc<dyn DictionaryInstaller>,
        events_tx: AsyncSender<LifecycleEvent>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                installer,
                events_tx,
                downloads: Mutex::new(HashMap::new()),
                removals: Mutex::new(HashSet::new()),
            }),
        }
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.inner.registry
    }

    pub async fn download(&self, dict: &DictId) -> Result<JoinHandle<()>, LifecycleError> {
        {
            let mut registry = self.inner.registry.write().await;
            match registry.status(dict) {
                None => return Err(LifecycleError::UnknownDictionary(dict.clone())),
                Some(DictStatus::NotDownloaded) => {}
                Some(_) => return Err(LifecycleError::Busy(dict.clone())),
            }
            registry.set_status(dict, DictStatus::Downloading(None));
        }

        let cancel = CancellationToken::new();
        self.downloads().insert(dict.clone(), cancel.clone());

        tracing::info!("Downloading dictionary {dict}");
        self.emit(LifecycleEvent::StatusChanged {
            dict: dict.clone(),
            status: DictStatus::Downloading(None),
        })
        .await;

        let manager = self.clone();
        let dict = dict.clone();
        let handle = tokio::spawn(async move {
            let result = manager.run_attempt(&dict, cancel).await;
            manager.finish_download(&dict, result).await;
        });

        Ok(handle)
    }

    /// Run one acquisition with a progress channel of its own. Every report
    /// the installer queued is applied before this returns, and the channel
    /// is gone afterwards, so nothing from this attempt reaches a later one.
    async fn run_attempt(
        &self,
        dict: &DictId,
        cancel: CancellationToken,
    ) -> Result<(), DictionaryError> {
        let (progress_tx, progress_rx) = kanal::unbounded_async();
        let mut acquire = self.inner.installer.acquire(dict, progress_tx, cancel);

        let result = loop {
            tokio::select! {
                biased;
                Ok(progress) = progress_rx.recv() => self.forward_progress(dict, progress).await,
                result = &mut acquire => break result,
            }
        };

        while let Ok(Some(progress)) = progress_rx.try_recv() {
            self.forward_progress(dict, progress).await;
        }
        result
    }

    async fn forward_progress(&self, dict: &DictId, progress: DownloadProgress) {
        if &progress.dict != dict {
            tracing::warn!("Dropping progress for {} reported by the {dict} download", progress.dict);
            return;
        }
        self.apply_progress(progress).await;
    }

    async fn finish_download(&self, dict: &DictId, result: Result<(), DictionaryError>) {
        self.downloads().remove(dict);

        match result {
            Ok(()) => {
                let (selection_changed, downloaded, selected) = {
                    let mut registry = self.inner.registry.write().await;
                    let changed = registry.install(dict);
                    (
                        changed,
                        registry.downloaded().to_vec(),
                        registry.selected().cloned(),
                    )
                };

                tracing::info!("Dictionary {dict} installed");
                if selection_changed {
                    tracing::info!("Selected {dict} as the offline dictionary");
                }

                self.emit(LifecycleEvent::StatusChanged {
                    dict: dict.clone(),
                    status: DictStatus::Installed,
                })
                .await;
                self.emit(LifecycleEvent::DownloadedSetChanged { downloaded, selected })
                    .await;
            }
            Err(e) => {
                let cancelled = matches!(e, DictionaryError::Cancelled);
                if cancelled {
                    tracing::info!("Download of {dict} cancelled");
                } else {
                    tracing::error!("Download of {dict} failed: {e}");
                }

                self.inner
                    .registry
                    .write()
                    .await
                    .set_status(dict, DictStatus::NotDownloaded);

                self.emit(LifecycleEvent::StatusChanged {
                    dict: dict.clone(),
                    status: DictStatus::NotDownloaded,
                })
                .await;
                self.emit(LifecycleEvent::DownloadFailed {
                    dict: dict.clone(),
                    cancelled,
                    message: e.to_string(),
                })
                .await;
            }
        }
    }

    /// Apply a progress report. Only downloads in flight are affected.
    pub async fn apply_progress(&self, progress: DownloadProgress) {
        let DownloadProgress { dict, percentage } = progress;

        let status = {
            let mut registry = self.inner.registry.write().await;
            let next = match registry.status(&dict) {
                Some(DictStatus::Downloading(current)) => {
                    if percentage >= PROCESSING_THRESHOLD {
                        DictStatus::Processing
                    } else if current == Some(percentage) {
                        return;
                    } else {
                        DictStatus::Downloading(Some(percentage))
                    }
                }
                Some(DictStatus::Processing) => return,
                other => {
                    tracing::debug!("Ignoring progress {percentage}% for {dict} in state {other:?}");
                    return;
                }
            };
            registry.set_status(&dict, next);
            next
        };

        if status == DictStatus::Processing {
            tracing::info!("Installing dictionary {dict}");
        }
        self.emit(LifecycleEvent::StatusChanged { dict, status }).await;
    }

    /// Request cancellation. The status flips back once the installer acknowledges.
    pub async fn cancel(&self, dict: &DictId) -> Result<(), LifecycleError> {
        let status = self.inner.registry.read().await.status(dict);
        match status {
            None => Err(LifecycleError::UnknownDictionary(dict.clone())),
            Some(DictStatus::Downloading(_)) => {
                let token = self.downloads().get(dict).cloned();
                match token {
                    Some(token) => {
                        tracing::info!("Cancelling download of {dict}");
                        token.cancel();
                        self.emit(LifecycleEvent::CancelRequested(dict.clone())).await;
                        Ok(())
                    }
                    None => Err(LifecycleError::NotDownloading(dict.clone())),
                }
            }
            Some(DictStatus::Processing) => Err(LifecycleError::NotCancelable(dict.clone())),
            Some(_) => Err(LifecycleError::NotDownloading(dict.clone())),
        }
    }

    /// Remove an installed dictionary. Nothing changes unless the backend succeeds.
    pub async fn delete(&self, dict: &DictId) -> Result<(), LifecycleError> {
        match self.inner.registry.read().await.status(dict) {
            None => return Err(LifecycleError::UnknownDictionary(dict.clone())),
            Some(DictStatus::Installed) => {}
            Some(_) => return Err(LifecycleError::NotInstalled(dict.clone())),
        }

        if !self.removals().insert(dict.clone()) {
            return Err(LifecycleError::Busy(dict.clone()));
        }

        tracing::info!("Deleting dictionary {dict}");
        let result = self.inner.installer.remove(dict).await;
        self.removals().remove(dict);

        match result {
            Ok(()) => {
                let (selection_changed, downloaded, selected) = {
                    let mut registry = self.inner.registry.write().await;
                    let changed = registry.uninstall(dict);
                    (
                        changed,
                        registry.downloaded().to_vec(),
                        registry.selected().cloned(),
                    )
                };

                if selection_changed {
                    match &selected {
                        Some(next) => tracing::info!("Selection moved from {dict} to {next}"),
                        None => tracing::info!("No offline dictionary left after deleting {dict}"),
                    }
                }

                self.emit(LifecycleEvent::StatusChanged {
                    dict: dict.clone(),
                    status: DictStatus::NotDownloaded,
                })
                .await;
                self.emit(LifecycleEvent::DownloadedSetChanged { downloaded, selected })
                    .await;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to delete {dict}: {e}");
                let message = e.to_string();
                self.emit(LifecycleEvent::DeleteFailed {
                    dict: dict.clone(),
                    message: message.clone(),
                })
                .await;
                Err(LifecycleError::Backend {
                    dict: dict.clone(),
                    message,
                })
            }
        }
    }

    /// Make an installed dictionary the offline selection
    pub async fn select(&self, dict: &DictId) -> Result<(), LifecycleError> {
        let (downloaded, selected) = {
            let mut registry = self.inner.registry.write().await;
            if !registry.contains(dict) {
                return Err(LifecycleError::UnknownDictionary(dict.clone()));
            }
            if !registry.select(dict) {
                return Err(LifecycleError::NotInstalled(dict.clone()));
            }
            (registry.downloaded().to_vec(), registry.selected().cloned())
        };

        tracing::info!("Selected dictionary {dict}");
        self.emit(LifecycleEvent::DownloadedSetChanged { downloaded, selected })
            .await;
        Ok(())
    }

    async fn emit(&self, event: LifecycleEvent) {
        if self.inner.events_tx.send(event).await.is_err() {
            tracing::debug!("No listener for lifecycle events");
        }
    }

    fn downloads(&self) -> std::sync::MutexGuard<'_, HashMap<DictId, CancellationToken>> {
        self.inner
            .downloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn removals(&self) -> std::sync::MutexGuard<'_, HashSet<DictId>> {
        self.inner
            .removals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
