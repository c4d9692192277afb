//! Backends whose calls block until the test releases them

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use kanal::{AsyncReceiver, AsyncSender};
use tinybeast_translator::{ProviderMetadata, TranslateError, Translator};
use tinybeast_types::{
    AggregatedTranslation, DictId, DownloadProgress, LangCode, OfflineTranslation, RenderState,
    SourceLang,
};
use tokio::sync::{oneshot, watch};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::dictionary::{DictionaryError, DictionaryInstaller, OfflineDictionary, ProgressSink};

pub const WAIT: Duration = Duration::from_secs(5);

/// Let spawned tasks run without advancing past any debounce deadline
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

pub async fn wait_render<F>(rx: &mut watch::Receiver<RenderState>, predicate: F) -> RenderState
where
    F: FnMut(&RenderState) -> bool,
{
    match timeout(WAIT, rx.wait_for(predicate)).await {
        Ok(Ok(state)) => state.clone(),
        Ok(Err(e)) => panic!("Render channel closed: {e}"),
        Err(_) => panic!("Timeout waiting for render state"),
    }
}

pub async fn next<T>(rx: &AsyncReceiver<T>) -> T {
    match timeout(WAIT, rx.recv()).await {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => panic!("Channel error: {e}"),
        Err(_) => panic!("Timeout - nothing arrived"),
    }
}

pub async fn assert_quiet<T: std::fmt::Debug>(rx: &AsyncReceiver<T>) {
    if let Ok(Ok(value)) = timeout(Duration::from_secs(2), rx.recv()).await {
        panic!("Unexpected message: {value:?}");
    }
}

pub fn translation(primary: &str) -> AggregatedTranslation {
    AggregatedTranslation {
        primary: primary.to_string(),
        provider: "Mock".to_string(),
        ..Default::default()
    }
}

pub fn entry(pos: &str) -> OfflineTranslation {
    OfflineTranslation {
        pos: pos.to_string(),
        ..Default::default()
    }
}

#[derive(Debug)]
pub struct TranslateCall {
    pub text: String,
    pub from: SourceLang,
    pub to: LangCode,
    pub reply: oneshot::Sender<Result<AggregatedTranslation, TranslateError>>,
}

pub struct GatedTranslator {
    calls: AsyncSender<TranslateCall>,
}

impl GatedTranslator {
    pub fn new() -> (Self, AsyncReceiver<TranslateCall>) {
        let (tx, rx) = kanal::unbounded_async();
        (Self { calls: tx }, rx)
    }
}

#[async_trait::async_trait]
impl Translator for GatedTranslator {
    async fn translate(
        &self,
        text: &str,
        from: &SourceLang,
        to: &LangCode,
    ) -> Result<AggregatedTranslation, TranslateError> {
        let (reply, response) = oneshot::channel();
        self.calls
            .send(TranslateCall {
                text: text.to_string(),
                from: from.clone(),
                to: to.clone(),
                reply,
            })
            .await
            .map_err(|e| TranslateError::ApiError(e.to_string()))?;
        response
            .await
            .map_err(|_| TranslateError::ApiError("call abandoned".to_string()))?
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: "Mock".to_string(),
            requires_api_key: false,
            free_tier_available: true,
        }
    }
}

#[derive(Debug)]
pub struct LookupCall {
    pub dict: DictId,
    pub text: String,
    pub reply: oneshot::Sender<Result<OfflineTranslation, DictionaryError>>,
}

pub struct GatedDictionary {
    calls: AsyncSender<LookupCall>,
}

impl GatedDictionary {
    pub fn new() -> (Self, AsyncReceiver<LookupCall>) {
        let (tx, rx) = kanal::unbounded_async();
        (Self { calls: tx }, rx)
    }
}

#[async_trait::async_trait]
impl OfflineDictionary for GatedDictionary {
    async fn lookup(&self, dict: &DictId, text: &str) -> Result<OfflineTranslation, DictionaryError> {
        let (reply, response) = oneshot::channel();
        self.calls
            .send(LookupCall {
                dict: dict.clone(),
                text: text.to_string(),
                reply,
            })
            .await
            .map_err(|e| DictionaryError::Network(e.to_string()))?;
        response
            .await
            .map_err(|_| DictionaryError::Network("call abandoned".to_string()))?
    }
}

/// Steps a test feeds into a running `acquire`
#[derive(Debug)]
pub enum Step {
    Progress(u8),
    Finish(Result<(), DictionaryError>),
    /// Finish, leaving a task behind that reports a percentage afterwards
    FinishThenReport(Result<(), DictionaryError>, u8),
}

/// Installer driven step by step from the test, one script per dictionary
#[derive(Default)]
pub struct ScriptedInstaller {
    scripts: Mutex<HashMap<DictId, AsyncReceiver<Step>>>,
    failing_removals: Mutex<HashSet<DictId>>,
    removed: Mutex<Vec<DictId>>,
}

impl ScriptedInstaller {
    pub fn script(&self, dict: &str) -> AsyncSender<Step> {
        let (tx, rx) = kanal::unbounded_async();
        self.scripts.lock().unwrap().insert(DictId::from(dict), rx);
        tx
    }

    pub fn fail_removal(&self, dict: &str) {
        self.failing_removals
            .lock()
            .unwrap()
            .insert(DictId::from(dict));
    }

    pub fn removed(&self) -> Vec<DictId> {
        self.removed.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DictionaryInstaller for ScriptedInstaller {
    async fn acquire(
        &self,
        dict: &DictId,
        progress: ProgressSink,
        cancel: CancellationToken,
    ) -> Result<(), DictionaryError> {
        let script = self.scripts.lock().unwrap().remove(dict);
        let Some(script) = script else {
            return Err(DictionaryError::Network(format!("no script for {dict}")));
        };

        loop {
            let step = tokio::select! {
                _ = cancel.cancelled() => return Err(DictionaryError::Cancelled),
                step = script.recv() => step,
            };
            match step {
                Ok(Step::Progress(percentage)) => {
                    let _ = progress
                        .send(DownloadProgress {
                            dict: dict.clone(),
                            percentage,
                        })
                        .await;
                }
                Ok(Step::Finish(result)) => return result,
                Ok(Step::FinishThenReport(result, percentage)) => {
                    let progress = progress.clone();
                    let dict = dict.clone();
                    tokio::spawn(async move {
                        settle().await;
                        let _ = progress.send(DownloadProgress { dict, percentage }).await;
                    });
                    return result;
                }
                Err(_) => return Err(DictionaryError::Network("script dropped".to_string())),
            }
        }
    }

    async fn remove(&self, dict: &DictId) -> Result<(), DictionaryError> {
        if self.failing_removals.lock().unwrap().contains(dict) {
            return Err(DictionaryError::Io(std::io::Error::other("permission denied")));
        }
        self.removed.lock().unwrap().push(dict.clone());
        Ok(())
    }
}
