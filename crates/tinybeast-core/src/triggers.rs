use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use kanal::AsyncReceiver;
use tinybeast_types::TextSource;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::CoreError;
use crate::orchestrator::OrchestratorHandle;
use crate::preprocess::normalize_captured;

/// User toggles for translating captured text automatically
#[derive(Debug, Default)]
pub struct AutoTranslate {
    clipboard: AtomicBool,
    selection: AtomicBool,
}

impl AutoTranslate {
    pub fn new(clipboard: bool, selection: bool) -> Self {
        Self {
            clipboard: AtomicBool::new(clipboard),
            selection: AtomicBool::new(selection),
        }
    }

    pub fn clipboard(&self) -> bool {
        self.clipboard.load(Ordering::Relaxed)
    }

    pub fn selection(&self) -> bool {
        self.selection.load(Ordering::Relaxed)
    }

    pub fn set_clipboard(&self, enabled: bool) {
        self.clipboard.store(enabled, Ordering::Relaxed);
    }

    pub fn set_selection(&self, enabled: bool) {
        self.selection.store(enabled, Ordering::Relaxed);
    }
}

/// One-shot clipboard access, used when the window gains focus
pub trait ClipboardReader: Send + Sync {
    fn read_text(&self) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum TriggerEvent {
    FocusChanged(bool),
    TextSelected(String),
    ClipboardCopied(String),
    ManualSubmit,
    SwapLanguages,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputPort {
    Focus,
    Selection,
    Clipboard,
    Manual,
}

impl fmt::Display for InputPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputPort::Focus => f.write_str("focus"),
            InputPort::Selection => f.write_str("selection"),
            InputPort::Clipboard => f.write_str("clipboard"),
            InputPort::Manual => f.write_str("manual"),
        }
    }
}

/// A live subscription to one input source
pub struct PortHandle {
    port: InputPort,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PortHandle {
    pub fn port(&self) -> InputPort {
        self.port
    }

    pub fn is_attached(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop listening. Other ports are unaffected.
    pub async fn unsubscribe(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!("Port {} ended abnormally: {e}", self.port);
        }
    }
}

/// Turns platform input into orchestrator commands
pub struct TriggerRouter {
    orchestrator: OrchestratorHandle,
    toggles: Arc<AutoTranslate>,
    clipboard: Option<Arc<dyn ClipboardReader>>,
    last_clipboard: Mutex<Option<String>>,
}

impl TriggerRouter {
    pub fn new(
        orchestrator: OrchestratorHandle,
        toggles: Arc<AutoTranslate>,
        clipboard: Option<Arc<dyn ClipboardReader>>,
    ) -> Self {
        Self {
            orchestrator,
            toggles,
            clipboard,
            last_clipboard: Mutex::new(None),
        }
    }

    pub fn toggles(&self) -> &Arc<AutoTranslate> {
        &self.toggles
    }

    /// Listen on `rx` until unsubscribed, the parent token fires or the sender drops
    pub fn attach(
        self: &Arc<Self>,
        rx: AsyncReceiver<TriggerEvent>,
        port: InputPort,
        parent: &CancellationToken,
    ) -> PortHandle {
        let cancel = parent.child_token();
        let router = Arc::clone(self);
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            tracing::debug!("Port {port} attached");
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    event = rx.recv() => match event {
                        Ok(event) => {
                            if let Err(e) = router.handle(event).await {
                                tracing::warn!("Port {port}: {e}");
                                break;
                            }
                        }
                        Err(_) => break,
                    },
                }
            }
            tracing::debug!("Port {port} detached");
        });

        PortHandle { port, cancel, task }
    }

    pub async fn handle(&self, event: TriggerEvent) -> Result<(), CoreError> {
        match event {
            TriggerEvent::FocusChanged(true) => {
                if !self.toggles.clipboard() {
                    return Ok(());
                }
                let text = self.clipboard.as_ref().and_then(|c| c.read_text());
                match text {
                    Some(text) => self.submit_captured(TextSource::Clipboard, &text).await,
                    None => Ok(()),
                }
            }
            TriggerEvent::FocusChanged(false) => Ok(()),
            TriggerEvent::ClipboardCopied(text) => {
                if self.toggles.clipboard() {
                    self.submit_captured(TextSource::Clipboard, &text).await
                } else {
                    Ok(())
                }
            }
            TriggerEvent::TextSelected(text) => {
                if self.toggles.selection() {
                    self.submit_captured(TextSource::Selection, &text).await
                } else {
                    Ok(())
                }
            }
            TriggerEvent::ManualSubmit => self.orchestrator.submit_now().await,
            TriggerEvent::SwapLanguages => self.orchestrator.swap_languages().await,
        }
    }

    async fn submit_captured(&self, source: TextSource, raw: &str) -> Result<(), CoreError> {
        let text = normalize_captured(raw);
        if text.is_empty() {
            return Ok(());
        }

        if source == TextSource::Clipboard {
            let mut last = self
                .last_clipboard
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if last.as_deref() == Some(text.as_str()) {
                tracing::trace!("Clipboard unchanged, skipping");
                return Ok(());
            }
            *last = Some(text.clone());
        }

        tracing::info!("[{source}] captured {} chars", text.chars().count());
        self.orchestrator.set_query_text(text).await?;
        self.orchestrator.submit_now().await
    }
}
