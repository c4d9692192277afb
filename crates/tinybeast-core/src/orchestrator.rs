use std::sync::Arc;
use std::time::Duration;

use kanal::{AsyncReceiver, AsyncSender};
use tinybeast_translator::Translator;
use tinybeast_types::{DictId, LangCode, Mode, RenderState, SourceLang, TranslationOutput};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::debounce::Debouncer;
use crate::dictionary::OfflineDictionary;
use crate::error::CoreError;
use crate::language::{query_language, swap_pair};
use crate::preprocess::truncate_query;
use crate::registry::SharedRegistry;
use crate::speaker::{SpeechBackend, Speaker};

/// Collaborators the orchestrator talks to
#[derive(Clone)]
pub struct Backends {
    pub online: Arc<dyn Translator>,
    pub offline: Arc<dyn OfflineDictionary>,
    pub speech: Option<Arc<dyn SpeechBackend>>,
}

/// Live query parameters, mutated only through [`Command`]s
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryContext {
    pub text: String,
    pub mode: Mode,
    pub source: SourceLang,
    pub target: LangCode,
    pub offline_dict: Option<DictId>,
}

impl QueryContext {
    pub fn new(mode: Mode, source: SourceLang, target: LangCode, offline_dict: Option<DictId>) -> Self {
        Self {
            text: String::new(),
            mode,
            source,
            target,
            offline_dict,
        }
    }
}

/// Snapshot of the context a backend call was issued with.
///
/// A response is applied only while its marker still equals the live context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlightMarker {
    seq: u64,
    snapshot: QueryContext,
}

impl InFlightMarker {
    fn capture(seq: u64, ctx: &QueryContext) -> Self {
        Self {
            seq,
            snapshot: ctx.clone(),
        }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn is_current(&self, ctx: &QueryContext) -> bool {
        &self.snapshot == ctx
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetQueryText(String),
    SetLanguagePair { from: SourceLang, to: LangCode },
    SetMode { mode: Mode, dict: Option<DictId> },
    SwapLanguages,
    SubmitNow,
    Clear,
    SpeakQuery,
    SpeakTranslation,
    /// Re-read the registry after dictionaries were installed or removed
    SyncDictionary,
}

/// Messages the orchestrator sends to itself
#[derive(Debug)]
enum Inbox {
    DebounceElapsed(u64),
    Resolved {
        marker: InFlightMarker,
        output: TranslationOutput,
    },
}

/// Cloneable front of a running [`RequestOrchestrator`]
#[derive(Clone)]
pub struct OrchestratorHandle {
    tx: AsyncSender<Command>,
    render_rx: watch::Receiver<RenderState>,
}

impl OrchestratorHandle {
    pub(crate) fn from_parts(tx: AsyncSender<Command>, render_rx: watch::Receiver<RenderState>) -> Self {
        Self { tx, render_rx }
    }

    pub async fn send(&self, command: Command) -> Result<(), CoreError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| CoreError::ChannelClosed)
    }

    pub async fn set_query_text(&self, text: impl Into<String>) -> Result<(), CoreError> {
        self.send(Command::SetQueryText(text.into())).await
    }

    pub async fn set_language_pair(&self, from: SourceLang, to: LangCode) -> Result<(), CoreError> {
        self.send(Command::SetLanguagePair { from, to }).await
    }

    pub async fn set_mode(&self, mode: Mode, dict: Option<DictId>) -> Result<(), CoreError> {
        self.send(Command::SetMode { mode, dict }).await
    }

    pub async fn swap_languages(&self) -> Result<(), CoreError> {
        self.send(Command::SwapLanguages).await
    }

    pub async fn submit_now(&self) -> Result<(), CoreError> {
        self.send(Command::SubmitNow).await
    }

    pub async fn clear(&self) -> Result<(), CoreError> {
        self.send(Command::Clear).await
    }

    pub async fn speak_query(&self) -> Result<(), CoreError> {
        self.send(Command::SpeakQuery).await
    }

    pub async fn speak_translation(&self) -> Result<(), CoreError> {
        self.send(Command::SpeakTranslation).await
    }

    pub async fn sync_dictionary(&self) -> Result<(), CoreError> {
        self.send(Command::SyncDictionary).await
    }

    /// Stream of `{ result, is_loading }` snapshots
    pub fn subscribe(&self) -> watch::Receiver<RenderState> {
        self.render_rx.clone()
    }

    pub fn render_state(&self) -> RenderState {
        self.render_rx.borrow().clone()
    }
}

/// Owns the query context and turns input changes into backend calls,
/// applying at most the responses that still match the live context.
pub struct RequestOrchestrator {
    ctx: QueryContext,
    registry: SharedRegistry,
    backends: Backends,
    speaker: Speaker,
    debouncer: Debouncer,
    commands_rx: AsyncReceiver<Command>,
    inbox_tx: AsyncSender<Inbox>,
    inbox_rx: AsyncReceiver<Inbox>,
    render_tx: watch::Sender<RenderState>,
    result: Option<TranslationOutput>,
    is_loading: bool,
    next_seq: u64,
}

impl RequestOrchestrator {
    pub fn new(
        ctx: QueryContext,
        debounce: Duration,
        registry: SharedRegistry,
        backends: Backends,
    ) -> (Self, OrchestratorHandle) {
        let (commands_tx, commands_rx) = kanal::bounded_async(64);
        // Unbounded so spawned backend calls never wait on the loop
        let (inbox_tx, inbox_rx) = kanal::unbounded_async();
        let (render_tx, render_rx) = watch::channel(RenderState::default());

        let orchestrator = Self {
            ctx,
            registry,
            speaker: Speaker::new(backends.speech.clone()),
            backends,
            debouncer: Debouncer::new(debounce),
            commands_rx,
            inbox_tx,
            inbox_rx,
            render_tx,
            result: None,
            is_loading: false,
            next_seq: 0,
        };
        orchestrator.publish();

        let handle = OrchestratorHandle::from_parts(commands_tx, render_rx);
        (orchestrator, handle)
    }

    /// Process commands and backend responses until cancelled or all handles drop
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), CoreError> {
        tracing::info!("Orchestrator started in {} mode", self.ctx.mode);

        let commands_rx = self.commands_rx.clone();
        let inbox_rx = self.inbox_rx.clone();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Orchestrator stopping");
                    break;
                }
                command = commands_rx.recv() => match command {
                    Ok(command) => self.handle_command(command).await,
                    Err(_) => {
                        tracing::debug!("All orchestrator handles dropped");
                        break;
                    }
                },
                message = inbox_rx.recv() => match message {
                    Ok(message) => self.handle_inbox(message).await,
                    Err(_) => break,
                },
            }
        }

        self.debouncer.cancel();
        Ok(())
    }

    async fn handle_command(&mut self, command: Command) {
        tracing::debug!("Command: {:?}", command);
        match command {
            Command::SetQueryText(text) => self.set_query_text(text),
            Command::SetLanguagePair { from, to } => self.set_language_pair(from, to).await,
            Command::SetMode { mode, dict } => self.set_mode(mode, dict),
            Command::SwapLanguages => self.swap_languages().await,
            Command::SubmitNow => self.dispatch().await,
            Command::Clear => self.clear(),
            Command::SpeakQuery => self.speak_query().await,
            Command::SpeakTranslation => self.speak_translation(),
            Command::SyncDictionary => self.sync_dictionary().await,
        }
    }

    async fn handle_inbox(&mut self, message: Inbox) {
        match message {
            Inbox::DebounceElapsed(generation) => {
                if self.debouncer.take(generation) {
                    self.dispatch().await;
                } else {
                    tracing::debug!("Ignoring superseded debounce #{generation}");
                }
            }
            Inbox::Resolved { marker, output } => self.apply_response(marker, output),
        }
    }

    fn set_query_text(&mut self, text: String) {
        let text = truncate_query(&text);
        if text == self.ctx.text {
            return;
        }
        self.ctx.text = text;

        if self.ctx.text.trim().is_empty() {
            self.debouncer.cancel();
            self.result = None;
            self.is_loading = false;
        } else {
            self.debouncer
                .schedule(&self.inbox_tx, Inbox::DebounceElapsed);
        }

        self.publish();
    }

    async fn set_language_pair(&mut self, from: SourceLang, to: LangCode) {
        if from == self.ctx.source && to == self.ctx.target {
            return;
        }
        tracing::info!("Language pair {from} -> {to}");
        self.ctx.source = from;
        self.ctx.target = to;
        self.dispatch().await;
    }

    fn set_mode(&mut self, mode: Mode, dict: Option<DictId>) {
        let dict_changed =
            mode == Mode::Offline && dict.is_some() && dict != self.ctx.offline_dict;
        if mode == self.ctx.mode && !dict_changed {
            return;
        }

        tracing::info!("Switching to {mode} mode");
        self.ctx.mode = mode;
        if mode == Mode::Offline && dict.is_some() {
            self.ctx.offline_dict = dict;
        }

        // The previous query is not re-run under the new mode
        self.clear();
    }

    async fn sync_dictionary(&mut self) {
        let next = {
            let registry = self.registry.read().await;
            match &self.ctx.offline_dict {
                Some(id) if registry.is_installed(id) => return,
                _ => registry.selected().cloned(),
            }
        };
        if next == self.ctx.offline_dict {
            return;
        }

        match (&self.ctx.offline_dict, &next) {
            (Some(gone), Some(id)) => tracing::info!("Dictionary {gone} is gone, now using {id}"),
            (Some(gone), None) => tracing::info!("Dictionary {gone} is gone, none left"),
            (None, Some(id)) => tracing::info!("Using dictionary {id}"),
            (None, None) => {}
        }
        let removed = self.ctx.offline_dict.is_some();
        self.ctx.offline_dict = next;

        if self.ctx.mode == Mode::Offline && removed {
            // Results from the removed dictionary must not stay on screen
            self.clear();
        } else if self.is_loading {
            // The pending response carries the old dictionary in its marker
            self.dispatch().await;
        } else {
            self.publish();
        }
    }

    async fn swap_languages(&mut self) {
        if self.ctx.mode == Mode::Offline {
            tracing::debug!("Language swap ignored in offline mode");
            return;
        }

        let (from, to) = swap_pair(&self.ctx.source, &self.ctx.target);
        tracing::info!("Swapped languages to {from} -> {to}");
        self.ctx.source = from;
        self.ctx.target = to;

        // The translation becomes the new query
        if let Some(translated) = self.result.as_ref().and_then(|r| r.primary_text()) {
            self.ctx.text = truncate_query(translated);
        }

        self.dispatch().await;
    }

    fn clear(&mut self) {
        self.debouncer.cancel();
        self.ctx.text.clear();
        self.result = None;
        self.is_loading = false;
        self.publish();
    }

    async fn dispatch(&mut self) {
        self.debouncer.cancel();

        let text = self.ctx.text.trim().to_string();
        if text.is_empty() {
            self.result = None;
            self.is_loading = false;
            self.publish();
            return;
        }

        self.next_seq += 1;
        let seq = self.next_seq;

        match self.ctx.mode {
            Mode::Online => self.dispatch_online(seq, text),
            Mode::Offline => self.dispatch_offline(seq, text).await,
        }
    }

    fn dispatch_online(&mut self, seq: u64, text: String) {
        let marker = InFlightMarker::capture(seq, &self.ctx);
        self.is_loading = true;
        self.publish();

        let from = self.ctx.source.clone();
        let to = self.ctx.target.clone();
        tracing::info!("[DISPATCH #{seq}] online {from} -> {to}: {} chars", text.len());

        let online = self.backends.online.clone();
        let inbox = self.inbox_tx.clone();
        tokio::spawn(async move {
            let output = match online.translate(&text, &from, &to).await {
                Ok(translation) => TranslationOutput::Online(translation),
                Err(e) => {
                    tracing::warn!("[DISPATCH #{seq}] online translation failed: {e}");
                    TranslationOutput::Error(e.to_string())
                }
            };
            if inbox.send(Inbox::Resolved { marker, output }).await.is_err() {
                tracing::debug!("[DISPATCH #{seq}] orchestrator gone, response dropped");
            }
        });
    }

    async fn dispatch_offline(&mut self, seq: u64, text: String) {
        let resolved = {
            let mut registry = self.registry.write().await;
            let dict = match &self.ctx.offline_dict {
                Some(id) if registry.is_installed(id) => Some(id.clone()),
                _ => registry.selected().cloned(),
            };
            dict.map(|dict| {
                let first_use = registry.mark_bootstrapped(&dict);
                (dict, first_use)
            })
        };

        let Some((dict, first_use)) = resolved else {
            tracing::warn!("[DISPATCH #{seq}] no offline dictionary available");
            self.ctx.offline_dict = None;
            self.result = Some(TranslationOutput::Error(
                "No offline dictionary selected".to_string(),
            ));
            self.is_loading = false;
            self.publish();
            return;
        };

        self.ctx.offline_dict = Some(dict.clone());
        let marker = InFlightMarker::capture(seq, &self.ctx);
        self.is_loading = true;
        if first_use {
            tracing::info!("[DISPATCH #{seq}] first use of dictionary {dict}");
            self.result = Some(TranslationOutput::Initializing);
        }
        self.publish();

        tracing::info!("[DISPATCH #{seq}] offline {dict}: {} chars", text.len());

        let offline = self.backends.offline.clone();
        let inbox = self.inbox_tx.clone();
        tokio::spawn(async move {
            let output = match offline.lookup(&dict, &text).await {
                Ok(entry) => TranslationOutput::Offline(entry),
                Err(e) => {
                    tracing::warn!("[DISPATCH #{seq}] offline lookup in {dict} failed: {e}");
                    TranslationOutput::Error(e.to_string())
                }
            };
            if inbox.send(Inbox::Resolved { marker, output }).await.is_err() {
                tracing::debug!("[DISPATCH #{seq}] orchestrator gone, response dropped");
            }
        });
    }

    fn apply_response(&mut self, marker: InFlightMarker, output: TranslationOutput) {
        if !marker.is_current(&self.ctx) {
            tracing::debug!("[DISPATCH #{}] stale response dropped", marker.seq());
            return;
        }

        tracing::debug!("[DISPATCH #{}] response applied", marker.seq());
        self.result = Some(output);
        self.is_loading = false;
        self.publish();
    }

    async fn speak_query(&self) {
        let dict = match self.ctx.mode {
            Mode::Online => None,
            Mode::Offline => match &self.ctx.offline_dict {
                Some(id) => Some(id.clone()),
                None => self.registry.read().await.selected().cloned(),
            },
        };
        let lang = query_language(
            self.ctx.mode,
            &self.ctx.source,
            dict.as_ref().map(|d| d.as_str()),
        );
        self.speaker.speak(&self.ctx.text, lang);
    }

    fn speak_translation(&self) {
        if self.ctx.mode == Mode::Offline {
            tracing::debug!("Speaking translations is unavailable offline");
            return;
        }
        if let Some(text) = self.result.as_ref().and_then(|r| r.primary_text()) {
            self.speaker.speak(text, &self.ctx.target);
        }
    }

    fn publish(&self) {
        self.render_tx.send_replace(RenderState {
            query: self.ctx.text.clone(),
            result: self.result.clone(),
            is_loading: self.is_loading,
            mode: self.ctx.mode,
            from: self.ctx.source.clone(),
            to: self.ctx.target.clone(),
            offline_dict: self.ctx.offline_dict.clone(),
        });
    }
}
