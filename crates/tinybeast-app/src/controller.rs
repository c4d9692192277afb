use std::sync::Arc;
use std::time::Duration;

use kanal::{AsyncReceiver, AsyncSender};
use tinybeast_core::orchestrator::QueryContext;
use tinybeast_core::triggers::{InputPort, PortHandle, TriggerEvent, TriggerRouter};
use tinybeast_core::{
    Backends, DictionaryLifecycleManager, LifecycleEvent, OrchestratorHandle, RequestOrchestrator,
};
use tinybeast_dictionary::FsDictionaryStore;
use tinybeast_io::clipboard::SystemClipboard;
use tinybeast_translator::Translator;
use tinybeast_types::AppEvent;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::backends::{build_speech, build_translator};
use crate::console::{input_loop, render_loop};
use crate::events::{PortSenders, Routes, event_loop, lifecycle_loop};
use crate::io::watcher_io;
use crate::state::AppState;

/// Centralized channel management
pub struct ChannelSet {
    pub app_events: (AsyncSender<AppEvent>, AsyncReceiver<AppEvent>),
    pub lifecycle: (AsyncSender<LifecycleEvent>, AsyncReceiver<LifecycleEvent>),
}

impl ChannelSet {
    pub fn new() -> Self {
        Self {
            app_events: kanal::bounded_async(64),
            lifecycle: kanal::unbounded_async(),
        }
    }
}

/// Application controller for task spawning and lifecycle
pub struct AppController {
    channels: ChannelSet,
    state: Arc<AppState>,
    cancel_token: CancellationToken,
    ports: Vec<PortHandle>,
    orchestrator: Option<OrchestratorHandle>,
}

impl AppController {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            channels: ChannelSet::new(),
            state,
            cancel_token: CancellationToken::new(),
            ports: Vec::new(),
            orchestrator: None,
        }
    }

    pub async fn spawn_tasks(&mut self) -> anyhow::Result<JoinSet<anyhow::Result<()>>> {
        let config = self.state.config.read().await.clone();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.network.timeout_seconds))
            .user_agent(config.network.user_agent.clone())
            .build()?;

        let translator = build_translator(&config.translator, &client)?;
        tracing::info!("Online providers: {}", translator.metadata().name);
        let speech = build_speech(&config.speech, &client);
        let store = Arc::new(FsDictionaryStore::from_config(&config.dictionary, client)?);
        tracing::info!("Dictionary directory: {}", store.data_dir().display());

        let mut tasks = JoinSet::new();

        // Dictionary lifecycle
        let lifecycle = DictionaryLifecycleManager::new(
            self.state.registry.clone(),
            store.clone(),
            self.channels.lifecycle.0.clone(),
        );

        // Orchestrator
        let ctx = {
            let settings = self.state.settings.read().await;
            QueryContext::new(
                settings.mode,
                settings.from.clone(),
                settings.to.clone(),
                self.state.registry.read().await.selected().cloned(),
            )
        };
        let backends = Backends {
            online: Arc::new(translator),
            offline: store,
            speech: speech.clone(),
        };
        let (orchestrator, handle) = RequestOrchestrator::new(
            ctx,
            Duration::from_millis(config.ui.debounce_ms),
            self.state.registry.clone(),
            backends,
        );
        let orchestrator_cancel = self.cancel_token.child_token();
        tasks.spawn(async move { Ok(orchestrator.run(orchestrator_cancel).await?) });
        self.orchestrator = Some(handle.clone());
        tasks.spawn(lifecycle_loop(
            self.state.clone(),
            self.channels.lifecycle.1.clone(),
            handle.clone(),
            self.cancel_token.child_token(),
        ));

        // Trigger ports
        let router = Arc::new(TriggerRouter::new(
            handle.clone(),
            self.state.toggles.clone(),
            Some(Arc::new(SystemClipboard)),
        ));
        let ports = PortSenders {
            focus: self.attach(&router, InputPort::Focus),
            selection: self.attach(&router, InputPort::Selection),
            clipboard: self.attach(&router, InputPort::Clipboard),
            manual: self.attach(&router, InputPort::Manual),
        };

        // Watcher IO
        tasks.spawn(watcher_io(
            self.state.clone(),
            self.cancel_token.child_token(),
            ports.clipboard.clone(),
        ));

        // Event loop
        let routes = Routes {
            orchestrator: handle.clone(),
            lifecycle,
            ports,
            speech_enabled: speech.is_some(),
        };
        tasks.spawn(event_loop(
            self.state.clone(),
            self.channels.app_events.1.clone(),
            routes,
            self.cancel_token.child_token(),
        ));

        // Console
        tasks.spawn(input_loop(
            self.channels.app_events.0.clone(),
            self.cancel_token.child_token(),
        ));
        tasks.spawn(render_loop(handle.subscribe(), self.cancel_token.child_token()));

        Ok(tasks)
    }

    fn attach(&mut self, router: &Arc<TriggerRouter>, port: InputPort) -> AsyncSender<TriggerEvent> {
        let (tx, rx) = kanal::bounded_async(16);
        self.ports.push(router.attach(rx, port, &self.cancel_token));
        tx
    }

    /// Stop every task, wait up to `grace` for them, then save the profile
    pub async fn shutdown(
        self,
        mut tasks: JoinSet<anyhow::Result<()>>,
        grace: Duration,
    ) -> anyhow::Result<()> {
        self.cancel_token.cancel();

        for port in self.ports {
            port.unsubscribe().await;
        }

        let drain = async {
            while let Some(result) = tasks.join_next().await {
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::warn!("Task ended with error: {e:#}"),
                    Err(e) => tracing::error!("Task panicked: {e}"),
                }
            }
        };
        if tokio::time::timeout(grace, drain).await.is_err() {
            tracing::warn!("Tasks did not stop in time, aborting");
            tasks.abort_all();
        }

        let render = self.orchestrator.as_ref().map(|h| h.render_state());
        self.state.persist(render.as_ref()).await?;
        tracing::info!("Profile saved, bye");
        Ok(())
    }
}
