use std::sync::Arc;

use kanal::{AsyncReceiver, AsyncSender};
use tinybeast_core::language::language_name;
use tinybeast_core::triggers::TriggerEvent;
use tinybeast_core::{DictionaryLifecycleManager, LifecycleEvent, OrchestratorHandle};
use tinybeast_types::{AppEvent, Mode};
use tokio_util::sync::CancellationToken;

use crate::console;
use crate::state::AppState;

/// Senders for each trigger port
#[derive(Clone)]
pub struct PortSenders {
    pub focus: AsyncSender<TriggerEvent>,
    pub selection: AsyncSender<TriggerEvent>,
    pub clipboard: AsyncSender<TriggerEvent>,
    pub manual: AsyncSender<TriggerEvent>,
}

/// Where app events get routed
#[derive(Clone)]
pub struct Routes {
    pub orchestrator: OrchestratorHandle,
    pub lifecycle: DictionaryLifecycleManager,
    pub ports: PortSenders,
    /// False when built without an audio output
    pub speech_enabled: bool,
}

/// App's main loop
pub async fn event_loop(
    state: Arc<AppState>,
    events_rx: AsyncReceiver<AppEvent>,
    routes: Routes,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    tracing::info!("[EVENT_LOOP] Starting main loop, waiting for events");
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events_rx.recv() => event?,
        };

        tracing::debug!("[EVENT_LOOP] {:?}", event);
        if event == AppEvent::Quit {
            tracing::info!("Quit requested");
            break;
        }
        handle_event(&state, &routes, event).await?;
    }

    Ok(())
}

async fn handle_event(state: &AppState, routes: &Routes, event: AppEvent) -> anyhow::Result<()> {
    let Routes {
        orchestrator,
        lifecycle,
        ports,
        speech_enabled,
    } = routes;

    match event {
        AppEvent::QueryText(text) => orchestrator.set_query_text(text).await?,
        AppEvent::Submit => ports.manual.send(TriggerEvent::ManualSubmit).await?,
        AppEvent::Clear => orchestrator.clear().await?,
        AppEvent::SetLanguagePair { from, to } => {
            tracing::info!("Translating into {}", language_name(&to).unwrap_or(to.as_str()));
            orchestrator.set_language_pair(from, to).await?
        }
        AppEvent::SwapLanguages => ports.manual.send(TriggerEvent::SwapLanguages).await?,
        AppEvent::SetMode { mode, dict } => {
            let dict = match (mode, dict) {
                (Mode::Offline, Some(id)) => {
                    if let Err(e) = lifecycle.select(&id).await {
                        tracing::warn!("Cannot switch to {id}: {e}");
                        return Ok(());
                    }
                    Some(id)
                }
                (Mode::Offline, None) => state.registry.read().await.selected().cloned(),
                (Mode::Online, _) => None,
            };
            orchestrator.set_mode(mode, dict).await?;
        }
        AppEvent::FocusChanged(focused) => {
            ports.focus.send(TriggerEvent::FocusChanged(focused)).await?
        }
        AppEvent::TextSelected(text) => ports.selection.send(TriggerEvent::TextSelected(text)).await?,
        AppEvent::ClipboardCopied(text) => {
            ports.clipboard.send(TriggerEvent::ClipboardCopied(text)).await?
        }
        AppEvent::SetAutoTranslate {
            clipboard,
            selection,
        } => {
            if let Some(enabled) = clipboard {
                state.toggles.set_clipboard(enabled);
                tracing::info!("Auto-translate clipboard: {enabled}");
            }
            if let Some(enabled) = selection {
                state.toggles.set_selection(enabled);
                tracing::info!("Auto-translate selection: {enabled}");
            }
        }
        AppEvent::Download(id) => {
            if let Err(e) = lifecycle.download(&id).await {
                tracing::warn!("Cannot download {id}: {e}");
            }
        }
        AppEvent::CancelDownload(id) => {
            if let Err(e) = lifecycle.cancel(&id).await {
                tracing::warn!("Cannot cancel {id}: {e}");
            }
        }
        AppEvent::DeleteDictionary(id) => {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move {
                if let Err(e) = lifecycle.delete(&id).await {
                    tracing::warn!("Cannot delete {id}: {e}");
                }
            });
        }
        AppEvent::SelectDictionary(id) => match lifecycle.select(&id).await {
            Ok(()) => {
                if orchestrator.render_state().mode == Mode::Offline {
                    orchestrator.set_mode(Mode::Offline, Some(id)).await?;
                }
            }
            Err(e) => tracing::warn!("Cannot select {id}: {e}"),
        },
        AppEvent::ListDictionaries => {
            let listing = console::format_dictionaries(&*state.registry.read().await);
            println!("{listing}");
        }
        AppEvent::SpeakQuery | AppEvent::SpeakTranslation if !speech_enabled => {
            println!("{}", console::SPEECH_UNAVAILABLE);
        }
        AppEvent::SpeakQuery => orchestrator.speak_query().await?,
        AppEvent::SpeakTranslation => orchestrator.speak_translation().await?,
        AppEvent::Quit => {}
    }

    Ok(())
}

/// Report lifecycle events and persist downloaded-set changes
pub async fn lifecycle_loop(
    state: Arc<AppState>,
    events_rx: AsyncReceiver<LifecycleEvent>,
    orchestrator: OrchestratorHandle,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events_rx.recv() => event?,
        };

        if let Some(line) = console::format_lifecycle(&event) {
            println!("{line}");
        }

        if let LifecycleEvent::DownloadedSetChanged {
            downloaded,
            selected,
        } = &event
        {
            tracing::debug!("Persisting downloaded set {downloaded:?}, selected {selected:?}");
            if let Err(e) = state.persist(None).await {
                tracing::error!("Failed to save profile: {e:#}");
            }
            orchestrator.sync_dictionary().await?;
        }
    }

    Ok(())
}
