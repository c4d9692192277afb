use std::sync::Arc;

use tinybeast_config::{Config, Settings};
use tinybeast_core::triggers::AutoTranslate;
use tinybeast_core::{DictionaryRegistry, SharedRegistry};
use tinybeast_types::RenderState;
use tokio::sync::RwLock;

use crate::profile::ProfileStore;

pub struct AppState {
    pub config: Arc<RwLock<Config>>,
    pub settings: Arc<RwLock<Settings>>,
    pub registry: SharedRegistry,
    pub toggles: Arc<AutoTranslate>,
    pub profile: ProfileStore,
}

impl AppState {
    pub fn new(config: Config, settings: Settings, profile: ProfileStore) -> Self {
        let mut registry = DictionaryRegistry::default();
        registry.restore(
            &settings.downloaded_dicts,
            settings.selected_offline_dict.as_ref(),
        );
        tracing::info!(
            "Restored {} offline dictionaries, selected: {:?}",
            registry.downloaded().len(),
            registry.selected()
        );

        let toggles = AutoTranslate::new(
            settings.should_translate_clipboard,
            settings.should_translate_selected_text,
        );

        Self {
            config: Arc::new(RwLock::new(config)),
            settings: Arc::new(RwLock::new(settings)),
            registry: registry.shared(),
            toggles: Arc::new(toggles),
            profile,
        }
    }

    /// Copy live state into the settings and write the profile
    pub async fn persist(&self, render: Option<&RenderState>) -> anyhow::Result<()> {
        let snapshot = {
            let registry = self.registry.read().await;
            let mut settings = self.settings.write().await;

            if let Some(render) = render {
                settings.mode = render.mode;
                settings.from = render.from.clone();
                settings.to = render.to.clone();
            }
            settings.downloaded_dicts = registry.downloaded().to_vec();
            settings.selected_offline_dict = registry.selected().cloned();
            settings.should_translate_clipboard = self.toggles.clipboard();
            settings.should_translate_selected_text = self.toggles.selection();
            settings.clone()
        };

        let profile = self.profile.clone();
        tokio::task::spawn_blocking(move || profile.save(&snapshot)).await?
    }
}

#[cfg(test)]
mod tests {
    use tinybeast_types::{DictId, Mode, SourceLang};

    use super::*;

    #[tokio::test]
    async fn persist_captures_registry_toggles_and_render_state() {
        let dir = tempfile::tempdir().unwrap();
        let profile = ProfileStore::new(dir.path(), "main");
        let settings = Settings {
            downloaded_dicts: vec![DictId::from("de"), DictId::from("xx")],
            ..Settings::default()
        };
        let state = AppState::new(Config::default(), settings, profile.clone());
        state.toggles.set_selection(true);

        let render = RenderState {
            mode: Mode::Offline,
            from: SourceLang::from("it"),
            to: "es".to_string(),
            ..RenderState::default()
        };
        state.persist(Some(&render)).await.unwrap();

        let saved = profile.load();
        assert_eq!(saved.mode, Mode::Offline);
        assert_eq!(saved.from, SourceLang::from("it"));
        assert_eq!(saved.to, "es");
        assert_eq!(saved.downloaded_dicts, vec![DictId::from("de")]);
        assert_eq!(saved.selected_offline_dict, Some(DictId::from("de")));
        assert!(saved.should_translate_selected_text);
        assert!(!saved.should_translate_clipboard);
    }
}
