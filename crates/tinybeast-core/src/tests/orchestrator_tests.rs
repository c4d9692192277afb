use std::sync::Arc;
use std::time::Duration;

use kanal::AsyncReceiver;
use tinybeast_translator::TranslateError;
use tinybeast_types::{DictId, Mode, RenderState, SourceLang, TranslationOutput};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::mocks::*;
use crate::orchestrator::{Backends, OrchestratorHandle, QueryContext, RequestOrchestrator};
use crate::registry::{DictionaryRegistry, SharedRegistry};

const DEBOUNCE: Duration = Duration::from_millis(700);

struct Harness {
    handle: OrchestratorHandle,
    render: watch::Receiver<RenderState>,
    translations: AsyncReceiver<TranslateCall>,
    lookups: AsyncReceiver<LookupCall>,
    registry: SharedRegistry,
    cancel: CancellationToken,
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn start(ctx: QueryContext, registry: DictionaryRegistry) -> Harness {
    let (translator, translations) = GatedTranslator::new();
    let (dictionary, lookups) = GatedDictionary::new();
    let registry = registry.shared();

    let backends = Backends {
        online: Arc::new(translator),
        offline: Arc::new(dictionary),
        speech: None,
    };
    let (orchestrator, handle) =
        RequestOrchestrator::new(ctx, DEBOUNCE, registry.clone(), backends);

    let cancel = CancellationToken::new();
    tokio::spawn(orchestrator.run(cancel.clone()));

    Harness {
        render: handle.subscribe(),
        handle,
        translations,
        lookups,
        registry,
        cancel,
    }
}

fn online(from: &str, to: &str) -> Harness {
    start(
        QueryContext::new(Mode::Online, SourceLang::from(from), to.to_string(), None),
        DictionaryRegistry::default(),
    )
}

fn offline_with(installed: &[&str]) -> Harness {
    let mut registry = DictionaryRegistry::default();
    let ids: Vec<DictId> = installed.iter().map(|id| DictId::from(*id)).collect();
    registry.restore(&ids, ids.first());

    start(
        QueryContext::new(Mode::Offline, SourceLang::Auto, "en".to_string(), None),
        registry,
    )
}

fn primary(state: &RenderState) -> Option<&str> {
    match &state.result {
        Some(TranslationOutput::Online(t)) => Some(t.primary.as_str()),
        _ => None,
    }
}

#[tokio::test(start_paused = true)]
async fn test_typing_is_debounced_into_one_call() {
    let mut h = online("auto", "fr");

    h.handle.set_query_text("h").await.unwrap();
    h.handle.set_query_text("he").await.unwrap();
    h.handle.set_query_text("hel").await.unwrap();

    let call = next(&h.translations).await;
    assert_eq!(call.text, "hel");
    assert_eq!(call.from, SourceLang::Auto);
    assert_eq!(call.to, "fr");
    assert!(h.handle.render_state().is_loading);

    call.reply.send(Ok(translation("bonjour"))).unwrap();
    let state = wait_render(&mut h.render, |s| !s.is_loading && s.result.is_some()).await;
    assert_eq!(primary(&state), Some("bonjour"));
    assert_eq!(state.query, "hel");

    assert_quiet(&h.translations).await;
}

#[tokio::test(start_paused = true)]
async fn test_no_call_before_quiet_period() {
    let h = online("auto", "fr");

    h.handle.set_query_text("hello").await.unwrap();
    tokio::time::sleep(DEBOUNCE / 2).await;
    assert!(h.translations.try_recv().unwrap().is_none());

    let call = next(&h.translations).await;
    assert_eq!(call.text, "hello");
}

#[tokio::test(start_paused = true)]
async fn test_stale_response_is_dropped() {
    let mut h = online("auto", "fr");

    h.handle.set_query_text("alpha").await.unwrap();
    h.handle.submit_now().await.unwrap();
    let first = next(&h.translations).await;
    assert_eq!(first.text, "alpha");

    h.handle.set_query_text("beta").await.unwrap();
    h.handle.submit_now().await.unwrap();
    let second = next(&h.translations).await;
    assert_eq!(second.text, "beta");

    // Old response lands while the new one is still in flight
    first.reply.send(Ok(translation("alpha-fr"))).unwrap();
    settle().await;
    let state = h.handle.render_state();
    assert!(state.is_loading);
    assert_eq!(state.result, None);

    second.reply.send(Ok(translation("beta-fr"))).unwrap();
    let state = wait_render(&mut h.render, |s| !s.is_loading).await;
    assert_eq!(primary(&state), Some("beta-fr"));
}

#[tokio::test(start_paused = true)]
async fn test_out_of_order_completion_keeps_latest() {
    let mut h = online("auto", "fr");

    h.handle.set_query_text("alpha").await.unwrap();
    h.handle.submit_now().await.unwrap();
    let first = next(&h.translations).await;

    h.handle.set_query_text("beta").await.unwrap();
    h.handle.submit_now().await.unwrap();
    let second = next(&h.translations).await;

    second.reply.send(Ok(translation("beta-fr"))).unwrap();
    wait_render(&mut h.render, |s| !s.is_loading).await;

    first.reply.send(Ok(translation("alpha-fr"))).unwrap();
    settle().await;
    assert_eq!(primary(&h.handle.render_state()), Some("beta-fr"));
}

#[tokio::test(start_paused = true)]
async fn test_language_change_redispatches_and_drops_old_target() {
    let mut h = online("auto", "fr");

    h.handle.set_query_text("hello").await.unwrap();
    h.handle.submit_now().await.unwrap();
    let to_french = next(&h.translations).await;
    assert_eq!(to_french.to, "fr");

    h.handle
        .set_language_pair(SourceLang::Auto, "de".to_string())
        .await
        .unwrap();
    let to_german = next(&h.translations).await;
    assert_eq!(to_german.text, "hello");
    assert_eq!(to_german.to, "de");

    to_french.reply.send(Ok(translation("bonjour"))).unwrap();
    settle().await;
    assert_eq!(h.handle.render_state().result, None);

    to_german.reply.send(Ok(translation("hallo"))).unwrap();
    let state = wait_render(&mut h.render, |s| !s.is_loading).await;
    assert_eq!(primary(&state), Some("hallo"));
    assert_eq!(state.to, "de");
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_language_pair_is_a_no_op() {
    let h = online("auto", "fr");

    h.handle.set_query_text("hello").await.unwrap();
    h.handle.submit_now().await.unwrap();
    let call = next(&h.translations).await;
    call.reply.send(Ok(translation("bonjour"))).unwrap();

    h.handle
        .set_language_pair(SourceLang::Auto, "fr".to_string())
        .await
        .unwrap();
    assert_quiet(&h.translations).await;
}

#[tokio::test(start_paused = true)]
async fn test_whitespace_query_clears_without_call() {
    let mut h = online("auto", "fr");

    h.handle.set_query_text("hello").await.unwrap();
    h.handle.submit_now().await.unwrap();
    next(&h.translations)
        .await
        .reply
        .send(Ok(translation("bonjour")))
        .unwrap();
    wait_render(&mut h.render, |s| s.result.is_some() && !s.is_loading).await;

    h.handle.set_query_text("   ").await.unwrap();
    let state = wait_render(&mut h.render, |s| s.result.is_none()).await;
    assert!(!state.is_loading);

    h.handle.submit_now().await.unwrap();
    assert_quiet(&h.translations).await;
}

#[tokio::test(start_paused = true)]
async fn test_backend_error_renders_in_result_slot() {
    let mut h = online("auto", "fr");

    h.handle.set_query_text("hello").await.unwrap();
    h.handle.submit_now().await.unwrap();
    next(&h.translations)
        .await
        .reply
        .send(Err(TranslateError::RateLimitExceeded))
        .unwrap();

    let state = wait_render(&mut h.render, |s| !s.is_loading && s.result.is_some()).await;
    assert_eq!(
        state.result,
        Some(TranslationOutput::Error("Rate limit exceeded".to_string()))
    );
}

#[tokio::test(start_paused = true)]
async fn test_long_query_is_truncated() {
    let mut h = online("auto", "fr");

    h.handle.set_query_text("a".repeat(300)).await.unwrap();
    let state = wait_render(&mut h.render, |s| !s.query.is_empty()).await;
    assert_eq!(state.query.chars().count(), 256);
}

#[tokio::test(start_paused = true)]
async fn test_first_offline_lookup_shows_placeholder_once() {
    let mut h = offline_with(&["fr"]);

    h.handle.set_query_text("chat").await.unwrap();
    h.handle.submit_now().await.unwrap();

    let state = wait_render(&mut h.render, |s| s.is_loading).await;
    assert_eq!(state.result, Some(TranslationOutput::Initializing));

    let call = next(&h.lookups).await;
    assert_eq!(call.dict, DictId::from("fr"));
    assert_eq!(call.text, "chat");
    call.reply.send(Ok(entry("noun"))).unwrap();

    let state = wait_render(&mut h.render, |s| !s.is_loading).await;
    assert_eq!(state.result, Some(TranslationOutput::Offline(entry("noun"))));
    assert!(h.registry.read().await.get(&DictId::from("fr")).unwrap().bootstrapped);

    h.handle.set_query_text("chien").await.unwrap();
    h.handle.submit_now().await.unwrap();
    let call = next(&h.lookups).await;
    let state = h.handle.render_state();
    assert!(state.is_loading);
    assert_ne!(state.result, Some(TranslationOutput::Initializing));

    call.reply.send(Ok(entry("noun"))).unwrap();
    wait_render(&mut h.render, |s| !s.is_loading).await;
}

#[tokio::test(start_paused = true)]
async fn test_offline_without_dictionary_reports_error() {
    let mut h = offline_with(&[]);

    h.handle.set_query_text("chat").await.unwrap();
    h.handle.submit_now().await.unwrap();

    let state = wait_render(&mut h.render, |s| s.result.is_some()).await;
    assert_eq!(
        state.result,
        Some(TranslationOutput::Error("No offline dictionary selected".to_string()))
    );
    assert!(!state.is_loading);
    assert_quiet(&h.lookups).await;
}

#[tokio::test(start_paused = true)]
async fn test_mode_switch_clears_and_does_not_retrigger() {
    let mut h = online("auto", "fr");

    h.handle.set_query_text("hello").await.unwrap();
    h.handle.submit_now().await.unwrap();
    let pending = next(&h.translations).await;

    h.handle.set_mode(Mode::Offline, None).await.unwrap();
    let state = wait_render(&mut h.render, |s| s.mode == Mode::Offline).await;
    assert_eq!(state.query, "");
    assert_eq!(state.result, None);
    assert!(!state.is_loading);

    pending.reply.send(Ok(translation("bonjour"))).unwrap();
    settle().await;
    assert_eq!(h.handle.render_state().result, None);
    assert_quiet(&h.lookups).await;
}

#[tokio::test(start_paused = true)]
async fn test_swap_feeds_translation_back() {
    let mut h = online("auto", "fr");

    h.handle.set_query_text("hello").await.unwrap();
    h.handle.submit_now().await.unwrap();
    next(&h.translations)
        .await
        .reply
        .send(Ok(translation("bonjour")))
        .unwrap();
    wait_render(&mut h.render, |s| s.result.is_some() && !s.is_loading).await;

    h.handle.swap_languages().await.unwrap();
    let call = next(&h.translations).await;
    assert_eq!(call.text, "bonjour");
    assert_eq!(call.from, SourceLang::from("fr"));
    assert_eq!(call.to, "en");

    let state = h.handle.render_state();
    assert_eq!(state.query, "bonjour");
    assert_eq!(state.from, SourceLang::from("fr"));
}

#[tokio::test(start_paused = true)]
async fn test_swap_is_ignored_offline() {
    let h = offline_with(&["fr"]);

    h.handle.swap_languages().await.unwrap();
    settle().await;

    let state = h.handle.render_state();
    assert_eq!(state.from, SourceLang::Auto);
    assert_eq!(state.to, "en");
    assert_quiet(&h.lookups).await;
}

#[tokio::test(start_paused = true)]
async fn test_clear_resets_render_state() {
    let mut h = online("auto", "fr");

    h.handle.set_query_text("hello").await.unwrap();
    h.handle.submit_now().await.unwrap();
    let pending = next(&h.translations).await;

    h.handle.clear().await.unwrap();
    let state = wait_render(&mut h.render, |s| s.query.is_empty()).await;
    assert_eq!(state.result, None);
    assert!(!state.is_loading);

    pending.reply.send(Ok(translation("bonjour"))).unwrap();
    settle().await;
    assert_eq!(h.handle.render_state().result, None);
}

#[tokio::test(start_paused = true)]
async fn test_handle_fails_after_shutdown() {
    let h = online("auto", "fr");
    h.cancel.cancel();
    settle().await;

    assert!(h.handle.submit_now().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_sync_follows_registry_after_removal() {
    let mut h = offline_with(&["fr", "de"]);

    h.handle.sync_dictionary().await.unwrap();
    let state = wait_render(&mut h.render, |s| s.offline_dict.is_some()).await;
    assert_eq!(state.offline_dict, Some(DictId::from("fr")));

    h.handle.set_query_text("chat").await.unwrap();
    h.handle.submit_now().await.unwrap();
    next(&h.lookups).await.reply.send(Ok(entry("noun"))).unwrap();
    wait_render(&mut h.render, |s| s.result.is_some() && !s.is_loading).await;

    h.registry.write().await.uninstall(&DictId::from("fr"));
    h.handle.sync_dictionary().await.unwrap();

    let state = wait_render(&mut h.render, |s| s.offline_dict == Some(DictId::from("de"))).await;
    assert_eq!(state.query, "");
    assert_eq!(state.result, None);

    h.registry.write().await.uninstall(&DictId::from("de"));
    h.handle.sync_dictionary().await.unwrap();
    let state = wait_render(&mut h.render, |s| s.offline_dict.is_none()).await;
    assert_eq!(state.mode, Mode::Offline);
    assert_quiet(&h.lookups).await;
}

#[tokio::test(start_paused = true)]
async fn test_sync_keeps_installed_dictionary() {
    let mut h = offline_with(&["fr", "de"]);
    h.handle.set_mode(Mode::Offline, Some(DictId::from("de"))).await.unwrap();
    wait_render(&mut h.render, |s| s.offline_dict == Some(DictId::from("de"))).await;

    h.handle.set_query_text("hund").await.unwrap();
    h.handle.sync_dictionary().await.unwrap();
    settle().await;

    let state = h.handle.render_state();
    assert_eq!(state.offline_dict, Some(DictId::from("de")));
    assert_eq!(state.query, "hund");
}

#[tokio::test(start_paused = true)]
async fn test_sync_while_online_request_pending_redispatches() {
    let mut registry = DictionaryRegistry::default();
    registry.restore(&[DictId::from("fr"), DictId::from("de")], None);
    let mut h = start(
        QueryContext::new(
            Mode::Online,
            SourceLang::Auto,
            "fr".to_string(),
            Some(DictId::from("fr")),
        ),
        registry,
    );

    h.handle.set_query_text("hello").await.unwrap();
    h.handle.submit_now().await.unwrap();
    let first = next(&h.translations).await;

    h.registry.write().await.uninstall(&DictId::from("fr"));
    h.handle.sync_dictionary().await.unwrap();
    let second = next(&h.translations).await;
    assert_eq!(second.text, "hello");

    first.reply.send(Ok(translation("stale"))).unwrap();
    settle().await;
    assert_eq!(h.handle.render_state().result, None);

    second.reply.send(Ok(translation("bonjour"))).unwrap();
    let state = wait_render(&mut h.render, |s| !s.is_loading).await;
    assert_eq!(primary(&state), Some("bonjour"));
    assert_eq!(state.offline_dict, Some(DictId::from("de")));
}
