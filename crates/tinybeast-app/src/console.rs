use std::fmt::Write as _;
use std::io::BufRead;

use kanal::AsyncSender;
use tinybeast_core::language::{ONLINE_LANGUAGES, is_online_language};
use tinybeast_core::{DictionaryRegistry, LifecycleEvent};
use tinybeast_types::{
    AppEvent, DictId, INITIALIZING_MESSAGE, Mode, RenderState, SourceLang, TranslationOutput,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub const HELP: &str = "\
Type text to translate it. Commands:
  :submit            translate now
  :clear             clear query and result
  :pair <from> <to>  set the language pair (from may be auto)
  :swap              swap languages
  :langs             list online languages
  :online            online mode
  :offline [id]      offline mode, optionally with a dictionary
  :dicts             list dictionaries
  :download <id>     download a dictionary
  :cancel <id>       cancel a download
  :delete <id>       delete a dictionary
  :select <id>       select the offline dictionary
  :focus             simulate window focus
  :selected <text>   simulate a text selection
  :copied <text>     simulate a clipboard copy
  :auto-clipboard on|off
  :auto-selection on|off
  :speak             speak the query
  :speak-result      speak the translation
  :quit";

pub const SPEECH_UNAVAILABLE: &str =
    "Speech needs audio output; rebuild with `--features audio`.";

/// Turn one console line into an event. `Ok(None)` for blank lines.
pub fn parse_line(line: &str) -> Result<Option<AppEvent>, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }

    let Some(command) = line.strip_prefix(':') else {
        return Ok(Some(AppEvent::QueryText(line.to_string())));
    };

    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };

    let dict_arg = || {
        if rest.is_empty() {
            Err(format!(":{name} needs a dictionary id"))
        } else {
            Ok(DictId::from(rest))
        }
    };

    let event = match name {
        "submit" => AppEvent::Submit,
        "clear" => AppEvent::Clear,
        "swap" => AppEvent::SwapLanguages,
        "pair" => {
            let mut parts = rest.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(from), Some(to), None) => {
                    let from = SourceLang::from(from);
                    if let SourceLang::Lang(code) = &from
                        && !is_online_language(code)
                    {
                        return Err(format!("unknown language {code}, try :langs"));
                    }
                    if !is_online_language(to) {
                        return Err(format!("unknown target language {to}, try :langs"));
                    }
                    AppEvent::SetLanguagePair {
                        from,
                        to: to.to_string(),
                    }
                }
                _ => return Err("usage: :pair <from> <to>".to_string()),
            }
        }
        "online" => AppEvent::SetMode {
            mode: Mode::Online,
            dict: None,
        },
        "offline" => AppEvent::SetMode {
            mode: Mode::Offline,
            dict: (!rest.is_empty()).then(|| DictId::from(rest)),
        },
        "dicts" => AppEvent::ListDictionaries,
        "download" => AppEvent::Download(dict_arg()?),
        "cancel" => AppEvent::CancelDownload(dict_arg()?),
        "delete" => AppEvent::DeleteDictionary(dict_arg()?),
        "select" => AppEvent::SelectDictionary(dict_arg()?),
        "focus" => AppEvent::FocusChanged(true),
        "selected" => AppEvent::TextSelected(rest.to_string()),
        "copied" => AppEvent::ClipboardCopied(rest.to_string()),
        "auto-clipboard" => AppEvent::SetAutoTranslate {
            clipboard: Some(parse_switch(rest)?),
            selection: None,
        },
        "auto-selection" => AppEvent::SetAutoTranslate {
            clipboard: None,
            selection: Some(parse_switch(rest)?),
        },
        "speak" => AppEvent::SpeakQuery,
        "speak-result" => AppEvent::SpeakTranslation,
        "quit" | "q" => AppEvent::Quit,
        other => return Err(format!("unknown command :{other}, try :help")),
    };

    Ok(Some(event))
}

fn parse_switch(value: &str) -> Result<bool, String> {
    match value {
        "on" => Ok(true),
        "off" => Ok(false),
        _ => Err("expected on or off".to_string()),
    }
}

/// Read stdin lines and forward them as events until `:quit` or cancellation
pub async fn input_loop(
    event_tx: AsyncSender<AppEvent>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let (line_tx, line_rx) = kanal::bounded::<String>(16);
    let line_rx = line_rx.to_async();

    // A plain thread, so a pending read never holds up runtime shutdown
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    println!("{HELP}");

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = line_rx.recv() => match line {
                Ok(line) => line,
                Err(_) => {
                    tracing::info!("stdin closed");
                    event_tx.send(AppEvent::Quit).await?;
                    break;
                }
            },
        };

        match line.trim() {
            ":help" => {
                println!("{HELP}");
                continue;
            }
            ":langs" => {
                println!("{}", format_languages());
                continue;
            }
            _ => {}
        }

        match parse_line(&line) {
            Ok(Some(event)) => {
                let quit = event == AppEvent::Quit;
                event_tx.send(event).await?;
                if quit {
                    break;
                }
            }
            Ok(None) => {}
            Err(message) => println!("! {message}"),
        }
    }

    Ok(())
}

/// Print every render state change
pub async fn render_loop(
    mut render_rx: watch::Receiver<RenderState>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let mut last = String::new();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = render_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        let text = format_render(&render_rx.borrow_and_update());
        if text != last {
            println!("{text}");
            last = text;
        }
    }
    Ok(())
}

pub fn format_render(state: &RenderState) -> String {
    let mut out = match state.mode {
        Mode::Online => format!("[online {} -> {}]", state.from, state.to),
        Mode::Offline => match &state.offline_dict {
            Some(dict) => format!("[offline {dict}]"),
            None => "[offline]".to_string(),
        },
    };

    if !state.query.is_empty() {
        let _ = write!(out, " {}", state.query);
    }
    if state.is_loading {
        out.push_str(" ...");
    }
    if let Some(result) = &state.result {
        out.push('\n');
        out.push_str(&format_output(result));
    }
    out
}

pub fn format_output(output: &TranslationOutput) -> String {
    match output {
        TranslationOutput::Online(t) => {
            let mut out = format!("= {}", t.primary);
            for alt in t.alternatives.iter().filter(|a| a.translation != t.primary) {
                let _ = write!(
                    out,
                    "\n  ~ {} ({:.0}%)",
                    alt.translation,
                    alt.accuracy * 100.0
                );
            }
            for def in &t.definitions {
                let _ = write!(out, "\n  * {}", def.headword);
                if !def.pos.is_empty() {
                    let _ = write!(out, " ({})", def.pos);
                }
                let _ = write!(out, ": {}", def.meaning);
                if let Some(translation) = &def.translation {
                    let _ = write!(out, " -> {translation}");
                }
                for example in &def.examples {
                    let _ = write!(out, "\n      e.g. {example}");
                }
            }
            for example in &t.examples {
                let _ = write!(out, "\n  > {example}");
            }
            if !t.sources.is_empty() {
                let _ = write!(out, "\n  via {}", t.sources.join(", "));
            }
            out
        }
        TranslationOutput::Offline(entry) => {
            let mut out = if entry.pos.is_empty() {
                String::from("=")
            } else {
                format!("= ({})", entry.pos)
            };
            for (i, sense) in entry.senses.iter().enumerate() {
                let mut line = sense.glosses.join("; ");
                if !sense.tags.is_empty() {
                    line = format!("[{}] {line}", sense.tags.join(", "));
                }
                let _ = write!(out, "\n  {}. {line}", i + 1);
                for example in &sense.examples {
                    if let Some(text) = &example.text {
                        let _ = write!(out, "\n     \"{text}\"");
                        if let Some(english) = &example.english {
                            let _ = write!(out, " - {english}");
                        }
                    }
                }
            }
            if let Some(etymology) = &entry.etymology_text {
                let _ = write!(out, "\n  etymology: {etymology}");
            }
            if !entry.related.is_empty() {
                let related: Vec<&str> = entry.related.iter().map(|r| r.word.as_str()).collect();
                let _ = write!(out, "\n  related: {}", related.join(", "));
            }
            out
        }
        TranslationOutput::Initializing => INITIALIZING_MESSAGE.to_string(),
        TranslationOutput::Error(message) => format!("! {message}"),
    }
}

pub fn format_languages() -> String {
    ONLINE_LANGUAGES
        .iter()
        .map(|(name, code)| format!("{code:<6} {name}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_dictionaries(registry: &DictionaryRegistry) -> String {
    let mut out = String::new();
    for entry in registry.entries() {
        let marker = if registry.selected() == Some(&entry.id) {
            '*'
        } else {
            ' '
        };
        let _ = writeln!(
            out,
            "{marker} {:<6} {:<22} {:>6} / {:<7} {}",
            entry.id.as_str(),
            entry.display_name,
            entry.size_downloaded,
            entry.size_installed,
            entry.status.label()
        );
    }
    out.trim_end().to_string()
}

pub fn format_lifecycle(event: &LifecycleEvent) -> Option<String> {
    match event {
        LifecycleEvent::StatusChanged { dict, status } => {
            Some(format!("{dict}: {}", status.label()))
        }
        LifecycleEvent::CancelRequested(dict) => Some(format!("{dict}: cancelling")),
        LifecycleEvent::DownloadFailed {
            dict,
            cancelled: true,
            ..
        } => Some(format!("{dict}: download cancelled")),
        LifecycleEvent::DownloadFailed { dict, message, .. } => {
            Some(format!("! {dict}: download failed: {message}"))
        }
        LifecycleEvent::DeleteFailed { dict, message } => {
            Some(format!("! {dict}: delete failed: {message}"))
        }
        LifecycleEvent::DownloadedSetChanged { .. } => None,
    }
}
