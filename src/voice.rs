//! Voice modality: listen cycles, intent matching, and spoken side effects.
//!
//! The processor runs one listen cycle per iteration and publishes a bus
//! `Command` for every recognized utterance. Unrecognized speech gets a
//! direct spoken notice — a side effect outside the bus — and silence
//! publishes nothing. The side effects of recognized commands (application
//! launch, web search, spoken time) run in [`CommandExecutor`], which the
//! arbiter calls when it routes a `Command` event.

use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::Local;

use crate::command::{normalize, CommandTable, Intent};
use crate::event::{EventKind, EventPublisher, Source};
use crate::session::SessionContext;
use crate::speech::SpeechIo;
use crate::telemetry::log_event;

/// Listen window and phrase limit per cycle.
pub const LISTEN_TIMEOUT: Duration = Duration::from_secs(5);
pub const PHRASE_LIMIT: Duration = Duration::from_secs(5);

/// Backoff after a failed listen cycle so a dead microphone does not spin.
const LISTEN_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Spoken responses for one language.
struct Phrases {
    greeting: &'static str,
    unrecognized: &'static str,
    goodbye: &'static str,
    time_is: &'static str,
    searching: &'static str,
    opening: &'static str,
    failed: &'static str,
}

const ENGLISH_PHRASES: Phrases = Phrases {
    greeting: "Voice control activated.",
    unrecognized: "Sorry, I don't understand that command.",
    goodbye: "Goodbye!",
    time_is: "The current time is",
    searching: "Searching for",
    opening: "Opening",
    failed: "Could not complete",
};

const HINDI_PHRASES: Phrases = Phrases {
    greeting: "वॉयस नियंत्रण सक्रिय है।",
    unrecognized: "माफ़ कीजिए, मैं वह कमांड नहीं समझा।",
    goodbye: "अलविदा!",
    time_is: "वर्तमान समय है",
    searching: "खोज रहा हूँ",
    opening: "खोल रहा हूँ",
    failed: "पूरा नहीं कर सका",
};

fn phrases_for(base_language: &str) -> &'static Phrases {
    match base_language {
        "hi" => &HINDI_PHRASES,
        _ => &ENGLISH_PHRASES,
    }
}

/// Listen loop half of the modality.
pub struct VoiceProcessor {
    speech: Box<dyn SpeechIo>,
    table: CommandTable,
    phrases: &'static Phrases,
    language: String,
}

impl VoiceProcessor {
    pub fn new(speech: Box<dyn SpeechIo>, language: &str) -> Result<Self> {
        let base = language.split('-').next().unwrap_or("en").to_string();
        Ok(Self {
            speech,
            table: CommandTable::for_language(&base)?,
            phrases: phrases_for(&base),
            language: language.to_string(),
        })
    }

    /// One listen cycle: returns the normalized transcript to publish, if
    /// any. Silence and unintelligible speech are "no event", not errors.
    fn listen_once(&mut self) -> Option<String> {
        let transcript = match self.speech.listen(&self.language, LISTEN_TIMEOUT, PHRASE_LIMIT) {
            Ok(Some(transcript)) => transcript,
            Ok(None) => return None,
            Err(err) => {
                tracing::debug!("listen cycle failed: {err:#}");
                thread::sleep(LISTEN_RETRY_BACKOFF);
                return None;
            }
        };

        let text = normalize(&transcript);
        match self.table.interpret(&text) {
            Intent::Unrecognized => {
                // Direct spoken notice; nothing reaches the bus.
                if let Err(err) = self.speech.speak(self.phrases.unrecognized) {
                    tracing::debug!("unrecognized-notice speech failed: {err:#}");
                }
                None
            }
            _ => {
                log_event("command-recognized", &text);
                Some(text)
            }
        }
    }
}

/// Thread body for the voice modality.
pub fn run_voice_loop(ctx: Arc<SessionContext>, mut processor: VoiceProcessor, bus: EventPublisher) {
    log_event("module-start", "voice");
    if let Err(err) = processor.speech.speak(processor.phrases.greeting) {
        tracing::debug!("greeting speech failed: {err:#}");
    }

    while !ctx.shutdown_requested() {
        if let Some(text) = processor.listen_once() {
            if !bus.publish(Source::Voice, EventKind::Command { text }) {
                return; // Arbiter is gone; the session is over.
            }
        }
    }
}

/// Outcome of routing one recognized command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Global shutdown was requested; the arbiter stops immediately.
    ExitRequested,
    /// The command's side effects ran (or failed recoverably).
    Completed,
}

/// Side-effecting command handler, owned by the arbiter.
///
/// Holds its own speech handle so spoken confirmations never contend with
/// the processor's listen cycles.
pub struct CommandExecutor {
    table: CommandTable,
    speech: Box<dyn SpeechIo>,
    phrases: &'static Phrases,
    opener: Vec<String>,
}

impl CommandExecutor {
    pub fn new(base_language: &str, speech: Box<dyn SpeechIo>, opener_cmd: &str) -> Result<Self> {
        let opener = shell_words::split(opener_cmd)
            .with_context(|| format!("failed to parse opener command {opener_cmd:?}"))?;
        if opener.is_empty() {
            return Err(anyhow!("opener command is empty"));
        }
        Ok(Self {
            table: CommandTable::for_language(base_language)?,
            speech,
            phrases: phrases_for(base_language),
            opener,
        })
    }

    /// Routes one recognized command's side effects.
    pub fn dispatch(&mut self, text: &str) -> CommandOutcome {
        match self.table.interpret(text) {
            Intent::Exit => {
                self.announce(self.phrases.goodbye);
                CommandOutcome::ExitRequested
            }
            Intent::OpenApplication { command } => {
                match Command::new(&command)
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .spawn()
                {
                    Ok(_child) => self.announce(&format!("{} {command}.", self.phrases.opening)),
                    Err(err) => {
                        tracing::warn!("failed to launch {command}: {err}");
                        self.announce(&format!("{} {command}.", self.phrases.failed));
                    }
                }
                CommandOutcome::Completed
            }
            Intent::WebSearch { term } => {
                let url = search_url(&term);
                match Command::new(&self.opener[0])
                    .args(&self.opener[1..])
                    .arg(&url)
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .spawn()
                {
                    Ok(_child) => self.announce(&format!("{} {term}.", self.phrases.searching)),
                    Err(err) => {
                        tracing::warn!("failed to open search {url}: {err}");
                        self.announce(&format!("{} {term}.", self.phrases.failed));
                    }
                }
                CommandOutcome::Completed
            }
            Intent::SpeakTime => {
                let now = Local::now().format("%I:%M %p");
                self.announce(&format!("{} {now}.", self.phrases.time_is));
                CommandOutcome::Completed
            }
            Intent::Unrecognized => {
                // The processor filters these out before publishing; reaching
                // here means table drift, which is worth a notice but not a
                // failure.
                self.announce(self.phrases.unrecognized);
                CommandOutcome::Completed
            }
        }
    }

    /// Speaks a notice, falling back to the log when speech is unavailable.
    pub fn announce(&mut self, text: &str) {
        if let Err(err) = self.speech.speak(text) {
            tracing::warn!("notice not vocalized ({err:#}): {text}");
        }
    }
}

/// Search URL for a term; spaces become `+` for the query string.
fn search_url(term: &str) -> String {
    let query = term.trim().replace(' ', "+");
    format!("https://www.google.com/search?q={query}")
}
