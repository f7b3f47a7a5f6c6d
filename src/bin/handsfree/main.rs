//! Binary entry: resolve configuration, calibrate when needed, run the
//! session.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use handsfree::calibration::{self, CalibrationPrompter, PromptResponse};
use handsfree::config::{AppConfig, Mode};
use handsfree::perception::{split_frames, FrameSource, PerceptionProcess};
use handsfree::profile::ProfileStore;
use handsfree::sink::CommandSink;
use handsfree::speech::SpeechProcess;
use handsfree::voice::{CommandExecutor, VoiceProcessor};
use handsfree::{run_session, telemetry, JsonProfileStore, ModalityInputs, SessionContext};

fn main() -> Result<()> {
    let config = AppConfig::parse();
    telemetry::init_tracing(&config);

    // No session without a configuration snapshot: store errors are fatal.
    let store = JsonProfileStore::open_default()?;
    let mut profile = store.get(&config.profile)?;
    if let Some(language) = &config.language {
        profile.language = language.clone();
    }

    // Calibration runs before any processor starts, so the snapshot every
    // task sees is immutable. The calibration camera handle is released
    // before the session opens its own.
    if config.mode.includes_eye() && (profile.calibration.is_none() || config.calibrate) {
        let mut frames = PerceptionProcess::spawn(&config.perception_cmd)?;
        let mut prompter = ConsolePrompter;
        profile = calibration::ensure_calibrated(
            &store,
            &config.profile,
            profile,
            &mut frames,
            &mut prompter,
            config.calibrate,
        )?;
    }

    let ctx = Arc::new(SessionContext::new(profile.clone(), config.screen()));

    let (gesture_frames, eye_frames): (Option<Box<dyn FrameSource>>, Option<Box<dyn FrameSource>>) =
        match config.mode {
            Mode::Voice => (None, None),
            Mode::Gesture => (
                Some(Box::new(PerceptionProcess::spawn(&config.perception_cmd)?)),
                None,
            ),
            Mode::Eye => (
                None,
                Some(Box::new(PerceptionProcess::spawn(&config.perception_cmd)?)),
            ),
            Mode::Hybrid => {
                // Fused deployment: one camera handle, fanned out to both
                // camera-based processors.
                let source = PerceptionProcess::spawn(&config.perception_cmd)?;
                let (gesture_tap, eye_tap) = split_frames(source, ctx.clone());
                (Some(Box::new(gesture_tap)), Some(Box::new(eye_tap)))
            }
        };

    let voice = if config.mode.includes_voice() {
        let speech = SpeechProcess::new(&config.listen_cmd, &config.speak_cmd)?;
        Some(VoiceProcessor::new(Box::new(speech), &profile.language)?)
    } else {
        None
    };

    let executor = CommandExecutor::new(
        profile.base_language(),
        Box::new(SpeechProcess::new(&config.listen_cmd, &config.speak_cmd)?),
        &config.opener_cmd,
    )?;
    let sink = CommandSink::new(&config.inject_cmd)?;

    spawn_stop_reader(ctx.clone());

    run_session(
        ctx,
        ModalityInputs {
            gesture_frames,
            eye_frames,
            voice,
        },
        sink,
        executor,
    )
}

/// Secondary graceful-termination path next to the voice exit command:
/// typing `stop` (or `q`) on stdin sets the shutdown flag.
fn spawn_stop_reader(ctx: Arc<SessionContext>) {
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            if matches!(line.trim(), "stop" | "q" | "quit") {
                ctx.request_shutdown();
                break;
            }
        }
    });
}

/// Stdin-driven calibration prompts: Enter captures, `s` skips, `q` aborts.
struct ConsolePrompter;

impl CalibrationPrompter for ConsolePrompter {
    fn prompt(&mut self, corner: &str) -> Result<PromptResponse> {
        let mut stdout = io::stdout().lock();
        writeln!(
            stdout,
            "Calibration: look at the {corner} corner, then press Enter (s = skip, q = abort)"
        )
        .context("write calibration prompt")?;
        stdout.flush().context("flush calibration prompt")?;

        let mut answer = String::new();
        io::stdin()
            .read_line(&mut answer)
            .context("read calibration answer")?;
        Ok(match answer.trim() {
            "q" => PromptResponse::Abort,
            "s" => PromptResponse::Skip,
            _ => PromptResponse::Capture,
        })
    }

    fn warn(&mut self, message: &str) {
        eprintln!("{message}");
    }
}
