//! Speech collaborator seam: listen for transcripts, speak notices.
//!
//! Recognition and synthesis are external. The default adapter drives
//! configured recognizer/TTS commands as child processes; anything that can
//! print one transcript line per invocation works as a recognizer.

use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::bounded;

/// Extra wait beyond the listen windows before a recognizer child is killed.
const LISTEN_GRACE: Duration = Duration::from_secs(2);

/// Speech collaborator interface.
pub trait SpeechIo: Send {
    /// Blocks for up to `timeout + phrase_limit`; `Ok(None)` when nothing
    /// intelligible was heard this cycle.
    fn listen(
        &mut self,
        language: &str,
        timeout: Duration,
        phrase_limit: Duration,
    ) -> Result<Option<String>>;

    /// Blocks until the text has been vocalized.
    fn speak(&mut self, text: &str) -> Result<()>;
}

/// Adapter driving external recognizer/TTS commands.
///
/// The recognizer command is invoked once per listen cycle with the language
/// tag and the two window lengths (seconds) appended as arguments, and is
/// expected to print one transcript line on stdout — or nothing on timeout.
/// The TTS command receives the text as its final argument and is waited on,
/// so `speak` blocks until vocalization finishes.
pub struct SpeechProcess {
    listen_cmd: Vec<String>,
    speak_cmd: Vec<String>,
}

impl SpeechProcess {
    pub fn new(listen_cmd: &str, speak_cmd: &str) -> Result<Self> {
        Ok(Self {
            listen_cmd: split_command(listen_cmd, "recognizer")?,
            speak_cmd: split_command(speak_cmd, "speech output")?,
        })
    }
}

fn split_command(command: &str, role: &str) -> Result<Vec<String>> {
    let parts = shell_words::split(command)
        .with_context(|| format!("failed to parse {role} command {command:?}"))?;
    if parts.is_empty() {
        return Err(anyhow!("{role} command is empty"));
    }
    Ok(parts)
}

impl SpeechIo for SpeechProcess {
    fn listen(
        &mut self,
        language: &str,
        timeout: Duration,
        phrase_limit: Duration,
    ) -> Result<Option<String>> {
        let mut child = Command::new(&self.listen_cmd[0])
            .args(&self.listen_cmd[1..])
            .arg(language)
            .arg(timeout.as_secs().to_string())
            .arg(phrase_limit.as_secs().to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to start recognizer {:?}", self.listen_cmd[0]))?;

        let stdout = child
            .stdout
            .take()
            .context("failed to capture recognizer stdout")?;

        // The child owns its own timeout handling; the channel wait is only a
        // guard against a recognizer that hangs past its windows.
        let (tx, rx) = bounded(1);
        thread::spawn(move || {
            let mut line = String::new();
            let _ = BufReader::new(stdout).read_line(&mut line);
            let _ = tx.send(line);
        });

        let transcript = match rx.recv_timeout(timeout + phrase_limit + LISTEN_GRACE) {
            Ok(line) => line,
            Err(_) => {
                let _ = child.kill();
                String::new()
            }
        };
        let _ = child.wait();

        let trimmed = transcript.trim();
        if trimmed.is_empty() {
            Ok(None)
        } else {
            Ok(Some(trimmed.to_string()))
        }
    }

    fn speak(&mut self, text: &str) -> Result<()> {
        let status = Command::new(&self.speak_cmd[0])
            .args(&self.speak_cmd[1..])
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("failed to start speech output {:?}", self.speak_cmd[0]))?;
        if status.success() {
            Ok(())
        } else {
            Err(anyhow!("speech output exited with status {status}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(1);

    #[test]
    fn commands_are_split_shell_style() {
        let speech = SpeechProcess::new("recognize --model 'base en'", "say -v default")
            .expect("parse commands");
        assert_eq!(
            speech.listen_cmd,
            vec!["recognize", "--model", "base en"]
        );
        assert_eq!(speech.speak_cmd, vec!["say", "-v", "default"]);
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(SpeechProcess::new("", "say").is_err());
        assert!(SpeechProcess::new("recognize", "  ").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn listen_returns_the_transcript_line() {
        let mut speech =
            SpeechProcess::new("sh -c 'echo open chrome'", "true").expect("parse commands");
        let transcript = speech
            .listen("en-US", WINDOW, WINDOW)
            .expect("listen cycle");
        assert_eq!(transcript.as_deref(), Some("open chrome"));
    }

    #[cfg(unix)]
    #[test]
    fn silent_cycle_yields_none() {
        let mut speech = SpeechProcess::new("true", "true").expect("parse commands");
        let transcript = speech
            .listen("en-US", WINDOW, WINDOW)
            .expect("listen cycle");
        assert_eq!(transcript, None);
    }

    #[cfg(unix)]
    #[test]
    fn speak_surfaces_nonzero_exit() {
        let mut ok = SpeechProcess::new("true", "true").expect("parse commands");
        assert!(ok.speak("hello").is_ok());

        let mut failing = SpeechProcess::new("true", "false").expect("parse commands");
        assert!(failing.speak("hello").is_err());
    }
}
