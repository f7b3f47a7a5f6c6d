//! Landmark frame acquisition from the external perception process.
//!
//! The perception collaborator owns the camera and the landmark models. The
//! default adapter spawns it as a child process and reads newline-delimited
//! JSON frames from its stdout; a reader thread feeds a bounded channel so
//! acquisition blocks only up to the device frame rate.

use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};

use crate::landmark::LandmarkFrame;
use crate::session::SessionContext;

/// How long one acquisition poll waits before reporting "no data this tick".
const FRAME_POLL: Duration = Duration::from_millis(50);
const FRAME_CHANNEL_CAPACITY: usize = 8;
/// Backoff between retries once a source reports an error.
pub(crate) const SOURCE_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Frame acquisition seam for the camera-based processors.
pub trait FrameSource: Send {
    /// Next frame, or `None` when nothing arrived this tick. Errors are
    /// recoverable: callers skip the tick and retry.
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>>;
}

/// Child process emitting one JSON landmark frame per line on stdout.
///
/// Dropping the handle kills and reaps the child, so the camera is released
/// on every exit path, including error exits.
pub struct PerceptionProcess {
    child: Child,
    frames: Receiver<LandmarkFrame>,
}

impl PerceptionProcess {
    pub fn spawn(command: &str) -> Result<Self> {
        let parts = shell_words::split(command)
            .with_context(|| format!("failed to parse perception command {command:?}"))?;
        if parts.is_empty() {
            return Err(anyhow!("perception command is empty"));
        }

        let mut child = Command::new(&parts[0])
            .args(&parts[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to start perception process {:?}", parts[0]))?;
        let stdout = child
            .stdout
            .take()
            .context("failed to capture perception stdout")?;

        let (tx, rx) = bounded(FRAME_CHANNEL_CAPACITY);
        thread::spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines().map_while(Result::ok) {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<LandmarkFrame>(trimmed) {
                    Ok(frame) => {
                        if tx.send(frame).is_err() {
                            break; // Consumer has exited.
                        }
                    }
                    Err(err) => tracing::debug!("discarding malformed frame: {err}"),
                }
            }
        });

        Ok(Self { child, frames: rx })
    }
}

impl FrameSource for PerceptionProcess {
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>> {
        match self.frames.recv_timeout(FRAME_POLL) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(anyhow!("perception process closed its frame stream"))
            }
        }
    }
}

impl Drop for PerceptionProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// One consumer's view of a shared camera (fused deployment).
pub struct FrameTap {
    rx: Receiver<LandmarkFrame>,
}

impl FrameSource for FrameTap {
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>> {
        match self.rx.recv_timeout(FRAME_POLL) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(anyhow!("shared frame reader stopped")),
        }
    }
}

/// Fused-deployment fan-out: a single reader thread owns the device handle
/// and copies each frame to both taps. Taps hold one frame; a consumer that
/// falls behind reads at most one buffered frame late, and newer frames are
/// dropped rather than blocking the other modality. Frames are per-tick
/// observations, so sampling them is safe — only bus events are lossless.
pub fn split_frames(
    mut source: impl FrameSource + 'static,
    ctx: Arc<SessionContext>,
) -> (FrameTap, FrameTap) {
    let (tx_a, rx_a) = bounded(1);
    let (tx_b, rx_b) = bounded(1);

    thread::spawn(move || {
        while !ctx.shutdown_requested() {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => continue,
                Err(err) => {
                    tracing::debug!("shared frame acquisition failed: {err:#}");
                    thread::sleep(SOURCE_RETRY_BACKOFF);
                    continue;
                }
            };
            let a_alive = offer(&tx_a, frame.clone());
            let b_alive = offer(&tx_b, frame);
            if !a_alive && !b_alive {
                break; // Both consumers are gone.
            }
        }
    });

    (FrameTap { rx: rx_a }, FrameTap { rx: rx_b })
}

fn offer(tx: &Sender<LandmarkFrame>, frame: LandmarkFrame) -> bool {
    match tx.try_send(frame) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => true,
        Err(TrySendError::Disconnected(_)) => false,
    }
}
