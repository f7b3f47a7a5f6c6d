//! Session context and top-level wiring of processors, bus, and arbiter.
//!
//! One context object carries everything the tasks share: the immutable
//! profile snapshot, the screen geometry, and the process-wide shutdown
//! flag. The flag is the only cancellation primitive; any task may set it
//! and every loop polls it at least once per iteration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};

use crate::arbiter::Arbiter;
use crate::event;
use crate::eye::run_eye_loop;
use crate::gesture::run_gesture_loop;
use crate::perception::FrameSource;
use crate::profile::Profile;
use crate::sink::InputSink;
use crate::voice::{run_voice_loop, CommandExecutor, VoiceProcessor};

/// Target screen geometry in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

/// State shared by every task in a session.
pub struct SessionContext {
    pub profile: Profile,
    pub screen: ScreenSize,
    shutdown: AtomicBool,
}

impl SessionContext {
    pub fn new(profile: Profile, screen: ScreenSize) -> Self {
        Self {
            profile,
            screen,
            shutdown: AtomicBool::new(false),
        }
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

/// Modality inputs assembled by the caller; absent entries are not run.
pub struct ModalityInputs {
    pub gesture_frames: Option<Box<dyn FrameSource>>,
    pub eye_frames: Option<Box<dyn FrameSource>>,
    pub voice: Option<VoiceProcessor>,
}

/// Runs one session to completion.
///
/// Spawns one thread per configured modality plus the arbiter on the calling
/// thread, then joins every processor before returning so device handles are
/// flushed on every exit path.
pub fn run_session<S: InputSink>(
    ctx: Arc<SessionContext>,
    inputs: ModalityInputs,
    sink: S,
    executor: CommandExecutor,
) -> Result<()> {
    let (publisher, consumer) = event::bus();
    let mut workers = Vec::new();

    if let Some(frames) = inputs.gesture_frames {
        let ctx = ctx.clone();
        let bus = publisher.clone();
        workers.push(
            thread::Builder::new()
                .name("gesture".to_string())
                .spawn(move || run_gesture_loop(ctx, frames, bus))
                .context("failed to spawn gesture thread")?,
        );
    }
    if let Some(frames) = inputs.eye_frames {
        let ctx = ctx.clone();
        let bus = publisher.clone();
        workers.push(
            thread::Builder::new()
                .name("eye".to_string())
                .spawn(move || run_eye_loop(ctx, frames, bus))
                .context("failed to spawn eye thread")?,
        );
    }
    if let Some(processor) = inputs.voice {
        let ctx = ctx.clone();
        let bus = publisher.clone();
        workers.push(
            thread::Builder::new()
                .name("voice".to_string())
                .spawn(move || run_voice_loop(ctx, processor, bus))
                .context("failed to spawn voice thread")?,
        );
    }

    // The arbiter holds the only consumer; dropping our publisher clone
    // means the bus disconnects once every processor has stopped.
    drop(publisher);

    let mut arbiter = Arbiter::new(ctx.clone(), consumer, sink, executor);
    arbiter.run();

    // Arbiter stopped (exit command, stop signal, or dead bus): make sure
    // every processor loop sees the flag, then wait for their devices to be
    // released.
    ctx.request_shutdown();
    for worker in workers {
        let _ = worker.join();
    }
    Ok(())
}
