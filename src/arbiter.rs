//! Sole bus consumer: priority arbitration and injection dispatch.
//!
//! One task drains the bus and makes every injection-sink call, so cursor,
//! click, and scroll synthesis can never interleave across modalities.
//! Priority (voice > gesture > eye) is a handling rule, not bus-level
//! preemption: a voice exit stops the loop immediately without draining the
//! events queued behind it. Pointer traffic vastly outnumbers voice and
//! click events, which is what makes arrival-order consumption an acceptable
//! stand-in for strict priority.

use std::sync::Arc;
use std::time::Duration;

use crate::event::{BusPoll, EventConsumer, EventKind, SemanticEvent, Source};
use crate::session::SessionContext;
use crate::sink::InputSink;
use crate::telemetry::log_event;
use crate::voice::{CommandExecutor, CommandOutcome};

/// Consume timeout; short so the shutdown flag is re-polled promptly.
const BUS_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// The dispatcher task. Owns the sink and the command executor for the whole
/// session.
pub struct Arbiter<S: InputSink> {
    ctx: Arc<SessionContext>,
    events: EventConsumer,
    sink: S,
    executor: CommandExecutor,
}

impl<S: InputSink> Arbiter<S> {
    pub fn new(
        ctx: Arc<SessionContext>,
        events: EventConsumer,
        sink: S,
        executor: CommandExecutor,
    ) -> Self {
        Self {
            ctx,
            events,
            sink,
            executor,
        }
    }

    /// Runs until shutdown is requested or every publisher is gone.
    pub fn run(&mut self) {
        log_event("module-start", "arbiter");
        loop {
            if self.ctx.shutdown_requested() {
                break;
            }
            match self.events.consume(BUS_POLL) {
                BusPoll::Idle => continue,
                BusPoll::Disconnected => break,
                BusPoll::Event(event) => {
                    if self.handle(event) == Flow::Exit {
                        self.ctx.request_shutdown();
                        break; // Queued events behind the exit are dropped.
                    }
                }
            }
        }
        self.ctx.request_shutdown();
    }

    fn handle(&mut self, event: SemanticEvent) -> Flow {
        let source = event.source;
        match event.kind {
            EventKind::Command { text } => match self.executor.dispatch(&text) {
                CommandOutcome::ExitRequested => return Flow::Exit,
                CommandOutcome::Completed => {}
            },
            // Gesture and eye pointer moves are handled identically.
            EventKind::PointerMove { x, y } => {
                if let Err(err) = self.sink.move_cursor(x, y) {
                    self.report_injection_failure(source, &err);
                }
            }
            EventKind::Click { button } => match self.sink.click(button) {
                Ok(()) => log_event("click-fired", source.as_str()),
                Err(err) => self.report_injection_failure(source, &err),
            },
            EventKind::Scroll { amount } => match self.sink.scroll(amount) {
                Ok(()) => log_event("scroll-fired", source.as_str()),
                Err(err) => self.report_injection_failure(source, &err),
            },
        }
        Flow::Continue
    }

    /// A rejected injection surfaces a notice naming the failing modality;
    /// the other modalities keep running.
    fn report_injection_failure(&mut self, source: Source, err: &anyhow::Error) {
        tracing::warn!("{} injection failed: {err:#}", source.as_str());
        self.executor
            .announce(&format!("{} input failed", source.as_str()));
    }
}
