//! Semantic events and the bus connecting modality processors to the arbiter.
//!
//! Every processor publishes tagged events onto one shared channel; the
//! arbiter is the sole consumer. Publishing never blocks and never drops —
//! a lost click must never happen — so the bus is an unbounded channel.
//! Cross-source ordering is arrival order only; priority is a handling rule
//! applied by the arbiter, not a property of the bus.

use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

/// Modality that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Voice,
    Gesture,
    Eye,
}

impl Source {
    /// Label used in notices and event records.
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Voice => "voice",
            Source::Gesture => "gesture",
            Source::Eye => "eye",
        }
    }
}

/// Pointer button for click requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Left,
    Right,
}

impl Button {
    pub fn as_str(self) -> &'static str {
        match self {
            Button::Left => "left",
            Button::Right => "right",
        }
    }
}

/// Action requested of the injection sink (or, for commands, the executor).
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// Absolute cursor placement in screen pixels.
    PointerMove { x: i32, y: i32 },
    /// Synthesize a click.
    Click { button: Button },
    /// Synthesize a scroll tick; positive scrolls up/away.
    Scroll { amount: i32 },
    /// Normalized voice transcript for the command executor.
    Command { text: String },
}

/// One bus entry; immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticEvent {
    pub source: Source,
    pub kind: EventKind,
}

/// Creates the session bus. Processors hold clones of the publisher; the
/// arbiter owns the single consumer.
pub fn bus() -> (EventPublisher, EventConsumer) {
    let (tx, rx) = unbounded();
    (EventPublisher { tx }, EventConsumer { rx })
}

/// Producer half of the bus.
#[derive(Clone)]
pub struct EventPublisher {
    tx: Sender<SemanticEvent>,
}

impl EventPublisher {
    /// Publishes one event; never blocks. Returns `false` once the consumer
    /// is gone, which tells a processor loop the session is over.
    pub fn publish(&self, source: Source, kind: EventKind) -> bool {
        self.tx.send(SemanticEvent { source, kind }).is_ok()
    }
}

/// Result of one consume poll.
#[derive(Debug)]
pub enum BusPoll {
    Event(SemanticEvent),
    /// Nothing arrived within the timeout; re-check the shutdown flag.
    Idle,
    /// Every publisher has been dropped.
    Disconnected,
}

/// Consumer half of the bus; owned exclusively by the arbiter.
pub struct EventConsumer {
    rx: Receiver<SemanticEvent>,
}

impl EventConsumer {
    /// Next event in arrival order, or an idle/disconnect indicator.
    pub fn consume(&self, timeout: Duration) -> BusPoll {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => BusPoll::Event(event),
            Err(RecvTimeoutError::Timeout) => BusPoll::Idle,
            Err(RecvTimeoutError::Disconnected) => BusPoll::Disconnected,
        }
    }
}
