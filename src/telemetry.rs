//! Structured advisory records for the observability sink.
//!
//! Records are `{timestamp, eventType, details}` JSON lines appended to a
//! local file. They are advisory only: nothing in the control loop depends
//! on them.

use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_subscriber::fmt::time::UtcTime;

use crate::config::AppConfig;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Where event records land; env override first, temp dir otherwise.
pub fn event_log_path() -> PathBuf {
    env::var("HANDSFREE_EVENT_LOG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("handsfree_events.jsonl"))
}

#[inline]
fn tracing_enabled(config: &AppConfig) -> bool {
    config.logs && !config.no_logs
}

fn init_tracing_once(config: &AppConfig, once: &OnceLock<()>) {
    if !tracing_enabled(config) {
        return;
    }

    let _ = once.get_or_init(|| {
        let path = event_log_path();
        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => file,
            Err(_) => return,
        };
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_timer(UtcTime::rfc_3339())
            .with_writer(file)
            .with_current_span(false)
            .with_span_list(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Install the JSON subscriber once per process when logging is enabled.
pub fn init_tracing(config: &AppConfig) {
    init_tracing_once(config, &TRACING_INIT);
}

/// Emit one advisory record (`module-start`, `command-recognized`,
/// `click-fired`, `scroll-fired`).
pub fn log_event(event_type: &str, details: &str) {
    tracing::info!(target: "handsfree::event", event_type, details);
}
