//! CLI configuration resolved once at startup.
//!
//! Flags select the profile and modality set and point at the external
//! collaborator commands. Profile values come from the store; CLI flags
//! override them for the session without being persisted.

use clap::{Parser, ValueEnum};

use crate::profile::DEFAULT_PROFILE;
use crate::session::ScreenSize;

/// Which modality set to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Mode {
    /// Voice commands only.
    Voice,
    /// Hand gestures only.
    Gesture,
    /// Gaze pointing only.
    Eye,
    /// All three modalities against one shared camera.
    #[default]
    Hybrid,
}

impl Mode {
    pub fn includes_gesture(self) -> bool {
        matches!(self, Mode::Gesture | Mode::Hybrid)
    }

    pub fn includes_eye(self) -> bool {
        matches!(self, Mode::Eye | Mode::Hybrid)
    }

    pub fn includes_voice(self) -> bool {
        matches!(self, Mode::Voice | Mode::Hybrid)
    }
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "handsfree",
    about = "Hands-free assistive input: voice, gesture, and gaze control",
    version
)]
pub struct AppConfig {
    /// Profile to load from the profile store
    #[arg(long, default_value = DEFAULT_PROFILE)]
    pub profile: String,

    /// Modalities to run
    #[arg(long, value_enum, default_value_t = Mode::Hybrid)]
    pub mode: Mode,

    /// Override the profile's speech language tag (e.g. en-US, hi-IN)
    #[arg(long)]
    pub language: Option<String>,

    /// Screen width in pixels
    #[arg(long, default_value_t = 1920)]
    pub screen_width: u32,

    /// Screen height in pixels
    #[arg(long, default_value_t = 1080)]
    pub screen_height: u32,

    /// Perception command emitting JSON landmark frames on stdout
    #[arg(
        long,
        env = "HANDSFREE_PERCEPTION_CMD",
        default_value = "handsfree-perception"
    )]
    pub perception_cmd: String,

    /// Recognizer command printing one transcript line per listen cycle
    #[arg(long, env = "HANDSFREE_LISTEN_CMD", default_value = "handsfree-listen")]
    pub listen_cmd: String,

    /// Text-to-speech command; receives the text as its final argument
    #[arg(long, env = "HANDSFREE_SPEAK_CMD", default_value = "handsfree-speak")]
    pub speak_cmd: String,

    /// Input injector command (xdotool-compatible)
    #[arg(long, env = "HANDSFREE_INJECT_CMD", default_value = "xdotool")]
    pub inject_cmd: String,

    /// Opener used for web-search results
    #[arg(long, default_value = "xdg-open")]
    pub opener_cmd: String,

    /// Redo gaze calibration even when the profile already has bounds
    #[arg(long)]
    pub calibrate: bool,

    /// Write structured event records to the event log
    #[arg(long)]
    pub logs: bool,

    /// Disable all event logging
    #[arg(long)]
    pub no_logs: bool,
}

impl AppConfig {
    pub fn screen(&self) -> ScreenSize {
        ScreenSize {
            width: self.screen_width,
            height: self.screen_height,
        }
    }
}
