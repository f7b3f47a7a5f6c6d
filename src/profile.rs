//! Profile documents: the per-session configuration snapshot and its store.
//!
//! A profile is resolved once at startup and read-only for the rest of the
//! session. The on-disk document holds a `default` profile plus named
//! overrides; lookups for unknown names fall back to the default. Unknown
//! keys are ignored and missing keys take defaults, so older documents keep
//! loading across releases.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PROFILE: &str = "default";
const PROFILE_FILE: &str = "profiles.json";
const CONFIG_DIR_ENV: &str = "HANDSFREE_CONFIG_DIR";

/// Raw gaze bounds captured by calibration, normalized [0,1] per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

/// Immutable tunables for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Speech language tag, e.g. "en-US" or "hi-IN".
    pub language: String,
    /// Pinch distance threshold in camera pixels.
    pub click_threshold_px: f32,
    /// Debounce window between accepted clicks.
    pub click_cooldown_secs: f32,
    /// Gain applied to continuous-scroll fingertip motion.
    pub scroll_scale: f32,
    /// Gaze smoothing window length; always at least 1.
    pub eye_smoothing_window: usize,
    /// Amplifies gaze deviation from center so small eye motion reaches
    /// screen edges.
    pub eye_sensitivity: f32,
    /// Calibration bounds; absent until the calibration subroutine succeeds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibration: Option<CalibrationBounds>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            click_threshold_px: 30.0,
            click_cooldown_secs: 0.5,
            scroll_scale: 2.0,
            eye_smoothing_window: 5,
            eye_sensitivity: 2.0,
            calibration: None,
        }
    }
}

impl Profile {
    /// Base language key used to select a command table ("hi-IN" → "hi").
    pub fn base_language(&self) -> &str {
        self.language.split('-').next().unwrap_or("en")
    }

    /// Clamps out-of-range values from hand-edited documents.
    pub fn sanitized(mut self) -> Self {
        self.eye_smoothing_window = self.eye_smoothing_window.max(1);
        self.eye_sensitivity = self.eye_sensitivity.clamp(0.5, 5.0);
        self.click_cooldown_secs = self.click_cooldown_secs.max(0.0);
        self
    }
}

/// External configuration provider seam.
pub trait ProfileStore {
    /// Resolves a profile, falling back to the default profile when the name
    /// is unknown.
    fn get(&self, name: &str) -> Result<Profile>;
    /// Persists a profile (used to save calibration bounds).
    fn set(&self, name: &str, profile: &Profile) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ProfileDocument {
    default: Profile,
    profiles: BTreeMap<String, Profile>,
}

/// JSON-backed store at `$HANDSFREE_CONFIG_DIR/profiles.json`, defaulting to
/// the platform config directory.
pub struct JsonProfileStore {
    path: PathBuf,
}

impl JsonProfileStore {
    /// Store at the default location. An unresolvable config directory is a
    /// fatal startup condition: no session runs without a snapshot.
    pub fn open_default() -> Result<Self> {
        let path = profile_file_path().context("cannot resolve profile store location")?;
        Ok(Self { path })
    }

    /// Store at an explicit path.
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    fn load(&self) -> Result<ProfileDocument> {
        if !self.path.exists() {
            return Ok(ProfileDocument::default());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read profile store {}", self.path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("profile store {} is unreadable", self.path.display()))
    }
}

impl ProfileStore for JsonProfileStore {
    fn get(&self, name: &str) -> Result<Profile> {
        let document = self.load()?;
        let profile = document
            .profiles
            .get(name)
            .cloned()
            .unwrap_or(document.default);
        Ok(profile.sanitized())
    }

    fn set(&self, name: &str, profile: &Profile) -> Result<()> {
        let mut document = self.load()?;
        if name == DEFAULT_PROFILE {
            document.default = profile.clone();
        } else {
            document.profiles.insert(name.to_string(), profile.clone());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create config directory {}", parent.display())
            })?;
        }
        let body = serde_json::to_string_pretty(&document).context("serialize profile store")?;
        fs::write(&self.path, body)
            .with_context(|| format!("failed to write profile store {}", self.path.display()))
    }
}

fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = env::var(CONFIG_DIR_ENV) {
        let trimmed = dir.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    dirs::config_dir().map(|dir| dir.join("handsfree"))
}

fn profile_file_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(PROFILE_FILE))
}
