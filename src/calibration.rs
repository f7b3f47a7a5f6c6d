//! Interactive 4-corner gaze calibration.
//!
//! Runs once, before the processors start, whenever the profile carries no
//! bounds (or recalibration is forced). The user fixates each screen corner
//! and confirms; bounds are the per-axis min/max of the captured raw gaze
//! points. Successful runs persist through the profile store so the session
//! snapshot stays immutable afterwards.

use anyhow::Result;

use crate::eye::raw_gaze;
use crate::perception::FrameSource;
use crate::profile::{CalibrationBounds, Profile, ProfileStore};

/// Corner prompts, in fixation order.
pub const CORNERS: [&str; 4] = ["top-left", "top-right", "bottom-right", "bottom-left"];

/// Frames to wait for a face after the user confirms a corner.
const SAMPLE_ATTEMPTS: usize = 100;

/// How the user answered a corner prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptResponse {
    /// Ready; capture this corner now.
    Capture,
    /// Skip this corner.
    Skip,
    /// Stop the whole procedure.
    Abort,
}

/// User-interaction seam so calibration drives from tests and any front end.
pub trait CalibrationPrompter {
    /// Ask the user to fixate on `corner` and wait for their answer.
    fn prompt(&mut self, corner: &str) -> Result<PromptResponse>;
    /// Surface a warning (skipped corner, abandoned run).
    fn warn(&mut self, message: &str);
}

/// Runs the corner sequence and derives bounds.
///
/// Fewer than two captured corners cannot span an axis, so the run is
/// abandoned: the user is warned, `None` is returned, and the caller leaves
/// the profile uncalibrated.
pub fn run_calibration(
    frames: &mut dyn FrameSource,
    prompter: &mut dyn CalibrationPrompter,
) -> Result<Option<CalibrationBounds>> {
    let mut captured: Vec<(f32, f32)> = Vec::new();

    for corner in CORNERS {
        match prompter.prompt(corner)? {
            PromptResponse::Capture => match sample_gaze(frames)? {
                Some(gaze) => captured.push(gaze),
                None => prompter.warn(&format!("no face detected for {corner}; corner skipped")),
            },
            PromptResponse::Skip => continue,
            PromptResponse::Abort => break,
        }
    }

    if captured.len() < 2 {
        prompter.warn("calibration abandoned: not enough corners captured");
        return Ok(None);
    }

    let mut bounds = CalibrationBounds {
        min_x: f32::INFINITY,
        max_x: f32::NEG_INFINITY,
        min_y: f32::INFINITY,
        max_y: f32::NEG_INFINITY,
    };
    for (x, y) in captured {
        bounds.min_x = bounds.min_x.min(x);
        bounds.max_x = bounds.max_x.max(x);
        bounds.min_y = bounds.min_y.min(y);
        bounds.max_y = bounds.max_y.max(y);
    }
    Ok(Some(bounds))
}

/// Ensures the profile carries bounds: runs calibration when they are
/// missing (or `force` is set) and persists success under `name`.
pub fn ensure_calibrated(
    store: &dyn ProfileStore,
    name: &str,
    profile: Profile,
    frames: &mut dyn FrameSource,
    prompter: &mut dyn CalibrationPrompter,
    force: bool,
) -> Result<Profile> {
    if profile.calibration.is_some() && !force {
        return Ok(profile);
    }
    let Some(bounds) = run_calibration(frames, prompter)? else {
        return Ok(profile);
    };
    tracing::info!(
        "gaze calibration saved: x [{:.3}, {:.3}], y [{:.3}, {:.3}]",
        bounds.min_x,
        bounds.max_x,
        bounds.min_y,
        bounds.max_y
    );
    let mut updated = profile;
    updated.calibration = Some(bounds);
    store.set(name, &updated)?;
    Ok(updated)
}

fn sample_gaze(frames: &mut dyn FrameSource) -> Result<Option<(f32, f32)>> {
    for _ in 0..SAMPLE_ATTEMPTS {
        let frame = match frames.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(err) => {
                tracing::debug!("calibration frame acquisition failed: {err:#}");
                continue;
            }
        };
        if let Some(face) = frame.face {
            return Ok(Some(raw_gaze(&face)));
        }
    }
    Ok(None)
}
