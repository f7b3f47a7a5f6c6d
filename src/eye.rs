//! Gaze conditioning: iris centroids, calibration remap, sensitivity, and
//! smoothing into pointer moves.
//!
//! The pipeline per frame is centroid → remap → sensitivity → ring-buffer
//! mean → screen pixels. Remap and sensitivity widen the usable range of
//! small eye movements; the moving average stabilizes the inherently noisy
//! gaze signal at the cost of up to one window of lag.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::event::{EventKind, EventPublisher, Source};
use crate::landmark::{Face, LandmarkFrame, Point};
use crate::perception::{FrameSource, SOURCE_RETRY_BACKOFF};
use crate::profile::{CalibrationBounds, Profile};
use crate::session::{ScreenSize, SessionContext};
use crate::telemetry::log_event;

/// Fixed-capacity moving-average buffer with running sums.
///
/// Push and evict are O(1); the mean reads the running sums rather than
/// walking the window. Sums are f64 so eviction arithmetic cannot drift at
/// pixel scale.
pub struct SmoothingBuffer {
    window: VecDeque<(f32, f32)>,
    sum_x: f64,
    sum_y: f64,
    capacity: usize,
}

impl SmoothingBuffer {
    /// Capacity is clamped to at least one sample.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            sum_x: 0.0,
            sum_y: 0.0,
            capacity,
        }
    }

    pub fn push(&mut self, x: f32, y: f32) {
        if self.window.len() == self.capacity {
            if let Some((old_x, old_y)) = self.window.pop_front() {
                self.sum_x -= f64::from(old_x);
                self.sum_y -= f64::from(old_y);
            }
        }
        self.window.push_back((x, y));
        self.sum_x += f64::from(x);
        self.sum_y += f64::from(y);
    }

    pub fn mean(&self) -> Option<(f32, f32)> {
        if self.window.is_empty() {
            return None;
        }
        let len = self.window.len() as f64;
        Some(((self.sum_x / len) as f32, (self.sum_y / len) as f32))
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

/// Raw normalized gaze for one face: the midpoint of the two iris centroids.
pub fn raw_gaze(face: &Face) -> (f32, f32) {
    let left = centroid(&face.left_iris);
    let right = centroid(&face.right_iris);
    ((left.0 + right.0) / 2.0, (left.1 + right.1) / 2.0)
}

fn centroid(points: &[Point; 4]) -> (f32, f32) {
    let sum = points.iter().fold((0.0f32, 0.0f32), |acc, point| {
        (acc.0 + point.x, acc.1 + point.y)
    });
    (sum.0 / 4.0, sum.1 / 4.0)
}

/// Calibration remap plus sensitivity, applied to raw normalized gaze.
#[derive(Debug, Clone, Copy)]
pub struct GazeFilter {
    bounds: Option<CalibrationBounds>,
    sensitivity: f32,
}

impl GazeFilter {
    pub fn new(bounds: Option<CalibrationBounds>, sensitivity: f32) -> Self {
        Self {
            bounds,
            sensitivity,
        }
    }

    /// Conditions one sample; output is always inside [0,1]².
    ///
    /// Each axis remaps independently and only when its bounds are widening
    /// (max > min); degenerate bounds pass the raw value through.
    pub fn condition(&self, raw: (f32, f32)) -> (f32, f32) {
        let (mut x, mut y) = raw;
        if let Some(bounds) = self.bounds {
            if bounds.max_x > bounds.min_x {
                x = (x - bounds.min_x) / (bounds.max_x - bounds.min_x);
            }
            if bounds.max_y > bounds.min_y {
                y = (y - bounds.min_y) / (bounds.max_y - bounds.min_y);
            }
        }
        x = x.clamp(0.0, 1.0);
        y = y.clamp(0.0, 1.0);

        let x = ((x - 0.5) * self.sensitivity + 0.5).clamp(0.0, 1.0);
        let y = ((y - 0.5) * self.sensitivity + 0.5).clamp(0.0, 1.0);
        (x, y)
    }
}

/// Per-processor eye state: the filter plus the smoothing window.
pub struct EyeProcessor {
    filter: GazeFilter,
    smoothing: SmoothingBuffer,
    screen: ScreenSize,
}

impl EyeProcessor {
    pub fn new(filter: GazeFilter, smoothing_window: usize, screen: ScreenSize) -> Self {
        Self {
            filter,
            smoothing: SmoothingBuffer::new(smoothing_window),
            screen,
        }
    }

    pub fn from_profile(profile: &Profile, screen: ScreenSize) -> Self {
        Self::new(
            GazeFilter::new(profile.calibration, profile.eye_sensitivity),
            profile.eye_smoothing_window,
            screen,
        )
    }

    /// Smoothed pointer target for one frame; `None` without a face.
    pub fn process(&mut self, frame: &LandmarkFrame) -> Option<EventKind> {
        let face = frame.face.as_ref()?;
        let (x, y) = self.filter.condition(raw_gaze(face));
        self.smoothing.push(x, y);
        let (mean_x, mean_y) = self.smoothing.mean()?;
        Some(EventKind::PointerMove {
            x: (mean_x * self.screen.width as f32) as i32,
            y: (mean_y * self.screen.height as f32) as i32,
        })
    }
}

/// Thread body for the eye modality.
pub fn run_eye_loop(
    ctx: Arc<SessionContext>,
    mut frames: Box<dyn FrameSource>,
    bus: EventPublisher,
) {
    log_event("module-start", "eye");
    let mut processor = EyeProcessor::from_profile(&ctx.profile, ctx.screen);

    while !ctx.shutdown_requested() {
        let frame = match frames.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(err) => {
                tracing::debug!("eye frame acquisition failed: {err:#}");
                std::thread::sleep(SOURCE_RETRY_BACKOFF);
                continue;
            }
        };
        if let Some(kind) = processor.process(&frame) {
            if !bus.publish(Source::Eye, kind) {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SCREEN: ScreenSize = ScreenSize {
        width: 1920,
        height: 1080,
    };

    fn face_at(x: f32, y: f32) -> Face {
        // All iris points coincident, so both centroids sit on the gaze
        // point itself.
        let point = Point { x, y };
        Face {
            left_iris: [point; 4],
            right_iris: [point; 4],
        }
    }

    fn frame_with_face(x: f32, y: f32) -> LandmarkFrame {
        LandmarkFrame {
            width: 640,
            height: 480,
            hands: Vec::new(),
            face: Some(face_at(x, y)),
        }
    }

    fn faceless_frame() -> LandmarkFrame {
        LandmarkFrame {
            width: 640,
            height: 480,
            hands: Vec::new(),
            face: None,
        }
    }

    #[test]
    fn no_face_means_no_events_for_all_frames() {
        let mut processor = EyeProcessor::new(GazeFilter::new(None, 1.0), 5, SCREEN);
        for _ in 0..50 {
            assert!(processor.process(&faceless_frame()).is_none());
        }
    }

    #[test]
    fn gaze_point_is_the_midpoint_of_both_iris_centroids() {
        let face = Face {
            left_iris: [
                Point { x: 0.1, y: 0.2 },
                Point { x: 0.3, y: 0.2 },
                Point { x: 0.1, y: 0.4 },
                Point { x: 0.3, y: 0.4 },
            ],
            right_iris: [Point { x: 0.7, y: 0.3 }; 4],
        };
        let (x, y) = raw_gaze(&face);
        assert!((x - 0.45).abs() < 1e-6);
        assert!((y - 0.3).abs() < 1e-6);
    }

    #[test]
    fn calibration_remap_hits_the_fixed_points() {
        let filter = GazeFilter::new(
            Some(CalibrationBounds {
                min_x: 0.2,
                max_x: 0.8,
                min_y: 0.1,
                max_y: 0.9,
            }),
            1.0,
        );
        let (cx, cy) = filter.condition((0.5, 0.5));
        assert!((cx - 0.5).abs() < 1e-6 && (cy - 0.5).abs() < 1e-6);
        assert_eq!(filter.condition((0.2, 0.1)), (0.0, 0.0));
        assert_eq!(filter.condition((0.8, 0.9)), (1.0, 1.0));
    }

    #[test]
    fn degenerate_bounds_pass_the_axis_through() {
        let filter = GazeFilter::new(
            Some(CalibrationBounds {
                min_x: 0.4,
                max_x: 0.4, // collapsed axis
                min_y: 0.0,
                max_y: 0.5,
            }),
            1.0,
        );
        let (x, y) = filter.condition((0.3, 0.25));
        assert!((x - 0.3).abs() < 1e-6);
        assert!((y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn sensitivity_amplifies_deviation_and_clamps_at_edges() {
        let filter = GazeFilter::new(None, 2.0);
        assert_eq!(filter.condition((0.75, 0.5)), (1.0, 0.5));
        let (x, y) = filter.condition((0.4, 0.6));
        assert!((x - 0.3).abs() < 1e-6);
        assert!((y - 0.7).abs() < 1e-6);
    }

    #[test]
    fn smoothing_is_a_moving_average_without_overshoot() {
        let window = 5;
        let mut processor = EyeProcessor::new(GazeFilter::new(None, 1.0), window, SCREEN);

        // Settle on the left half of the screen first.
        for _ in 0..window {
            processor.process(&frame_with_face(0.2, 0.2));
        }
        // Step the gaze; the pointer must approach monotonically and land
        // exactly after N samples, never passing the target.
        let target_x = (0.8f32 * SCREEN.width as f32) as i32;
        let mut last_x = 0;
        for tick in 1..=window {
            let Some(EventKind::PointerMove { x, y: _ }) =
                processor.process(&frame_with_face(0.8, 0.2))
            else {
                panic!("face present but no pointer move");
            };
            assert!(x >= last_x, "tick {tick}: moving average reversed");
            assert!(x <= target_x, "tick {tick}: moving average overshot");
            last_x = x;
        }
        assert_eq!(last_x, target_x, "converged within one full window");
    }

    #[test]
    fn ring_buffer_evicts_oldest_and_keeps_running_sums_exact() {
        let mut buffer = SmoothingBuffer::new(3);
        for value in [1.0f32, 2.0, 3.0, 4.0] {
            buffer.push(value, value);
        }
        assert_eq!(buffer.len(), 3);
        let (x, y) = buffer.mean().expect("non-empty buffer");
        assert!((x - 3.0).abs() < 1e-6);
        assert!((y - 3.0).abs() < 1e-6);
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let mut buffer = SmoothingBuffer::new(0);
        buffer.push(0.25, 0.75);
        buffer.push(0.5, 0.5);
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.mean(), Some((0.5, 0.5)));
    }

    proptest! {
        // Conditioned gaze stays inside the unit square for any input and
        // any sane bounds/sensitivity.
        #[test]
        fn conditioned_gaze_is_always_normalized(
            raw_x in -1.0f32..2.0, raw_y in -1.0f32..2.0,
            min_x in 0.0f32..1.0, span_x in 0.0f32..1.0,
            min_y in 0.0f32..1.0, span_y in 0.0f32..1.0,
            sensitivity in 0.5f32..5.0,
        ) {
            let filter = GazeFilter::new(
                Some(CalibrationBounds {
                    min_x,
                    max_x: min_x + span_x,
                    min_y,
                    max_y: min_y + span_y,
                }),
                sensitivity,
            );
            let (x, y) = filter.condition((raw_x, raw_y));
            prop_assert!((0.0..=1.0).contains(&x));
            prop_assert!((0.0..=1.0).contains(&y));
        }

        // The moving average never leaves the envelope of its inputs.
        #[test]
        fn moving_average_stays_within_input_envelope(
            samples in proptest::collection::vec((0.0f32..1.0, 0.0f32..1.0), 1..32),
            capacity in 1usize..8,
        ) {
            let mut buffer = SmoothingBuffer::new(capacity);
            for (x, y) in &samples {
                buffer.push(*x, *y);
            }
            let (mean_x, _) = buffer.mean().expect("non-empty buffer");
            let lo = samples.iter().map(|(x, _)| *x).fold(f32::INFINITY, f32::min);
            let hi = samples.iter().map(|(x, _)| *x).fold(f32::NEG_INFINITY, f32::max);
            prop_assert!(mean_x >= lo - 1e-4 && mean_x <= hi + 1e-4);
        }
    }
}
