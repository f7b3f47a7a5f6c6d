//! Hand-gesture interpretation: pointer moves, pinch clicks, continuous
//! scroll.
//!
//! The decision logic lives in [`GestureProcessor::process`], a pure state
//! machine over landmark frames and explicit timestamps, so debounce and
//! scroll behavior test without a camera. The thread body wraps it with
//! acquisition and publishing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::event::{Button, EventKind, EventPublisher, Source};
use crate::landmark::{
    HandSide, LandmarkFrame, Point, INDEX_PIP, INDEX_TIP, MIDDLE_PIP, MIDDLE_TIP, THUMB_TIP,
};
use crate::perception::{FrameSource, SOURCE_RETRY_BACKOFF};
use crate::profile::Profile;
use crate::session::{ScreenSize, SessionContext};
use crate::telemetry::log_event;

/// Tunables the gesture processor reads from the profile snapshot.
#[derive(Debug, Clone, Copy)]
pub struct GestureSettings {
    pub click_threshold_px: f32,
    pub click_cooldown: Duration,
    pub scroll_scale: f32,
}

impl GestureSettings {
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            click_threshold_px: profile.click_threshold_px,
            click_cooldown: Duration::from_secs_f32(profile.click_cooldown_secs),
            scroll_scale: profile.scroll_scale,
        }
    }
}

/// Per-processor gesture state.
///
/// `scroll_anchor_y` doubles as the scroll-active flag; it is cleared
/// whenever a competing gesture activates.
pub struct GestureProcessor {
    settings: GestureSettings,
    screen: ScreenSize,
    last_click: Option<Instant>,
    scroll_anchor_y: Option<f32>,
}

impl GestureProcessor {
    pub fn new(settings: GestureSettings, screen: ScreenSize) -> Self {
        Self {
            settings,
            screen,
            last_click: None,
            scroll_anchor_y: None,
        }
    }

    /// Interprets one landmark frame at time `now`.
    ///
    /// The right hand drives the pointer directly (no smoothing, lowest
    /// latency); the left hand produces at most one click/scroll action per
    /// frame. No hands means no events. Missing skeleton points skip the
    /// affected hand for this tick.
    pub fn process(&mut self, frame: &LandmarkFrame, now: Instant) -> Vec<EventKind> {
        let mut events = Vec::new();

        if let Some(right) = frame.hand(HandSide::Right) {
            if let Some(tip) = right.point(INDEX_TIP) {
                events.push(EventKind::PointerMove {
                    x: (tip.x * self.screen.width as f32) as i32,
                    y: (tip.y * self.screen.height as f32) as i32,
                });
            }
        }

        if let Some(left) = frame.hand(HandSide::Left) {
            if let Some(action) = self.left_hand_action(left, frame, now) {
                events.push(action);
            }
        }

        events
    }

    fn left_hand_action(
        &mut self,
        hand: &crate::landmark::Hand,
        frame: &LandmarkFrame,
        now: Instant,
    ) -> Option<EventKind> {
        let thumb = hand.point(THUMB_TIP)?;
        let index = hand.point(INDEX_TIP)?;
        let middle = hand.point(MIDDLE_TIP)?;
        let index_pip = hand.point(INDEX_PIP)?;
        let middle_pip = hand.point(MIDDLE_PIP)?;
        let (width, height) = (frame.width as f32, frame.height as f32);

        if self.is_pinch(thumb, index, width, height) && self.cooldown_elapsed(now) {
            self.register_click(now);
            return Some(EventKind::Click {
                button: Button::Left,
            });
        }
        if self.is_pinch(thumb, middle, width, height) && self.cooldown_elapsed(now) {
            self.register_click(now);
            return Some(EventKind::Click {
                button: Button::Right,
            });
        }
        // Index and middle extended (tips above their pip joints) holds the
        // continuous-scroll pose.
        if index.y < index_pip.y && middle.y < middle_pip.y {
            return self.scroll_step(index.y * height);
        }

        self.scroll_anchor_y = None;
        None
    }

    fn is_pinch(&self, a: Point, b: Point, width: f32, height: f32) -> bool {
        a.distance_px(b, width, height) < self.settings.click_threshold_px
    }

    fn cooldown_elapsed(&self, now: Instant) -> bool {
        self.last_click
            .map_or(true, |at| now.duration_since(at) > self.settings.click_cooldown)
    }

    fn register_click(&mut self, now: Instant) {
        self.last_click = Some(now);
        self.scroll_anchor_y = None;
    }

    fn scroll_step(&mut self, current_y: f32) -> Option<EventKind> {
        let Some(anchor_y) = self.scroll_anchor_y else {
            // First qualifying frame only records where the gesture started.
            self.scroll_anchor_y = Some(current_y);
            return None;
        };
        let amount = ((anchor_y - current_y) * self.settings.scroll_scale) as i32;
        if amount == 0 {
            // Sub-unit motion keeps accumulating against the old anchor.
            return None;
        }
        self.scroll_anchor_y = Some(current_y);
        Some(EventKind::Scroll { amount })
    }
}

/// Thread body for the gesture modality.
pub fn run_gesture_loop(
    ctx: Arc<SessionContext>,
    mut frames: Box<dyn FrameSource>,
    bus: EventPublisher,
) {
    log_event("module-start", "gesture");
    let mut processor = GestureProcessor::new(GestureSettings::from_profile(&ctx.profile), ctx.screen);

    while !ctx.shutdown_requested() {
        let frame = match frames.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(err) => {
                tracing::debug!("gesture frame acquisition failed: {err:#}");
                std::thread::sleep(SOURCE_RETRY_BACKOFF);
                continue;
            }
        };
        for kind in processor.process(&frame, Instant::now()) {
            if !bus.publish(Source::Gesture, kind) {
                return; // Arbiter is gone; the session is over.
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::{Hand, HAND_POINTS};
    use proptest::prelude::*;

    const SCREEN: ScreenSize = ScreenSize {
        width: 1920,
        height: 1080,
    };

    fn settings() -> GestureSettings {
        GestureSettings {
            click_threshold_px: 30.0,
            click_cooldown: Duration::from_millis(500),
            scroll_scale: 2.0,
        }
    }

    fn processor() -> GestureProcessor {
        GestureProcessor::new(settings(), SCREEN)
    }

    fn neutral_hand(side: HandSide) -> Hand {
        // A spread hand: thumb far from both fingertips, fingers curled
        // (tips below pips), so no branch fires.
        let mut points = vec![Point { x: 0.5, y: 0.5 }; HAND_POINTS];
        points[THUMB_TIP] = Point { x: 0.1, y: 0.9 };
        points[INDEX_TIP] = Point { x: 0.5, y: 0.6 };
        points[INDEX_PIP] = Point { x: 0.5, y: 0.5 };
        points[MIDDLE_TIP] = Point { x: 0.6, y: 0.6 };
        points[MIDDLE_PIP] = Point { x: 0.6, y: 0.5 };
        Hand { side, points }
    }

    fn frame_with(hands: Vec<Hand>) -> LandmarkFrame {
        LandmarkFrame {
            width: 640,
            height: 480,
            hands,
            face: None,
        }
    }

    fn pinch_hand(fingertip: usize) -> Hand {
        let mut hand = neutral_hand(HandSide::Left);
        hand.points[THUMB_TIP] = Point { x: 0.5, y: 0.5 };
        hand.points[fingertip] = Point { x: 0.5, y: 0.5 };
        hand
    }

    fn scroll_hand(index_y: f32) -> Hand {
        let mut hand = neutral_hand(HandSide::Left);
        hand.points[INDEX_TIP] = Point { x: 0.5, y: index_y };
        hand.points[INDEX_PIP] = Point { x: 0.5, y: index_y + 0.2 };
        hand.points[MIDDLE_TIP] = Point { x: 0.6, y: index_y };
        hand.points[MIDDLE_PIP] = Point { x: 0.6, y: index_y + 0.2 };
        hand
    }

    #[test]
    fn no_hands_yield_no_events_for_all_frames() {
        let mut processor = processor();
        let now = Instant::now();
        for _ in 0..50 {
            assert!(processor.process(&frame_with(Vec::new()), now).is_empty());
        }
    }

    #[test]
    fn right_hand_maps_index_tip_to_screen_pixels() {
        let mut hand = neutral_hand(HandSide::Right);
        hand.points[INDEX_TIP] = Point { x: 0.5, y: 0.25 };
        let events = processor().process(&frame_with(vec![hand]), Instant::now());
        assert_eq!(events, vec![EventKind::PointerMove { x: 960, y: 270 }]);
    }

    #[test]
    fn thumb_index_pinch_clicks_left() {
        let events = processor().process(&frame_with(vec![pinch_hand(INDEX_TIP)]), Instant::now());
        assert_eq!(
            events,
            vec![EventKind::Click {
                button: Button::Left
            }]
        );
    }

    #[test]
    fn thumb_middle_pinch_clicks_right() {
        let events = processor().process(&frame_with(vec![pinch_hand(MIDDLE_TIP)]), Instant::now());
        assert_eq!(
            events,
            vec![EventKind::Click {
                button: Button::Right
            }]
        );
    }

    #[test]
    fn second_click_within_cooldown_is_ignored() {
        let mut processor = processor();
        let start = Instant::now();
        let frame = frame_with(vec![pinch_hand(INDEX_TIP)]);

        assert_eq!(processor.process(&frame, start).len(), 1);
        // Still inside the window, including a different pinch kind.
        assert!(processor
            .process(&frame, start + Duration::from_millis(200))
            .is_empty());
        assert!(processor
            .process(
                &frame_with(vec![pinch_hand(MIDDLE_TIP)]),
                start + Duration::from_millis(400)
            )
            .is_empty());
        // Past the window the next pinch lands.
        assert_eq!(
            processor
                .process(&frame, start + Duration::from_millis(701))
                .len(),
            1
        );
    }

    #[test]
    fn scroll_first_frame_records_anchor_without_emitting() {
        let mut processor = processor();
        let events = processor.process(&frame_with(vec![scroll_hand(0.5)]), Instant::now());
        assert!(events.is_empty());
        assert!(processor.scroll_anchor_y.is_some());
    }

    #[test]
    fn upward_motion_scrolls_positive_downward_negative() {
        let mut processor = processor();
        let now = Instant::now();
        processor.process(&frame_with(vec![scroll_hand(0.5)]), now);

        // Up in camera space is a smaller y: (0.5 − 0.4) × 480px × 2.0 = 96.
        let up = processor.process(&frame_with(vec![scroll_hand(0.4)]), now);
        assert_eq!(up, vec![EventKind::Scroll { amount: 96 }]);

        // The anchor moved to 0.4, so dropping to 0.6 is a −0.2 swing.
        let down = processor.process(&frame_with(vec![scroll_hand(0.6)]), now);
        assert_eq!(down, vec![EventKind::Scroll { amount: -192 }]);
    }

    #[test]
    fn sub_unit_scroll_motion_accumulates_against_the_anchor() {
        let mut processor = processor();
        let now = Instant::now();
        processor.process(&frame_with(vec![scroll_hand(0.5)]), now);

        // Each step is under half a scroll unit; nothing fires until the
        // distance from the original anchor crosses a whole unit.
        assert!(processor
            .process(&frame_with(vec![scroll_hand(0.4995)]), now)
            .is_empty());
        assert!(processor
            .process(&frame_with(vec![scroll_hand(0.4991)]), now)
            .is_empty());
        let events = processor.process(&frame_with(vec![scroll_hand(0.498)]), now);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn dropping_the_pose_clears_scroll_state() {
        let mut processor = processor();
        let now = Instant::now();
        processor.process(&frame_with(vec![scroll_hand(0.5)]), now);
        processor.process(&frame_with(vec![neutral_hand(HandSide::Left)]), now);
        assert!(processor.scroll_anchor_y.is_none());

        // Re-entering the pose starts from a fresh anchor.
        let events = processor.process(&frame_with(vec![scroll_hand(0.3)]), now);
        assert!(events.is_empty());
    }

    #[test]
    fn click_resets_an_active_scroll() {
        let mut processor = processor();
        let start = Instant::now();
        processor.process(&frame_with(vec![scroll_hand(0.5)]), start);
        processor.process(&frame_with(vec![pinch_hand(INDEX_TIP)]), start);
        assert!(processor.scroll_anchor_y.is_none());
    }

    #[test]
    fn truncated_left_skeleton_skips_the_tick() {
        let hand = Hand {
            side: HandSide::Left,
            points: vec![Point::default(); 5], // thumb present, index tip missing
        };
        let events = processor().process(&frame_with(vec![hand]), Instant::now());
        assert!(events.is_empty());
    }

    #[test]
    fn both_hands_emit_move_and_click_in_one_tick() {
        let mut right = neutral_hand(HandSide::Right);
        right.points[INDEX_TIP] = Point { x: 0.1, y: 0.1 };
        let events = processor().process(
            &frame_with(vec![right, pinch_hand(INDEX_TIP)]),
            Instant::now(),
        );
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], EventKind::PointerMove { .. }));
        assert!(matches!(events[1], EventKind::Click { .. }));
    }

    proptest! {
        // Pinch verdicts are symmetric in their landmark arguments.
        #[test]
        fn pinch_check_is_symmetric(
            ax in 0.0f32..1.0, ay in 0.0f32..1.0,
            bx in 0.0f32..1.0, by in 0.0f32..1.0,
        ) {
            let processor = processor();
            let a = Point { x: ax, y: ay };
            let b = Point { x: bx, y: by };
            prop_assert_eq!(
                processor.is_pinch(a, b, 640.0, 480.0),
                processor.is_pinch(b, a, 640.0, 480.0)
            );
        }
    }
}
