//! Landmark frame data model shared with the external perception process.
//!
//! The perception collaborator owns the camera and the ML models; this crate
//! only sees its output. Frames arrive as newline-delimited JSON, one object
//! per tick, with every point normalized to [0,1]² against the current frame
//! dimensions. A frame is consumed once and discarded.

use serde::{Deserialize, Serialize};

/// A single normalized 2D landmark in [0,1]² frame space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    /// Distance between two normalized points, measured in camera pixels.
    pub fn distance_px(self, other: Point, width: f32, height: f32) -> f32 {
        let dx = (self.x - other.x) * width;
        let dy = (self.y - other.y) * height;
        dx.hypot(dy)
    }
}

/// Handedness label assigned by the perception model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandSide {
    Left,
    Right,
}

// Named hand landmark indices (MediaPipe hand skeleton convention).
pub const THUMB_TIP: usize = 4;
pub const INDEX_PIP: usize = 6;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_TIP: usize = 12;

/// Points in a complete hand skeleton.
pub const HAND_POINTS: usize = 21;

/// One detected hand: a side tag plus up to [`HAND_POINTS`] named points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hand {
    pub side: HandSide,
    pub points: Vec<Point>,
}

impl Hand {
    /// Returns a named landmark, or `None` when the model sent a truncated
    /// skeleton this tick.
    pub fn point(&self, index: usize) -> Option<Point> {
        self.points.get(index).copied()
    }
}

/// Iris landmarks for one face: four points per eye at fixed indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub left_iris: [Point; 4],
    pub right_iris: [Point; 4],
}

/// One perception tick: frame dimensions plus whatever was detected.
///
/// Zero hands and no face is a valid frame; it simply produces no events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub hands: Vec<Hand>,
    #[serde(default)]
    pub face: Option<Face>,
}

impl LandmarkFrame {
    /// First hand carrying the requested side tag, if any.
    pub fn hand(&self, side: HandSide) -> Option<&Hand> {
        self.hands.iter().find(|hand| hand.side == side)
    }
}
