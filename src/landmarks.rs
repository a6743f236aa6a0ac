//! Hand landmark frames as delivered by the external tracker.

use serde::{Deserialize, Serialize};

use crate::capture::Slot;
use crate::error::EngineError;

pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_MCP: usize = 2;
pub const THUMB_TIP: usize = 4;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_TIP: usize = 12;
pub const RING_TIP: usize = 16;
pub const PINKY_TIP: usize = 20;

/// Tips of the four non-thumb fingers, index first.
pub const FINGER_TIPS: [usize; 4] = [INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];

/// One tracked joint, normalized to the frame (y grows downwards).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Planar distance; depth is ignored.
    pub fn distance_2d(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame {
    points: [Landmark; LANDMARK_COUNT],
}

impl LandmarkFrame {
    pub fn new(points: [Landmark; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    pub fn point(&self, idx: usize) -> &Landmark {
        &self.points[idx]
    }

    pub fn points(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.points
    }
}

impl TryFrom<Vec<Landmark>> for LandmarkFrame {
    type Error = EngineError;

    fn try_from(v: Vec<Landmark>) -> Result<Self, Self::Error> {
        let got = v.len();
        let points: [Landmark; LANDMARK_COUNT] = v
            .try_into()
            .map_err(|_| EngineError::InvalidFrame { got })?;
        Ok(Self { points })
    }
}

/// What the tracker produced for one sampling tick.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameInput {
    Hand(LandmarkFrame),
    NoHand,
}

/// One line of the JSON frame stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameMessage {
    #[serde(default)]
    pub t_ms: Option<u64>,
    #[serde(default)]
    pub landmarks: Option<Vec<Landmark>>,
    /// In-band manual capture request, applied after this frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture: Option<Slot>,
}

impl FrameMessage {
    pub fn parse(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_point_count() {
        let err = LandmarkFrame::try_from(vec![Landmark::default(); 20]).unwrap_err();
        assert_eq!(err, EngineError::InvalidFrame { got: 20 });
    }

    #[test]
    fn accepts_exactly_twenty_one_points() {
        let frame = LandmarkFrame::try_from(vec![Landmark::new(0.5, 0.5); 21]).unwrap();
        assert_eq!(frame.point(WRIST).x, 0.5);
    }

    #[test]
    fn parses_message_without_depth_or_hand() {
        let msg = FrameMessage::parse(r#"{"t_ms": 40, "landmarks": null}"#).unwrap();
        assert_eq!(msg.t_ms, Some(40));
        assert!(msg.landmarks.is_none());
        assert!(msg.capture.is_none());

        let msg = FrameMessage::parse(r#"{"landmarks": [{"x": 0.1, "y": 0.2}]}"#).unwrap();
        let pts = msg.landmarks.unwrap();
        assert_eq!(pts[0], Landmark { x: 0.1, y: 0.2, z: 0.0 });
    }

    #[test]
    fn parses_in_band_capture_request() {
        let msg = FrameMessage::parse(r#"{"landmarks": null, "capture": "operator"}"#).unwrap();
        assert_eq!(msg.capture, Some(Slot::Operator));
    }
}
