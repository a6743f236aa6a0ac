use serde::{Deserialize, Serialize};
use std::fmt;

use crate::evaluator::Operator;
use crate::landmarks::{FINGER_TIPS, FrameInput, INDEX_TIP, LandmarkFrame, THUMB_MCP, THUMB_TIP};

/// Geometric thresholds, in normalized frame units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierConfig {
    pub thumb_extension: f32,
    pub circle_distance: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            thumb_extension: 0.1,
            circle_distance: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorGesture {
    Circle,
    Rock,
    Victory,
    ThumbsUp,
}

impl OperatorGesture {
    pub fn operator(self) -> Operator {
        match self {
            OperatorGesture::Circle => Operator::Add,
            OperatorGesture::Rock => Operator::Subtract,
            OperatorGesture::Victory => Operator::Multiply,
            OperatorGesture::ThumbsUp => Operator::Divide,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperatorGesture::Circle => "circle",
            OperatorGesture::Rock => "rock",
            OperatorGesture::Victory => "victory",
            OperatorGesture::ThumbsUp => "thumbsup",
        }
    }
}

/// Per-frame classifier output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    None,
    Digit(u8),
    Operator(OperatorGesture),
}

impl Symbol {
    /// Digits usable as operands (1..=5).
    pub fn operand(self) -> Option<u8> {
        match self {
            Symbol::Digit(d) if d > 0 => Some(d),
            _ => None,
        }
    }

    pub fn operator(self) -> Option<Operator> {
        match self {
            Symbol::Operator(g) => Some(g.operator()),
            _ => None,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::None => f.write_str("none"),
            Symbol::Digit(d) => write!(f, "{d}"),
            Symbol::Operator(g) => f.write_str(g.as_str()),
        }
    }
}

impl Serialize for Symbol {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

/// Raw geometric readings for one hand, before precedence is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandPose {
    /// Index, middle, ring, pinky.
    pub extended: [bool; 4],
    pub thumb_extended: bool,
    pub thumb_up: bool,
    pub pinch_distance: f32,
}

impl HandPose {
    pub fn measure(frame: &LandmarkFrame, cfg: &ClassifierConfig) -> Self {
        let mut extended = [false; 4];
        for (slot, &tip) in extended.iter_mut().zip(FINGER_TIPS.iter()) {
            *slot = frame.point(tip).y < frame.point(tip - 2).y;
        }

        let thumb_tip = frame.point(THUMB_TIP);
        let thumb_mcp = frame.point(THUMB_MCP);
        let thumb_extended = (thumb_tip.x - thumb_mcp.x).abs() > cfg.thumb_extension;
        let thumb_up = thumb_extended && thumb_tip.y < thumb_mcp.y;

        Self {
            extended,
            thumb_extended,
            thumb_up,
            pinch_distance: thumb_tip.distance_2d(frame.point(INDEX_TIP)),
        }
    }

    fn fingers_curled(&self) -> bool {
        self.extended.iter().all(|e| !e)
    }

    pub fn finger_count(&self) -> u8 {
        let fingers = self.extended.iter().filter(|e| **e).count() as u8;
        fingers + u8::from(self.thumb_extended)
    }

    /// First match wins: circle, rock, victory, thumbs-up, then digit count.
    pub fn symbol(&self, cfg: &ClassifierConfig) -> Symbol {
        if self.pinch_distance < cfg.circle_distance {
            return Symbol::Operator(OperatorGesture::Circle);
        }
        if self.fingers_curled() && self.thumb_extended && !self.thumb_up {
            return Symbol::Operator(OperatorGesture::Rock);
        }
        let [index, middle, ring, pinky] = self.extended;
        if index && middle && !ring && !pinky && !self.thumb_extended {
            return Symbol::Operator(OperatorGesture::Victory);
        }
        if self.fingers_curled() && self.thumb_up {
            return Symbol::Operator(OperatorGesture::ThumbsUp);
        }
        Symbol::Digit(self.finger_count())
    }
}

pub fn classify(frame: &LandmarkFrame, cfg: &ClassifierConfig) -> Symbol {
    HandPose::measure(frame, cfg).symbol(cfg)
}

pub fn classify_input(input: &FrameInput, cfg: &ClassifierConfig) -> Symbol {
    match input {
        FrameInput::Hand(frame) => classify(frame, cfg),
        FrameInput::NoHand => Symbol::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{LANDMARK_COUNT, Landmark};

    // Neutral hand: every finger curled, thumb tucked in, tips well apart.
    fn base() -> [Landmark; LANDMARK_COUNT] {
        let mut pts = [Landmark::new(0.5, 0.5); LANDMARK_COUNT];
        for tip in FINGER_TIPS {
            pts[tip] = Landmark::new(0.4, 0.6);
        }
        pts[THUMB_TIP] = Landmark::new(0.52, 0.55);
        pts
    }

    fn hand(fingers: [bool; 4], thumb_out: bool, thumb_up: bool) -> LandmarkFrame {
        let mut pts = base();
        for (i, tip) in FINGER_TIPS.into_iter().enumerate() {
            if fingers[i] {
                pts[tip] = Landmark::new(0.3 + 0.1 * i as f32, 0.3);
            }
        }
        if thumb_out {
            let y = if thumb_up { 0.35 } else { 0.6 };
            pts[THUMB_TIP] = Landmark::new(0.75, y);
        }
        LandmarkFrame::new(pts)
    }

    fn sym(frame: &LandmarkFrame) -> Symbol {
        classify(frame, &ClassifierConfig::default())
    }

    #[test]
    fn counts_fingers_and_thumb() {
        assert_eq!(sym(&hand([true, false, false, false], false, false)), Symbol::Digit(1));
        assert_eq!(sym(&hand([true, true, true, false], false, false)), Symbol::Digit(3));
        assert_eq!(sym(&hand([true, true, true, true], false, false)), Symbol::Digit(4));
        assert_eq!(sym(&hand([true, true, true, true], true, true)), Symbol::Digit(5));
        assert_eq!(sym(&hand([false; 4], false, false)), Symbol::Digit(0));
    }

    #[test]
    fn recognizes_operator_gestures() {
        assert_eq!(
            sym(&hand([false; 4], true, false)),
            Symbol::Operator(OperatorGesture::Rock)
        );
        assert_eq!(
            sym(&hand([true, true, false, false], false, false)),
            Symbol::Operator(OperatorGesture::Victory)
        );
        assert_eq!(
            sym(&hand([false; 4], true, true)),
            Symbol::Operator(OperatorGesture::ThumbsUp)
        );
    }

    #[test]
    fn victory_with_thumb_out_counts_as_three() {
        assert_eq!(sym(&hand([true, true, false, false], true, false)), Symbol::Digit(3));
    }

    #[test]
    fn circle_wins_over_digit_count() {
        let mut pts = *hand([false, true, true, true], false, false).points();
        pts[INDEX_TIP] = Landmark::new(0.52, 0.53);
        let frame = LandmarkFrame::new(pts);

        let pose = HandPose::measure(&frame, &ClassifierConfig::default());
        assert_eq!(pose.finger_count(), 3);
        assert_eq!(sym(&frame), Symbol::Operator(OperatorGesture::Circle));
    }

    #[test]
    fn extension_test_is_strict() {
        let mut pts = base();
        pts[INDEX_TIP] = Landmark::new(0.4, 0.5);
        assert_eq!(sym(&LandmarkFrame::new(pts)), Symbol::Digit(0));
    }

    #[test]
    fn classification_is_deterministic() {
        let frame = hand([true, false, true, false], true, false);
        let first = sym(&frame);
        for _ in 0..50 {
            assert_eq!(sym(&frame), first);
        }
    }

    #[test]
    fn thresholds_come_from_config() {
        let frame = hand([false; 4], true, false);
        let strict = ClassifierConfig {
            thumb_extension: 0.5,
            ..ClassifierConfig::default()
        };
        assert_eq!(classify(&frame, &strict), Symbol::Digit(0));
    }

    #[test]
    fn no_hand_is_none() {
        let cfg = ClassifierConfig::default();
        assert_eq!(classify_input(&FrameInput::NoHand, &cfg), Symbol::None);
    }
}
