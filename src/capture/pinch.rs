use serde::{Deserialize, Serialize};

use super::ZoomRange;

/// Gesture length, in pixels, that sweeps the whole zoom range.
pub const FULL_RANGE_PIXELS: f64 = 300.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TouchPoint {
    pub x: f64,
    pub y: f64,
}

impl TouchPoint {
    pub fn distance(&self, other: &TouchPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Two-finger pinch tracking between consecutive move events.
#[derive(Debug, Default)]
pub struct PinchTracker {
    last_distance: Option<f64>,
}

impl PinchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, touches: &[TouchPoint]) {
        self.last_distance = pinch_distance(touches);
    }

    /// Returns the next zoom level when the gesture moved it; the caller applies
    /// it. Anything other than two contacts ends the gesture.
    pub fn update(&mut self, touches: &[TouchPoint], current: f64, range: &ZoomRange) -> Option<f64> {
        let last = self.last_distance?;
        let Some(distance) = pinch_distance(touches) else {
            self.end();
            return None;
        };

        let per_pixel = range.span() / FULL_RANGE_PIXELS;
        let next = range.clamp(current + (distance - last) * per_pixel);
        self.last_distance = Some(distance);

        (next != current).then_some(next)
    }

    pub fn end(&mut self) {
        self.last_distance = None;
    }
}

fn pinch_distance(touches: &[TouchPoint]) -> Option<f64> {
    match touches {
        [first, second] => Some(first.distance(second)),
        _ => None,
    }
}
