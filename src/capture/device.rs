use image::DynamicImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),
    #[error("camera rejected constraint: {0}")]
    Constraint(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FacingMode {
    /// Rear camera on phones and tablets.
    Environment,
}

/// Preferences handed to the device when opening; all of them are "ideal",
/// a device that cannot honour them still opens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CaptureConstraints {
    pub facing: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            facing: FacingMode::Environment,
            ideal_width: 1280,
            ideal_height: 720,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ZoomRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl ZoomRange {
    pub fn clamp(&self, level: f64) -> f64 {
        level.max(self.min).min(self.max)
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// A live video source. Implementations wrap whatever media API the host
/// exposes; the capture controller owns exactly one at a time.
pub trait CameraDevice: Send {
    /// Acquires the stream and reports the zoom capability, if any.
    fn open(&mut self, constraints: &CaptureConstraints) -> Result<Option<ZoomRange>, CaptureError>;

    /// Current frame, `None` when the stream has not produced one yet.
    fn read_frame(&mut self) -> Option<DynamicImage>;

    fn apply_zoom(&mut self, level: f64) -> Result<(), CaptureError>;

    /// Stops every track. Must tolerate being called on a closed device.
    fn release(&mut self);
}
