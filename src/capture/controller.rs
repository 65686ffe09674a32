use log::{debug, info, warn};
use serde::Serialize;

use super::{
    CameraDevice, CaptureConstraints, CaptureError, EncodedFrame, PinchTracker, TouchPoint,
    ZoomRange,
};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaptureStatus {
    pub live: bool,
    pub camera_error: Option<String>,
    pub zoom: Option<f64>,
    pub zoom_range: Option<ZoomRange>,
}

/// Owns the camera for its whole lifetime. The stream is released on `stop`
/// and again on drop, so a torn-down controller never leaks an open device.
pub struct CaptureController {
    device: Box<dyn CameraDevice>,
    constraints: CaptureConstraints,
    live: bool,
    camera_error: Option<String>,
    zoom_range: Option<ZoomRange>,
    zoom: f64,
    pinch: PinchTracker,
}

impl CaptureController {
    pub fn new(device: Box<dyn CameraDevice>) -> Self {
        Self::with_constraints(device, CaptureConstraints::default())
    }

    pub fn with_constraints(device: Box<dyn CameraDevice>, constraints: CaptureConstraints) -> Self {
        Self {
            device,
            constraints,
            live: false,
            camera_error: None,
            zoom_range: None,
            zoom: 1.0,
            pinch: PinchTracker::new(),
        }
    }

    /// Acquires the stream. A failure is remembered as the camera error so the
    /// view can offer a retry; it never changes the session state.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.live {
            return Ok(());
        }

        self.camera_error = None;
        match self.device.open(&self.constraints) {
            Ok(zoom_range) => {
                self.live = true;
                self.zoom_range = zoom_range;
                self.zoom = zoom_range.map(|range| range.min).unwrap_or(1.0);
                info!(
                    "Camera started (zoom range: {})",
                    zoom_range
                        .map(|range| format!("{}..{}", range.min, range.max))
                        .unwrap_or_else(|| "unsupported".into())
                );
                Ok(())
            }
            Err(err) => {
                warn!("Camera start failed: {err}");
                self.camera_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Releases every track. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.device.release();
        self.pinch.end();
        if self.live {
            info!("Camera stopped");
        }
        self.live = false;
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn camera_error(&self) -> Option<&str> {
        self.camera_error.as_deref()
    }

    /// Records a failure reported by the host before `start` could run.
    pub fn report_unavailable(&mut self, reason: impl Into<String>) {
        self.stop();
        self.camera_error = Some(CaptureError::CameraUnavailable(reason.into()).to_string());
    }

    pub fn zoom(&self) -> Option<f64> {
        self.zoom_range.map(|_| self.zoom)
    }

    pub fn status(&self) -> CaptureStatus {
        CaptureStatus {
            live: self.live,
            camera_error: self.camera_error.clone(),
            zoom: self.zoom(),
            zoom_range: self.zoom_range,
        }
    }

    /// Current frame as JPEG, `None` when nothing can be captured.
    pub fn grab_frame(&mut self) -> Option<EncodedFrame> {
        if !self.live {
            return None;
        }
        let image = self.device.read_frame()?;
        match EncodedFrame::encode_jpeg(&image) {
            Ok(frame) => {
                debug!("Grabbed frame ({} bytes)", frame.len());
                Some(frame)
            }
            Err(err) => {
                warn!("Dropping frame: {err:#}");
                None
            }
        }
    }

    /// Clamps and applies a zoom level. Devices without zoom ignore it.
    pub fn set_zoom(&mut self, level: f64) -> Option<f64> {
        if !self.live {
            return None;
        }
        let range = self.zoom_range?;
        let next = range.clamp(level);
        self.zoom = next;
        if let Err(err) = self.device.apply_zoom(next) {
            warn!("Could not apply zoom constraint: {err}");
        }
        Some(next)
    }

    /// Back to the widest setting, used when a session resets.
    pub fn reset_zoom(&mut self) {
        if let Some(range) = self.zoom_range {
            self.set_zoom(range.min);
        }
    }

    pub fn pinch_start(&mut self, touches: &[TouchPoint]) {
        self.pinch.start(touches);
    }

    pub fn pinch_move(&mut self, touches: &[TouchPoint]) -> Option<f64> {
        if !self.live {
            return None;
        }
        let range = self.zoom_range?;
        let next = self.pinch.update(touches, self.zoom, &range)?;
        self.set_zoom(next)
    }

    pub fn pinch_end(&mut self) {
        self.pinch.end();
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.stop();
    }
}
