//! Camera whose media track lives in the webview.
//!
//! Opening without a track asks the webview to call `getUserMedia`; it then
//! attaches the track here with its zoom capability and keeps pushing preview
//! frames. Zoom changes and release requests travel back as events.

use std::sync::{Arc, Mutex, MutexGuard};

use image::DynamicImage;
use serde_json::json;

use super::{CameraDevice, CaptureConstraints, CaptureError, ZoomRange};
use crate::events::{self, EventSink};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

#[derive(Default)]
struct FeedState {
    track: Option<Option<ZoomRange>>,
    failure: Option<String>,
    open: bool,
    latest: Option<DynamicImage>,
}

/// Shared handle the command layer uses to feed the camera.
#[derive(Clone, Default)]
pub struct CameraFeed {
    state: Arc<Mutex<FeedState>>,
}

impl CameraFeed {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn attach_track(&self, zoom: Option<ZoomRange>) {
        let mut state = self.lock();
        state.track = Some(zoom);
        state.failure = None;
        log_info!("Webview attached camera track (zoom: {:?})", zoom);
    }

    pub fn report_failure(&self, reason: impl Into<String>) {
        let mut state = self.lock();
        state.track = None;
        state.open = false;
        state.latest = None;
        state.failure = Some(reason.into());
    }

    /// Keeps the newest frame only; frames pushed while closed are dropped.
    pub fn push_frame(&self, image: DynamicImage) {
        let mut state = self.lock();
        if state.open {
            log_debug!("Preview frame {}x{}", image.width(), image.height());
            state.latest = Some(image);
        }
    }

    pub fn is_open(&self) -> bool {
        self.lock().open
    }
}

pub struct FeedCamera {
    feed: CameraFeed,
    events: Arc<dyn EventSink>,
}

impl FeedCamera {
    pub fn new(feed: CameraFeed, events: Arc<dyn EventSink>) -> Self {
        Self { feed, events }
    }
}

impl CameraDevice for FeedCamera {
    fn open(&mut self, constraints: &CaptureConstraints) -> Result<Option<ZoomRange>, CaptureError> {
        let mut state = self.feed.lock();
        if let Some(zoom) = state.track {
            state.open = true;
            return Ok(zoom);
        }

        // The webview retries getUserMedia on request; the next attach + start
        // picks the track up.
        let failure = state.failure.take();
        drop(state);
        self.events.emit(
            events::CAMERA_ACQUIRE_REQUESTED,
            serde_json::to_value(constraints).unwrap_or_default(),
        );

        Err(CaptureError::CameraUnavailable(failure.unwrap_or_else(|| {
            format!(
                "no camera track attached (wanted {:?} at {}x{})",
                constraints.facing, constraints.ideal_width, constraints.ideal_height
            )
        })))
    }

    fn read_frame(&mut self) -> Option<DynamicImage> {
        let state = self.feed.lock();
        if !state.open {
            return None;
        }
        state.latest.clone()
    }

    fn apply_zoom(&mut self, level: f64) -> Result<(), CaptureError> {
        if !self.feed.is_open() {
            return Err(CaptureError::Constraint("camera is not open".into()));
        }
        self.events
            .emit(events::CAMERA_ZOOM_REQUESTED, json!({ "zoom": level }));
        Ok(())
    }

    fn release(&mut self) {
        let was_open = {
            let mut state = self.feed.lock();
            let was_open = state.open;
            state.open = false;
            state.track = None;
            state.latest = None;
            was_open
        };
        if was_open {
            self.events.emit(events::CAMERA_RELEASE_REQUESTED, json!({}));
        }
    }
}
