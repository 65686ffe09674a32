//! Outbound notifications to whatever renders the app.

use serde_json::Value;

pub const SESSION_STATE_CHANGED: &str = "session-state-changed";
pub const RECORDING_TICK: &str = "recording-tick";
pub const ANALYSIS_FAILED: &str = "analysis-failed";
pub const CAMERA_ACQUIRE_REQUESTED: &str = "camera-acquire-requested";
pub const CAMERA_ZOOM_REQUESTED: &str = "camera-zoom-requested";
pub const CAMERA_RELEASE_REQUESTED: &str = "camera-release-requested";

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &str, payload: Value);
}

#[cfg(feature = "desktop")]
impl EventSink for tauri::AppHandle {
    fn emit(&self, event: &str, payload: Value) {
        use tauri::Emitter;

        if let Err(err) = Emitter::emit(self, event, payload) {
            log::warn!("failed to emit {event}: {err}");
        }
    }
}
