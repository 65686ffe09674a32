use std::sync::Arc;

use chrono::Utc;
use log::{error, info, warn};
use serde::Serialize;
use serde_json::json;
use tokio::{sync::Mutex, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use crate::{
    analysis::{AnalysisError, VisionModel},
    capture::{CaptureController, CaptureError, EncodedFrame, TouchPoint},
    events::{self, EventSink},
    models::{AnalysisResult, AttendanceReport},
    recording::{Countdown, TickOutcome},
    reports::ReportStore,
    roster::Roster,
    settings::{CourseDetails, RecordingSettings, SettingsStore},
    view::{self, ViewModel},
};

use super::{AppModel, SessionError, SessionState};

/// Everything the controller composes. The camera is already wrapped in its
/// controller; the session starts it when entering `Idle`.
pub struct ControllerParts {
    pub capture: CaptureController,
    pub roster: Roster,
    pub course: CourseDetails,
    pub reports: ReportStore,
    pub vision: Arc<dyn VisionModel>,
    pub events: Arc<dyn EventSink>,
    pub recording: RecordingSettings,
    pub settings: Option<Arc<SettingsStore>>,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
struct RecordingTickEvent {
    remaining_seconds: u32,
    frames: usize,
}

#[derive(Clone)]
pub struct AttendanceController {
    model: Arc<Mutex<AppModel>>,
    capture: Arc<Mutex<CaptureController>>,
    reports: Arc<ReportStore>,
    vision: Arc<dyn VisionModel>,
    events: Arc<dyn EventSink>,
    recording: RecordingSettings,
    settings: Option<Arc<SettingsStore>>,
    ticker: Arc<Mutex<Option<(JoinHandle<()>, CancellationToken)>>>,
}

impl AttendanceController {
    pub fn new(parts: ControllerParts) -> Self {
        Self {
            model: Arc::new(Mutex::new(AppModel::new(parts.roster, parts.course))),
            capture: Arc::new(Mutex::new(parts.capture)),
            reports: Arc::new(parts.reports),
            vision: parts.vision,
            events: parts.events,
            recording: parts.recording.normalized(),
            settings: parts.settings,
            ticker: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn state(&self) -> SessionState {
        self.model.lock().await.state()
    }

    pub async fn view(&self) -> ViewModel {
        let model = self.model.lock().await;
        let capture = self.capture.lock().await.status();
        let history = self.reports.list().await;
        view::project(&model, &capture, &history)
    }

    pub async fn reports(&self) -> Vec<AttendanceReport> {
        self.reports.list().await
    }

    /// Acquires the camera for the idle screen; also the "retry" action.
    pub async fn start_camera(&self) -> Result<(), SessionError> {
        let result = {
            let model = self.model.lock().await;
            if model.state() != SessionState::Idle {
                return Err(SessionError::InvalidTransition {
                    action: "start the camera",
                    state: model.state(),
                });
            }
            self.capture.lock().await.start()
        };
        self.emit_state_changed().await;
        result.map_err(SessionError::from)
    }

    /// Host-side camera failure (permission prompt declined, no device).
    pub async fn report_camera_failure(&self, reason: String) {
        self.capture.lock().await.report_unavailable(reason);
        self.emit_state_changed().await;
    }

    pub async fn start_recording(&self) -> Result<(), SessionError> {
        let generation = {
            let mut model = self.model.lock().await;
            let capture = self.capture.lock().await;
            if model.state() == SessionState::Idle && !capture.is_live() {
                return Err(SessionError::Camera(
                    CaptureError::CameraUnavailable(
                        capture
                            .camera_error()
                            .unwrap_or("camera is not running")
                            .to_string(),
                    ),
                ));
            }
            model.begin_recording(Countdown::from_settings(&self.recording))?
        };

        info!(
            "Roll-call recording started ({} ticks)",
            self.recording.duration_ticks
        );
        self.spawn_ticker(generation).await;
        self.emit_state_changed().await;
        Ok(())
    }

    pub async fn toggle_student(&self, id: &str) -> Result<bool, SessionError> {
        let present = self.model.lock().await.toggle_student(id)?;
        self.emit_state_changed().await;
        Ok(present)
    }

    pub async fn reset_to_ai(&self) -> Result<(), SessionError> {
        self.model.lock().await.reset_to_ai()?;
        self.emit_state_changed().await;
        Ok(())
    }

    /// Stores the reconciled roster and moves to the history screen. A failed
    /// write keeps the result on screen so it can be retried.
    pub async fn save_report(&self) -> Result<AttendanceReport, SessionError> {
        let report = {
            let mut model = self.model.lock().await;
            let report = model.build_report(Utc::now())?;
            self.reports
                .save(report.clone())
                .await
                .map_err(SessionError::Persistence)?;
            model.report_saved()?;
            report
        };

        info!(
            "Saved attendance report {} ({}/{} present)",
            report.id, report.actual_count, report.expected_count
        );
        self.capture.lock().await.stop();
        self.emit_state_changed().await;
        Ok(report)
    }

    pub async fn delete_report(&self, id: &str) -> Result<bool, SessionError> {
        let removed = self
            .reports
            .delete(id)
            .await
            .map_err(SessionError::Persistence)?;
        if removed {
            self.emit_state_changed().await;
        }
        Ok(removed)
    }

    pub async fn show_history(&self) -> Result<(), SessionError> {
        self.model.lock().await.show_history()?;
        self.cancel_ticker().await;
        self.capture.lock().await.stop();
        self.emit_state_changed().await;
        Ok(())
    }

    /// Abandons whatever is in progress and returns to `Idle` with the camera
    /// running. Never fails, whatever was already stopped.
    pub async fn reset_session(&self) {
        self.model.lock().await.reset();
        self.cancel_ticker().await;
        self.acquire_camera().await;
        self.emit_state_changed().await;
    }

    pub async fn set_course_details(&self, course: CourseDetails) -> Result<(), SessionError> {
        self.model.lock().await.set_course(course.clone())?;
        if let Some(settings) = &self.settings {
            if let Err(err) = settings.update_course(course) {
                warn!("Failed to remember course details: {err:#}");
            }
        }
        self.emit_state_changed().await;
        Ok(())
    }

    /// Applies an explicit zoom level; `None` when no camera is live with a
    /// zoom range.
    pub async fn set_zoom(&self, level: f64) -> Result<Option<f64>, SessionError> {
        let zoom = {
            let model = self.model.lock().await;
            if !model.state().is_capturing() {
                return Err(SessionError::InvalidTransition {
                    action: "zoom",
                    state: model.state(),
                });
            }
            self.capture.lock().await.set_zoom(level)
        };
        if zoom.is_some() {
            self.emit_state_changed().await;
        }
        Ok(zoom)
    }

    pub async fn pinch_start(&self, touches: &[TouchPoint]) {
        self.capture.lock().await.pinch_start(touches);
    }

    pub async fn pinch_move(&self, touches: &[TouchPoint]) -> Option<f64> {
        let zoom = {
            let model = self.model.lock().await;
            if !model.state().is_capturing() {
                return None;
            }
            self.capture.lock().await.pinch_move(touches)
        };
        if zoom.is_some() {
            self.emit_state_changed().await;
        }
        zoom
    }

    pub async fn pinch_end(&self) {
        self.capture.lock().await.pinch_end();
    }

    /// Stops the countdown and releases the camera on application exit.
    pub async fn shutdown(&self) {
        self.cancel_ticker().await;
        self.capture.lock().await.stop();
    }

    async fn acquire_camera(&self) {
        let mut capture = self.capture.lock().await;
        if capture.is_live() {
            capture.reset_zoom();
        } else if let Err(err) = capture.start() {
            warn!("Camera not available on entering idle: {err}");
        }
    }

    async fn spawn_ticker(&self, generation: u64) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some((handle, token)) = ticker_guard.take() {
            token.cancel();
            handle.abort();
        }

        let token = CancellationToken::new();
        let controller = self.clone();
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            controller.run_recording(generation, task_token).await;
        });

        *ticker_guard = Some((handle, token));
    }

    async fn cancel_ticker(&self) {
        if let Some((handle, token)) = self.ticker.lock().await.take() {
            token.cancel();
            handle.abort();
        }
    }

    async fn run_recording(&self, generation: u64, token: CancellationToken) {
        let period = self.recording.tick_interval();
        let mut interval = time::interval_at(time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = interval.tick() => {}
            }

            match self.on_tick(generation).await {
                Some(TickOutcome::Finished) => break,
                Some(_) => continue,
                None => return,
            }
        }

        let Some(frames) = self.finish_recording(generation).await else {
            return;
        };
        self.run_analysis(generation, frames, token).await;
    }

    async fn on_tick(&self, generation: u64) -> Option<TickOutcome> {
        let (outcome, payload) = {
            let mut model = self.model.lock().await;
            let session = model.recording_mut(generation)?;
            let mut capture = self.capture.lock().await;
            let outcome = session.tick(&mut capture);
            let payload = RecordingTickEvent {
                remaining_seconds: session.remaining(),
                frames: session.frame_count(),
            };
            (outcome, payload)
        };

        self.events.emit(
            events::RECORDING_TICK,
            serde_json::to_value(&payload).unwrap_or_default(),
        );
        if outcome != TickOutcome::Finished {
            self.emit_state_changed().await;
        }
        Some(outcome)
    }

    /// Terminal tick: the fallback frame is captured and the camera released
    /// before the buffer leaves this function.
    async fn finish_recording(&self, generation: u64) -> Option<Vec<EncodedFrame>> {
        let frames = {
            let mut model = self.model.lock().await;
            let session = model.finish_recording(generation)?;
            let mut capture = self.capture.lock().await;
            let frames = session.into_frames(&mut capture);
            capture.stop();
            frames
        };
        self.emit_state_changed().await;
        Some(frames)
    }

    async fn run_analysis(
        &self,
        generation: u64,
        frames: Vec<EncodedFrame>,
        token: CancellationToken,
    ) {
        let outcome = if frames.is_empty() {
            Err(AnalysisError::NoFrames)
        } else {
            let vision = Arc::clone(&self.vision);
            let call = tokio::task::spawn_blocking(move || vision.analyze(&frames));
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Analysis abandoned; session was reset");
                    return;
                }
                joined = call => joined.unwrap_or_else(|err| {
                    Err(AnalysisError::Worker(err.to_string()))
                }),
            }
        };

        match outcome {
            Ok(result) => self.analysis_succeeded(generation, result).await,
            Err(err) => self.analysis_failed(generation, err).await,
        }
    }

    async fn analysis_succeeded(&self, generation: u64, result: AnalysisResult) {
        let applied = {
            let mut model = self.model.lock().await;
            let count = result.person_count;
            let applied = model.apply_analysis(generation, result);
            if applied {
                info!(
                    "Analysis counted {} people ({} on roster)",
                    count,
                    model.roster().len()
                );
            }
            applied
        };
        if applied {
            self.emit_state_changed().await;
        }
    }

    async fn analysis_failed(&self, generation: u64, err: AnalysisError) {
        error!("Analysis failed: {err}");
        if !self.model.lock().await.analysis_failed(generation) {
            return;
        }

        self.acquire_camera().await;
        self.events.emit(
            events::ANALYSIS_FAILED,
            json!({ "message": format!("AI analysis failed: {err}") }),
        );
        self.emit_state_changed().await;
    }

    async fn emit_state_changed(&self) {
        let view = self.view().await;
        match serde_json::to_value(&view) {
            Ok(payload) => self.events.emit(events::SESSION_STATE_CHANGED, payload),
            Err(err) => error!("Failed to serialize view: {err}"),
        }
    }
}
