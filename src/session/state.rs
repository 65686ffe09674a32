//! The application's single state container.
//!
//! Every mutation is a named transition that checks the current state first
//! and leaves everything untouched when it is not allowed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::CaptureError;
use crate::models::{AnalysisResult, AttendanceReport};
use crate::recording::{Countdown, RecordingSession};
use crate::roster::{Roster, UnknownStudent};
use crate::settings::CourseDetails;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    #[default]
    Idle,
    Recording,
    Analyzing,
    Result,
    History,
}

impl SessionState {
    /// States in which the camera stream is held open.
    pub fn is_capturing(&self) -> bool {
        matches!(self, SessionState::Idle | SessionState::Recording)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot {action} while {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: SessionState,
    },
    #[error(transparent)]
    UnknownStudent(#[from] UnknownStudent),
    #[error(transparent)]
    Camera(#[from] CaptureError),
    #[error("no analysis result to restore")]
    NoAnalysis,
    #[error("failed to persist report: {0:#}")]
    Persistence(anyhow::Error),
}

#[derive(Debug)]
pub struct AppModel {
    state: SessionState,
    /// Bumped whenever a session starts or is abandoned; late work carrying an
    /// older generation is ignored.
    generation: u64,
    roster: Roster,
    analysis: Option<AnalysisResult>,
    recording: Option<RecordingSession>,
    course: CourseDetails,
}

impl AppModel {
    pub fn new(roster: Roster, course: CourseDetails) -> Self {
        Self {
            state: SessionState::Idle,
            generation: 0,
            roster,
            analysis: None,
            recording: None,
            course,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn course(&self) -> &CourseDetails {
        &self.course
    }

    pub fn remaining_ticks(&self) -> Option<u32> {
        self.recording.as_ref().map(RecordingSession::remaining)
    }

    fn require(&self, action: &'static str, allowed: &[SessionState]) -> Result<(), SessionError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                action,
                state: self.state,
            })
        }
    }

    /// Clears everything a session produced and invalidates in-flight work.
    fn abandon_session(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.recording = None;
        self.analysis = None;
        self.roster.reset();
    }

    pub fn set_course(&mut self, course: CourseDetails) -> Result<(), SessionError> {
        self.require("edit course details", &[SessionState::Idle])?;
        self.course = course;
        Ok(())
    }

    /// Idle → Recording. Returns the generation the countdown must carry.
    pub fn begin_recording(&mut self, countdown: Countdown) -> Result<u64, SessionError> {
        self.require("start recording", &[SessionState::Idle])?;
        self.abandon_session();
        self.recording = Some(RecordingSession::new(countdown));
        self.state = SessionState::Recording;
        Ok(self.generation)
    }

    /// The live recording, if `generation` is still the current one.
    pub fn recording_mut(&mut self, generation: u64) -> Option<&mut RecordingSession> {
        if self.state != SessionState::Recording || self.generation != generation {
            return None;
        }
        self.recording.as_mut()
    }

    /// Recording → Analyzing, handing the accumulated session back.
    pub fn finish_recording(&mut self, generation: u64) -> Option<RecordingSession> {
        if self.state != SessionState::Recording || self.generation != generation {
            return None;
        }
        let session = self.recording.take()?;
        self.state = SessionState::Analyzing;
        Some(session)
    }

    /// Analyzing → Result. Returns false for a stale generation.
    pub fn apply_analysis(&mut self, generation: u64, result: AnalysisResult) -> bool {
        if self.state != SessionState::Analyzing || self.generation != generation {
            return false;
        }
        self.roster.apply_count(result.person_count);
        self.analysis = Some(result);
        self.state = SessionState::Result;
        true
    }

    /// Analyzing → Idle after a failed call. Returns false for a stale generation.
    pub fn analysis_failed(&mut self, generation: u64) -> bool {
        if self.state != SessionState::Analyzing || self.generation != generation {
            return false;
        }
        self.abandon_session();
        self.state = SessionState::Idle;
        true
    }

    pub fn toggle_student(&mut self, id: &str) -> Result<bool, SessionError> {
        self.require("edit attendance", &[SessionState::Result])?;
        Ok(self.roster.toggle(id)?)
    }

    pub fn reset_to_ai(&mut self) -> Result<(), SessionError> {
        self.require("restore the AI count", &[SessionState::Result])?;
        if self.roster.reset_to_ai() {
            Ok(())
        } else {
            Err(SessionError::NoAnalysis)
        }
    }

    pub fn is_overridden(&self) -> bool {
        self.analysis.is_some() && self.roster.is_overridden()
    }

    /// Snapshot of the roster as a report. The state does not change until
    /// `report_saved` confirms persistence.
    pub fn build_report(&self, created_at: DateTime<Utc>) -> Result<AttendanceReport, SessionError> {
        self.require("save a report", &[SessionState::Result])?;
        Ok(AttendanceReport::from_roster(
            self.roster.entries(),
            &self.course.course_name,
            &self.course.class_name,
            created_at,
        ))
    }

    /// Result → History once the report is stored.
    pub fn report_saved(&mut self) -> Result<(), SessionError> {
        self.require("finish the session", &[SessionState::Result])?;
        self.abandon_session();
        self.state = SessionState::History;
        Ok(())
    }

    /// Leaves any screen except an in-flight analysis for the history list.
    pub fn show_history(&mut self) -> Result<(), SessionError> {
        self.require(
            "open history",
            &[
                SessionState::Idle,
                SessionState::Recording,
                SessionState::Result,
                SessionState::History,
            ],
        )?;
        if self.state != SessionState::History {
            self.abandon_session();
            self.state = SessionState::History;
        }
        Ok(())
    }

    /// Back to Idle from anywhere. Always succeeds and can be repeated.
    pub fn reset(&mut self) {
        self.abandon_session();
        self.state = SessionState::Idle;
    }
}
