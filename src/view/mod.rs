//! Projection of the application state onto the screen the user sees.
//!
//! Nothing here mutates; the only rule encoded is which actions are enabled.

use serde::Serialize;

use crate::capture::CaptureStatus;
use crate::models::{AnalysisResult, AttendanceReport};
use crate::session::{AppModel, SessionState};
use crate::settings::CourseDetails;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum HeaderAction {
    History,
    Home,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CameraPanel {
    pub live: bool,
    pub camera_error: Option<String>,
    /// Shown only when the device reports a zoom range.
    pub zoom_indicator: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RosterRow {
    pub id: String,
    pub name: String,
    pub initial: String,
    pub is_present: bool,
    pub interactive: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryCard {
    pub id: String,
    pub course_name: String,
    pub class_name: String,
    pub date_string: String,
    pub present: u32,
    pub absent: u32,
    pub rate_percent: u32,
}

impl From<&AttendanceReport> for HistoryCard {
    fn from(report: &AttendanceReport) -> Self {
        Self {
            id: report.id.clone(),
            course_name: report.course_name.clone(),
            class_name: report.class_name.clone(),
            date_string: report.date_string.clone(),
            present: report.actual_count,
            absent: report.absent_count,
            rate_percent: report.attendance_rate(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "screen", rename_all = "camelCase")]
pub enum Screen {
    #[serde(rename_all = "camelCase")]
    Idle {
        course: CourseDetails,
        camera: CameraPanel,
        can_start: bool,
    },
    #[serde(rename_all = "camelCase")]
    Recording {
        remaining_seconds: u32,
        countdown_label: String,
        camera: CameraPanel,
    },
    #[serde(rename_all = "camelCase")]
    Analyzing { camera_error: Option<String> },
    #[serde(rename_all = "camelCase")]
    Result {
        analysis: Option<AnalysisResult>,
        present_count: usize,
        is_overridden: bool,
        roster: Vec<RosterRow>,
    },
    #[serde(rename_all = "camelCase")]
    History { reports: Vec<HistoryCard> },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    pub state: SessionState,
    pub header_action: HeaderAction,
    #[serde(flatten)]
    pub screen: Screen,
}

pub fn project(model: &AppModel, capture: &CaptureStatus, history: &[AttendanceReport]) -> ViewModel {
    let state = model.state();
    let header_action = if state == SessionState::History {
        HeaderAction::Home
    } else {
        HeaderAction::History
    };

    let screen = match state {
        SessionState::Idle => Screen::Idle {
            course: model.course().clone(),
            camera: camera_panel(capture, true),
            can_start: capture.live,
        },
        SessionState::Recording => {
            let remaining = model.remaining_ticks().unwrap_or(0);
            Screen::Recording {
                remaining_seconds: remaining,
                countdown_label: format!("00:{remaining:02}"),
                camera: camera_panel(capture, false),
            }
        }
        SessionState::Analyzing => Screen::Analyzing {
            camera_error: capture.camera_error.clone(),
        },
        SessionState::Result => Screen::Result {
            analysis: model.analysis().cloned(),
            present_count: model.roster().present_count(),
            is_overridden: model.is_overridden(),
            roster: roster_rows(model),
        },
        SessionState::History => Screen::History {
            reports: history.iter().map(HistoryCard::from).collect(),
        },
    };

    ViewModel {
        state,
        header_action,
        screen,
    }
}

fn camera_panel(capture: &CaptureStatus, show_zoom: bool) -> CameraPanel {
    CameraPanel {
        live: capture.live,
        camera_error: capture.camera_error.clone(),
        zoom_indicator: capture
            .zoom
            .filter(|_| show_zoom && capture.live)
            .map(|zoom| format!("{zoom:.1}x")),
    }
}

/// Rows accept toggles only while the result is on screen.
fn roster_rows(model: &AppModel) -> Vec<RosterRow> {
    let interactive = model.state() == SessionState::Result;
    model
        .roster()
        .entries()
        .iter()
        .map(|student| RosterRow {
            id: student.id.clone(),
            name: student.name.clone(),
            initial: student.initial(),
            is_present: student.is_present,
            interactive,
        })
        .collect()
}
