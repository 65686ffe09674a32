use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use classai_lib::{
    analysis::{AnalysisError, VisionModel},
    capture::{CameraDevice, CaptureConstraints, CaptureController, CaptureError, EncodedFrame, ZoomRange},
    events::{self, EventSink},
    models::AnalysisResult,
    reports::ReportStore,
    roster::Roster,
    session::{AttendanceController, ControllerParts, SessionError, SessionState},
    settings::{CourseDetails, RecordingSettings},
    storage::LocalStore,
    view::Screen,
};
use image::DynamicImage;
use serde_json::Value;

const NAMES: [&str; 8] = [
    "Zhang Wei",
    "Li Na",
    "Wang Fang",
    "Liu Yang",
    "Chen Jing",
    "Yang Min",
    "Zhao Lei",
    "Zhou Hui",
];

#[derive(Default)]
struct CameraProbe {
    unavailable: bool,
    blind: bool,
    opens: usize,
    releases: usize,
}

struct FakeCamera {
    probe: Arc<Mutex<CameraProbe>>,
    open: bool,
}

impl CameraDevice for FakeCamera {
    fn open(&mut self, _constraints: &CaptureConstraints) -> Result<Option<ZoomRange>, CaptureError> {
        let mut probe = self.probe.lock().unwrap();
        if probe.unavailable {
            return Err(CaptureError::CameraUnavailable("permission denied".into()));
        }
        probe.opens += 1;
        self.open = true;
        Ok(Some(ZoomRange {
            min: 1.0,
            max: 4.0,
            step: 0.1,
        }))
    }

    fn read_frame(&mut self) -> Option<DynamicImage> {
        let blind = self.probe.lock().unwrap().blind;
        (self.open && !blind).then(|| DynamicImage::new_rgb8(16, 16))
    }

    fn apply_zoom(&mut self, _level: f64) -> Result<(), CaptureError> {
        Ok(())
    }

    fn release(&mut self) {
        if self.open {
            self.probe.lock().unwrap().releases += 1;
        }
        self.open = false;
    }
}

enum Reply {
    Count(u32),
    Fail,
}

struct FakeVision {
    reply: Reply,
    delay: Duration,
    calls: Mutex<Vec<usize>>,
}

impl VisionModel for FakeVision {
    fn analyze(&self, frames: &[EncodedFrame]) -> Result<AnalysisResult, AnalysisError> {
        self.calls.lock().unwrap().push(frames.len());
        std::thread::sleep(self.delay);
        match self.reply {
            Reply::Count(count) => Ok(AnalysisResult {
                person_count: count,
                confidence: 0.92,
                description: "Students seated in rows".into(),
                detected_features: vec!["desks".into()],
            }),
            Reply::Fail => Err(AnalysisError::Http {
                status: 500,
                body: "internal".into(),
            }),
        }
    }
}

#[derive(Default)]
struct CollectingSink {
    events: Mutex<Vec<(String, Value)>>,
}

impl CollectingSink {
    fn names(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: &str, payload: Value) {
        self.events.lock().unwrap().push((event.to_string(), payload));
    }
}

struct Harness {
    controller: AttendanceController,
    camera: Arc<Mutex<CameraProbe>>,
    vision: Arc<FakeVision>,
    sink: Arc<CollectingSink>,
    store: LocalStore,
}

async fn harness(reply: Reply, delay: Duration) -> Harness {
    let store = LocalStore::in_memory().unwrap();
    let reports = ReportStore::load(store.clone()).await;
    let camera = Arc::new(Mutex::new(CameraProbe::default()));
    let vision = Arc::new(FakeVision {
        reply,
        delay,
        calls: Mutex::new(Vec::new()),
    });
    let sink = Arc::new(CollectingSink::default());

    let controller = AttendanceController::new(ControllerParts {
        capture: CaptureController::new(Box::new(FakeCamera {
            probe: Arc::clone(&camera),
            open: false,
        })),
        roster: Roster::from_names(NAMES),
        course: CourseDetails::default(),
        reports,
        vision: vision.clone(),
        events: sink.clone(),
        recording: RecordingSettings {
            duration_ticks: 3,
            tick_ms: 10,
            sample_every_ticks: 1,
        },
        settings: None,
    });

    Harness {
        controller,
        camera,
        vision,
        sink,
        store,
    }
}

async fn wait_for(controller: &AttendanceController, wanted: SessionState) {
    for _ in 0..200 {
        if controller.state().await == wanted {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "timed out waiting for {wanted:?}, still {:?}",
        controller.state().await
    );
}

#[tokio::test]
async fn roll_call_marks_first_entries_present_and_saves_report() {
    let h = harness(Reply::Count(5), Duration::ZERO).await;
    h.controller.start_camera().await.unwrap();
    h.controller.start_recording().await.unwrap();
    assert_eq!(h.controller.state().await, SessionState::Recording);

    wait_for(&h.controller, SessionState::Result).await;

    // Two sampling ticks before the terminal one.
    assert_eq!(*h.vision.calls.lock().unwrap(), vec![2]);
    assert_eq!(h.camera.lock().unwrap().releases, 1);

    match h.controller.view().await.screen {
        Screen::Result {
            present_count,
            is_overridden,
            roster,
            ..
        } => {
            assert_eq!(present_count, 5);
            assert!(!is_overridden);
            let present: Vec<_> = roster.iter().map(|row| row.is_present).collect();
            assert_eq!(present, [true, true, true, true, true, false, false, false]);
        }
        other => panic!("unexpected screen {other:?}"),
    }

    let report = h.controller.save_report().await.unwrap();
    assert_eq!(report.expected_count, 8);
    assert_eq!(report.actual_count, 5);
    assert_eq!(report.absent_count, 3);
    assert_eq!(report.absent_names, ["Yang Min", "Zhao Lei", "Zhou Hui"]);
    assert_eq!(h.controller.state().await, SessionState::History);

    // Persisted, so a fresh store over the same database sees it.
    let reloaded = ReportStore::load(h.store.clone()).await;
    assert_eq!(reloaded.list().await, vec![report]);

    let names = h.sink.names();
    assert!(names.iter().any(|name| name == events::RECORDING_TICK));
    assert!(names.iter().any(|name| name == events::SESSION_STATE_CHANGED));
}

#[tokio::test]
async fn manual_override_and_reset_to_ai() {
    let h = harness(Reply::Count(5), Duration::ZERO).await;
    h.controller.start_camera().await.unwrap();
    h.controller.start_recording().await.unwrap();
    wait_for(&h.controller, SessionState::Result).await;

    assert!(h.controller.toggle_student("6").await.unwrap());
    match h.controller.view().await.screen {
        Screen::Result {
            present_count,
            is_overridden,
            ..
        } => {
            assert_eq!(present_count, 6);
            assert!(is_overridden);
        }
        other => panic!("unexpected screen {other:?}"),
    }

    h.controller.reset_to_ai().await.unwrap();
    match h.controller.view().await.screen {
        Screen::Result {
            present_count,
            is_overridden,
            roster,
            ..
        } => {
            assert_eq!(present_count, 5);
            assert!(!is_overridden);
            assert!(!roster[5].is_present);
        }
        other => panic!("unexpected screen {other:?}"),
    }
}

#[tokio::test]
async fn failed_analysis_returns_to_idle_without_a_report() {
    let h = harness(Reply::Fail, Duration::ZERO).await;
    h.controller.start_camera().await.unwrap();
    h.controller.start_recording().await.unwrap();

    for _ in 0..200 {
        if h.sink.names().iter().any(|name| name == events::ANALYSIS_FAILED) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(h.controller.state().await, SessionState::Idle);
    assert!(h.controller.reports().await.is_empty());
    assert!(matches!(
        h.controller.save_report().await,
        Err(SessionError::InvalidTransition { .. })
    ));

    let failures: Vec<_> = h
        .sink
        .names()
        .into_iter()
        .filter(|name| name == events::ANALYSIS_FAILED)
        .collect();
    assert_eq!(failures.len(), 1);

    // Back on the idle screen with the camera re-acquired.
    assert_eq!(h.camera.lock().unwrap().opens, 2);
    match h.controller.view().await.screen {
        Screen::Idle { can_start, .. } => assert!(can_start),
        other => panic!("unexpected screen {other:?}"),
    }
}

#[tokio::test]
async fn reset_during_analysis_drops_the_late_result() {
    let h = harness(Reply::Count(4), Duration::from_millis(300)).await;
    h.controller.start_camera().await.unwrap();
    h.controller.start_recording().await.unwrap();
    wait_for(&h.controller, SessionState::Analyzing).await;

    h.controller.reset_session().await;
    assert_eq!(h.controller.state().await, SessionState::Idle);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(h.controller.state().await, SessionState::Idle);
    match h.controller.view().await.screen {
        Screen::Idle { .. } => {}
        other => panic!("unexpected screen {other:?}"),
    }
    assert!(!h
        .sink
        .names()
        .iter()
        .any(|name| name == events::ANALYSIS_FAILED));
}

#[tokio::test]
async fn recording_is_refused_without_a_camera() {
    let h = harness(Reply::Count(3), Duration::ZERO).await;
    h.camera.lock().unwrap().unavailable = true;

    assert!(h.controller.start_camera().await.is_err());
    assert!(matches!(
        h.controller.start_recording().await,
        Err(SessionError::Camera(CaptureError::CameraUnavailable(_)))
    ));
    assert_eq!(h.controller.state().await, SessionState::Idle);
    match h.controller.view().await.screen {
        Screen::Idle {
            camera, can_start, ..
        } => {
            assert!(!can_start);
            assert!(camera.camera_error.is_some());
        }
        other => panic!("unexpected screen {other:?}"),
    }

    // Retry once the permission is granted.
    h.camera.lock().unwrap().unavailable = false;
    h.controller.start_camera().await.unwrap();
    h.controller.start_recording().await.unwrap();
}

#[tokio::test]
async fn history_navigation_and_delete() {
    let h = harness(Reply::Count(8), Duration::ZERO).await;
    h.controller.start_camera().await.unwrap();
    h.controller.start_recording().await.unwrap();
    wait_for(&h.controller, SessionState::Result).await;
    let report = h.controller.save_report().await.unwrap();
    assert_eq!(report.attendance_rate(), 100);

    h.controller.reset_session().await;
    assert_eq!(h.controller.state().await, SessionState::Idle);
    h.controller.show_history().await.unwrap();

    match h.controller.view().await.screen {
        Screen::History { reports } => {
            assert_eq!(reports.len(), 1);
            assert_eq!(reports[0].rate_percent, 100);
        }
        other => panic!("unexpected screen {other:?}"),
    }

    assert!(h.controller.delete_report(&report.id).await.unwrap());
    assert!(!h.controller.delete_report(&report.id).await.unwrap());
    assert!(h.controller.reports().await.is_empty());
}

#[tokio::test]
async fn failed_save_keeps_the_result_screen() {
    let h = harness(Reply::Count(2), Duration::ZERO).await;
    h.controller.start_camera().await.unwrap();
    h.controller.start_recording().await.unwrap();
    wait_for(&h.controller, SessionState::Result).await;

    h.store
        .execute(|conn| {
            conn.execute("DROP TABLE local_storage", [])?;
            Ok(())
        })
        .await
        .unwrap();

    assert!(matches!(
        h.controller.save_report().await,
        Err(SessionError::Persistence(_))
    ));
    assert_eq!(h.controller.state().await, SessionState::Result);
    assert!(h.controller.reports().await.is_empty());
}

#[tokio::test]
async fn zoom_is_clamped_and_locked_outside_capture() {
    let h = harness(Reply::Count(1), Duration::ZERO).await;
    h.controller.start_camera().await.unwrap();

    assert_eq!(h.controller.set_zoom(9.0).await.unwrap(), Some(4.0));
    match h.controller.view().await.screen {
        Screen::Idle { camera, .. } => assert_eq!(camera.zoom_indicator.as_deref(), Some("4.0x")),
        other => panic!("unexpected screen {other:?}"),
    }

    h.controller.show_history().await.unwrap();
    assert!(matches!(
        h.controller.set_zoom(2.0).await,
        Err(SessionError::InvalidTransition {
            state: SessionState::History,
            ..
        })
    ));
    assert_eq!(h.camera.lock().unwrap().releases, 1);

    // Home re-acquires the camera at the widest setting.
    h.controller.reset_session().await;
    match h.controller.view().await.screen {
        Screen::Idle { camera, .. } => assert_eq!(camera.zoom_indicator.as_deref(), Some("1.0x")),
        other => panic!("unexpected screen {other:?}"),
    }
}

#[tokio::test]
async fn camera_without_frames_fails_analysis_without_calling_the_model() {
    let h = harness(Reply::Count(5), Duration::ZERO).await;
    h.camera.lock().unwrap().blind = true;
    h.controller.start_camera().await.unwrap();
    h.controller.start_recording().await.unwrap();

    let mut failure = None;
    for _ in 0..200 {
        failure = h
            .sink
            .events
            .lock()
            .unwrap()
            .iter()
            .find(|(name, _)| name == events::ANALYSIS_FAILED)
            .map(|(_, payload)| payload.clone());
        if failure.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let failure = failure.expect("analysis-failed was never emitted");
    let message = failure["message"].as_str().unwrap();
    assert!(message.contains(&AnalysisError::NoFrames.to_string()), "{message}");
    assert!(h.vision.calls.lock().unwrap().is_empty());
    assert_eq!(h.controller.state().await, SessionState::Idle);
    assert!(h.controller.reports().await.is_empty());
}

#[tokio::test]
async fn course_details_edited_on_idle_are_stamped_on_the_report() {
    let h = harness(Reply::Count(3), Duration::ZERO).await;
    h.controller.start_camera().await.unwrap();
    let course = CourseDetails {
        course_name: "Physics 201".into(),
        class_name: "Group C".into(),
    };
    h.controller.set_course_details(course.clone()).await.unwrap();

    match h.controller.view().await.screen {
        Screen::Idle { course: shown, .. } => assert_eq!(shown, course),
        other => panic!("unexpected screen {other:?}"),
    }

    h.controller.start_recording().await.unwrap();
    assert!(matches!(
        h.controller.set_course_details(CourseDetails::default()).await,
        Err(SessionError::InvalidTransition {
            state: SessionState::Recording,
            ..
        })
    ));

    wait_for(&h.controller, SessionState::Result).await;
    let report = h.controller.save_report().await.unwrap();
    assert_eq!(report.course_name, "Physics 201");
    assert_eq!(report.class_name, "Group C");
}
