pub mod analysis;
pub mod capture;
pub mod events;
pub mod models;
pub mod recording;
pub mod reports;
pub mod roster;
pub mod session;
pub mod settings;
pub mod storage;
pub mod utils;
pub mod view;

#[cfg(feature = "desktop")]
pub use desktop::run;

#[cfg(feature = "desktop")]
pub(crate) use desktop::AppState;

#[cfg(feature = "desktop")]
mod desktop {
    use std::sync::Arc;

    use log::{info, warn};
    use tauri::{Manager, RunEvent};

    use crate::{
        analysis::GeminiClient,
        capture::{CameraFeed, CaptureController, FeedCamera},
        events::EventSink,
        reports::ReportStore,
        roster::Roster,
        session::{
            commands::{
                attach_camera_track, camera_failed, delete_report, get_view, pinch_end,
                pinch_move, pinch_start, push_camera_frame, reset_session, reset_to_ai,
                save_report, set_course_details, set_zoom, show_history, start_camera,
                start_recording, toggle_student,
            },
            AttendanceController, ControllerParts,
        },
        settings::SettingsStore,
        storage::LocalStore,
        utils::logging,
    };

    pub(crate) struct AppState {
        pub(crate) controller: AttendanceController,
        pub(crate) feed: CameraFeed,
    }

    #[cfg_attr(mobile, tauri::mobile_entry_point)]
    pub fn run() {
        logging::init();

        info!("ClassAI starting up...");

        let app = tauri::Builder::default()
            .setup(|app| {
                let result = (|| -> anyhow::Result<()> {
                    let app_data_dir = app
                        .path()
                        .app_data_dir()
                        .map_err(|err| anyhow::anyhow!(err))?;
                    std::fs::create_dir_all(&app_data_dir)?;

                    let store = LocalStore::open(app_data_dir.join("classai.sqlite3"))?;
                    let reports = tauri::async_runtime::block_on(ReportStore::load(store));

                    let settings = Arc::new(SettingsStore::new(app_data_dir.join("settings.json"))?);
                    let vision_settings = settings.vision();
                    if vision_settings.api_key().is_none() {
                        warn!(
                            "No API key in {}; analysis will fail until it is set",
                            vision_settings.api_key_env
                        );
                    }

                    let roster = Roster::from_names(settings.roster_names());
                    if roster.is_empty() {
                        warn!("Roster in settings is empty; every report will be 0/0");
                    }

                    let events: Arc<dyn EventSink> = Arc::new(app.handle().clone());
                    let feed = CameraFeed::new();
                    let camera = FeedCamera::new(feed.clone(), Arc::clone(&events));

                    let controller = AttendanceController::new(ControllerParts {
                        capture: CaptureController::new(Box::new(camera)),
                        roster,
                        course: settings.course(),
                        reports,
                        vision: Arc::new(GeminiClient::new(vision_settings)),
                        events,
                        recording: settings.recording(),
                        settings: Some(settings),
                    });

                    app.manage(AppState { controller, feed });

                    Ok(())
                })();

                result.map_err(|err| err.into())
            })
            .invoke_handler(tauri::generate_handler![
                get_view,
                start_camera,
                attach_camera_track,
                camera_failed,
                push_camera_frame,
                start_recording,
                reset_session,
                show_history,
                toggle_student,
                reset_to_ai,
                save_report,
                delete_report,
                set_course_details,
                set_zoom,
                pinch_start,
                pinch_move,
                pinch_end,
            ])
            .build(tauri::generate_context!())
            .expect("error while building tauri application");

        app.run(|handle, event| {
            if let RunEvent::ExitRequested { .. } = event {
                if let Some(state) = handle.try_state::<AppState>() {
                    let controller = state.controller.clone();
                    tauri::async_runtime::block_on(controller.shutdown());
                }
            }
        });
    }
}
