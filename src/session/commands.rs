use tauri::State;

use crate::{
    capture::{decode_pushed_frame, TouchPoint, ZoomRange},
    models::AttendanceReport,
    session::{AttendanceController, SessionState},
    settings::CourseDetails,
    view::ViewModel,
};

use crate::AppState;

fn controller_from_state(state: &State<'_, AppState>) -> AttendanceController {
    state.controller.clone()
}

#[tauri::command]
pub async fn get_view(state: State<'_, AppState>) -> Result<ViewModel, String> {
    let controller = controller_from_state(&state);
    Ok(controller.view().await)
}

#[tauri::command]
pub async fn start_camera(state: State<'_, AppState>) -> Result<(), String> {
    let controller = controller_from_state(&state);
    controller.start_camera().await.map_err(|e| e.to_string())
}

/// Called by the webview once `getUserMedia` resolved. Starts the camera
/// right away when the idle screen is waiting for it.
#[tauri::command]
pub async fn attach_camera_track(
    state: State<'_, AppState>,
    zoom: Option<ZoomRange>,
) -> Result<(), String> {
    state.feed.attach_track(zoom);
    let controller = controller_from_state(&state);
    if controller.state().await == SessionState::Idle {
        controller.start_camera().await.map_err(|e| e.to_string())?;
    }
    Ok(())
}

#[tauri::command]
pub async fn camera_failed(state: State<'_, AppState>, reason: String) -> Result<(), String> {
    state.feed.report_failure(reason.clone());
    let controller = controller_from_state(&state);
    controller.report_camera_failure(reason).await;
    Ok(())
}

#[tauri::command]
pub async fn push_camera_frame(state: State<'_, AppState>, frame: String) -> Result<(), String> {
    let image = decode_pushed_frame(&frame).map_err(|e| e.to_string())?;
    state.feed.push_frame(image);
    Ok(())
}

#[tauri::command]
pub async fn start_recording(state: State<'_, AppState>) -> Result<(), String> {
    let controller = controller_from_state(&state);
    controller.start_recording().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn reset_session(state: State<'_, AppState>) -> Result<(), String> {
    let controller = controller_from_state(&state);
    controller.reset_session().await;
    Ok(())
}

#[tauri::command]
pub async fn show_history(state: State<'_, AppState>) -> Result<(), String> {
    let controller = controller_from_state(&state);
    controller.show_history().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn toggle_student(state: State<'_, AppState>, id: String) -> Result<bool, String> {
    let controller = controller_from_state(&state);
    controller
        .toggle_student(&id)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn reset_to_ai(state: State<'_, AppState>) -> Result<(), String> {
    let controller = controller_from_state(&state);
    controller.reset_to_ai().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn save_report(state: State<'_, AppState>) -> Result<AttendanceReport, String> {
    let controller = controller_from_state(&state);
    controller.save_report().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn delete_report(state: State<'_, AppState>, id: String) -> Result<bool, String> {
    let controller = controller_from_state(&state);
    controller.delete_report(&id).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn set_course_details(
    state: State<'_, AppState>,
    course: CourseDetails,
) -> Result<(), String> {
    let controller = controller_from_state(&state);
    controller
        .set_course_details(course)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn set_zoom(state: State<'_, AppState>, level: f64) -> Result<Option<f64>, String> {
    let controller = controller_from_state(&state);
    controller.set_zoom(level).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn pinch_start(state: State<'_, AppState>, touches: Vec<TouchPoint>) -> Result<(), String> {
    let controller = controller_from_state(&state);
    controller.pinch_start(&touches).await;
    Ok(())
}

#[tauri::command]
pub async fn pinch_move(
    state: State<'_, AppState>,
    touches: Vec<TouchPoint>,
) -> Result<Option<f64>, String> {
    let controller = controller_from_state(&state);
    Ok(controller.pinch_move(&touches).await)
}

#[tauri::command]
pub async fn pinch_end(state: State<'_, AppState>) -> Result<(), String> {
    let controller = controller_from_state(&state);
    controller.pinch_end().await;
    Ok(())
}
