#[cfg(feature = "desktop")]
pub mod commands;
pub mod controller;
pub mod state;

pub use controller::{AttendanceController, ControllerParts};
pub use state::{AppModel, SessionError, SessionState};
