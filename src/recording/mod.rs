pub mod session;
pub mod state;

pub use session::RecordingSession;
pub use state::{Countdown, TickOutcome};
