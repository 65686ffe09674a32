pub mod controller;
pub mod device;
pub mod feed;
pub mod frame;
pub mod pinch;

pub use controller::{CaptureController, CaptureStatus};
pub use device::{CameraDevice, CaptureConstraints, CaptureError, FacingMode, ZoomRange};
pub use feed::{CameraFeed, FeedCamera};
pub use frame::{decode_pushed_frame, EncodedFrame};
pub use pinch::{PinchTracker, TouchPoint};
