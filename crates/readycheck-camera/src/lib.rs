pub mod device;
pub mod inspect;

pub use device::{CameraConstraints, CameraDeviceInfo, CameraManager};
pub use inspect::{measure, CameraReading};

pub use nokhwa::Camera;
