pub mod capture;
pub mod device;
pub mod meter;
pub mod watchdog;

pub use capture::{CaptureStats, DeviceConfig, LevelCaptureThread};
pub use device::{DeviceInfo, DeviceManager};
pub use meter::LevelMeter;
pub use watchdog::WatchdogTimer;
