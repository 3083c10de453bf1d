use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Audio subsystem error: {0}")]
    Audio(#[from] AudioError),

    #[error("Camera subsystem error: {0}")]
    Camera(#[from] CameraError),

    #[error("Network subsystem error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Shutdown requested")]
    ShutdownRequested,

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),
}

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("No microphone device found: {name:?}")]
    DeviceNotFound { name: Option<String> },

    #[error("Microphone disconnected")]
    DeviceDisconnected,

    #[error("Format not supported: {format}")]
    FormatNotSupported { format: String },

    #[error("No audio data for {duration:?}")]
    NoDataTimeout { duration: Duration },

    #[error("Timed out waiting for microphone access after {duration:?}")]
    OpenTimeout { duration: Duration },

    #[error("CPAL error: {0}")]
    Cpal(#[from] cpal::StreamError),

    #[error("Build stream error: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Play stream error: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Supported stream configs error: {0}")]
    SupportedStreamConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),
}

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("No camera device found")]
    NoDevice,

    #[error("Camera device not found: index {index}")]
    DeviceNotFound { index: u32 },

    #[error("Camera is already in use by another application: {0}")]
    Busy(String),

    #[error("Permission to access the camera was denied: {0}")]
    PermissionDenied(String),

    #[error("No frames captured within {duration:?}")]
    NoFrames { duration: Duration },

    #[error("Camera backend error: {0}")]
    Backend(String),
}

impl From<nokhwa::NokhwaError> for CameraError {
    fn from(err: nokhwa::NokhwaError) -> Self {
        use nokhwa::NokhwaError;
        match err {
            NokhwaError::OpenDeviceError(device, error) => {
                let lower = error.to_lowercase();
                if lower.contains("permission") || lower.contains("denied") {
                    CameraError::PermissionDenied(format!("{}: {}", device, error))
                } else {
                    CameraError::Busy(format!("{}: {}", device, error))
                }
            }
            NokhwaError::OpenStreamError(msg) => CameraError::Busy(msg),
            other => CameraError::Backend(other.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Speed test request failed: {0}")]
    Request(String),

    #[error("Speed endpoint returned HTTP {status}")]
    BadStatus { status: u16 },

    #[error("Could not decode speed report: {0}")]
    Decode(String),

    #[error("Invalid decimal value for {field}: {value:?}")]
    Parse { field: &'static str, value: String },

    #[error("Speed test timed out after {duration:?}")]
    Timeout { duration: Duration },
}

impl AudioError {
    /// Message shown next to the microphone check when it fails.
    pub fn user_message(&self) -> String {
        match self {
            AudioError::DeviceNotFound { .. } => "No microphone device found.".to_string(),
            AudioError::OpenTimeout { .. } => {
                "Microphone permission prompt timed out. Please allow access.".to_string()
            }
            AudioError::BuildStream(cpal::BuildStreamError::DeviceNotAvailable) => {
                "Microphone is already in use by another application.".to_string()
            }
            AudioError::NoDataTimeout { .. } => {
                "Microphone produced no audio data.".to_string()
            }
            _ => "An error occurred while accessing the microphone.".to_string(),
        }
    }
}

impl CameraError {
    /// Message shown next to the camera check when it fails.
    pub fn user_message(&self) -> String {
        match self {
            CameraError::NoDevice | CameraError::DeviceNotFound { .. } => {
                "No camera device found.".to_string()
            }
            CameraError::PermissionDenied(_) => {
                "Permission to access the camera was denied.".to_string()
            }
            CameraError::Busy(_) => {
                "Camera is already in use by another application.".to_string()
            }
            _ => "An error occurred while accessing the camera.".to_string(),
        }
    }
}
