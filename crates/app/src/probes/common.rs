use readycheck_foundation::{AudioError, CameraError, NetworkError};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::thresholds::Thresholds;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckReport {
    pub check: String,
    pub pass: bool,
    pub metrics: HashMap<String, JsonValue>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckErrorKind {
    Setup,
    Device,
    Permission,
    Timeout,
    Internal,
}

#[derive(Debug, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct CheckError {
    pub kind: CheckErrorKind,
    pub message: String,
}

impl CheckError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: CheckErrorKind::Internal,
            message: message.into(),
        }
    }
}

impl From<AudioError> for CheckError {
    fn from(err: AudioError) -> Self {
        let kind = match &err {
            AudioError::DeviceNotFound { .. } | AudioError::DeviceDisconnected => {
                CheckErrorKind::Device
            }
            AudioError::OpenTimeout { .. } | AudioError::NoDataTimeout { .. } => {
                CheckErrorKind::Timeout
            }
            AudioError::BuildStream(cpal::BuildStreamError::DeviceNotAvailable) => {
                CheckErrorKind::Device
            }
            AudioError::FormatNotSupported { .. } => CheckErrorKind::Setup,
            _ => CheckErrorKind::Internal,
        };
        Self {
            kind,
            message: err.user_message(),
        }
    }
}

impl From<CameraError> for CheckError {
    fn from(err: CameraError) -> Self {
        let kind = match &err {
            CameraError::NoDevice | CameraError::DeviceNotFound { .. } | CameraError::Busy(_) => {
                CheckErrorKind::Device
            }
            CameraError::PermissionDenied(_) => CheckErrorKind::Permission,
            CameraError::NoFrames { .. } => CheckErrorKind::Timeout,
            CameraError::Backend(_) => CheckErrorKind::Internal,
        };
        Self {
            kind,
            message: err.user_message(),
        }
    }
}

impl From<NetworkError> for CheckError {
    fn from(err: NetworkError) -> Self {
        let kind = match &err {
            NetworkError::Timeout { .. } => CheckErrorKind::Timeout,
            _ => CheckErrorKind::Internal,
        };
        tracing::warn!("Network test error: {}", err);
        Self {
            kind,
            message: "Failed to run network test. Please try again.".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckContext {
    /// Microphone device name; None selects the OS default.
    pub device: Option<String>,
    pub camera_index: u32,
    /// Microphone metering window.
    pub duration: Duration,
    /// Base URL of the speed measurement endpoint.
    pub endpoint_base: String,
    pub thresholds: Thresholds,
    pub output_dir: Option<PathBuf>,
}

impl Default for CheckContext {
    fn default() -> Self {
        Self {
            device: None,
            camera_index: 0,
            duration: Duration::from_secs(8),
            endpoint_base: "http://127.0.0.1:3000".to_string(),
            thresholds: Thresholds::default(),
            output_dir: None,
        }
    }
}

pub fn ensure_results_dir(base: Option<&Path>) -> std::io::Result<PathBuf> {
    let dir = if let Some(base) = base {
        base.to_path_buf()
    } else {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        cwd.join(".readycheck").join("check_runs")
    };
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn write_report_json(dir: &Path, report: &CheckReport) -> std::io::Result<PathBuf> {
    let ts = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    let file = dir.join(format!("{}_{}.json", report.check, ts));
    let data = serde_json::to_vec_pretty(report).expect("serialize report");
    std::fs::write(&file, data)?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn audio_open_timeout_maps_to_timeout_kind() {
        let err: CheckError = AudioError::OpenTimeout {
            duration: Duration::from_secs(10),
        }
        .into();
        assert_eq!(err.kind, CheckErrorKind::Timeout);
        assert!(err.message.contains("timed out"));
    }

    #[test]
    fn camera_permission_maps_to_permission_kind() {
        let err: CheckError = CameraError::PermissionDenied("v4l2".to_string()).into();
        assert_eq!(err.kind, CheckErrorKind::Permission);
        assert_eq!(err.message, "Permission to access the camera was denied.");
    }

    #[test]
    fn network_errors_collapse_to_one_user_message() {
        for source in [
            NetworkError::BadStatus { status: 503 },
            NetworkError::Decode("eof".to_string()),
            NetworkError::Request("connection refused".to_string()),
        ] {
            let err: CheckError = source.into();
            assert_eq!(err.message, "Failed to run network test. Please try again.");
        }
    }

    #[test]
    fn report_json_lands_in_the_results_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = ensure_results_dir(Some(tmp.path())).unwrap();
        let report = CheckReport {
            check: "network".to_string(),
            pass: true,
            metrics: HashMap::from([("download_mbps".to_string(), json!(42.7))]),
            notes: None,
        };
        let path = write_report_json(&dir, &report).unwrap();
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("network_"));
        assert!(name.ends_with(".json"));
        let parsed: CheckReport =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert!(parsed.pass);
        assert_eq!(parsed.metrics["download_mbps"], json!(42.7));
    }

    #[test]
    fn results_dir_defaults_under_cwd() {
        let dir = ensure_results_dir(None).unwrap();
        assert!(dir.ends_with(".readycheck/check_runs"));
        assert!(dir.exists());
    }
}
