use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::Camera;
use readycheck_foundation::CameraError;
use serde::Deserialize;

/// Minimum geometry and frame rate the open request asks for. What the
/// device actually grants is checked separately against the thresholds.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CameraConstraints {
    pub min_width: u32,
    pub min_height: u32,
    pub min_frame_rate: u32,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        Self {
            min_width: 640,
            min_height: 480,
            min_frame_rate: 24,
        }
    }
}

impl CameraConstraints {
    fn requested_format(&self) -> RequestedFormat<'static> {
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            Resolution::new(self.min_width, self.min_height),
            FrameFormat::MJPEG,
            self.min_frame_rate,
        )))
    }
}

#[derive(Debug, Clone)]
pub struct CameraDeviceInfo {
    pub index: u32,
    pub name: String,
}

pub struct CameraManager {
    backend: ApiBackend,
}

impl Default for CameraManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraManager {
    pub fn new() -> Self {
        Self {
            backend: ApiBackend::Auto,
        }
    }

    pub fn enumerate(&self) -> Result<Vec<CameraDeviceInfo>, CameraError> {
        let cameras = nokhwa::query(self.backend)?;
        let mut out = Vec::with_capacity(cameras.len());
        for info in cameras {
            let index = match info.index() {
                CameraIndex::Index(i) => *i,
                // String-indexed backends are enumerated positionally
                CameraIndex::String(_) => out.len() as u32,
            };
            out.push(CameraDeviceInfo {
                index,
                name: info.human_name(),
            });
        }
        Ok(out)
    }

    /// Open the camera at `index`, requesting the closest format to the
    /// constraints. Returns the live camera; the settled format is read off
    /// the handle.
    pub fn open(
        &self,
        index: u32,
        constraints: &CameraConstraints,
    ) -> Result<Camera, CameraError> {
        let available = self.enumerate()?;
        if available.is_empty() {
            return Err(CameraError::NoDevice);
        }
        if !available.iter().any(|d| d.index == index) {
            return Err(CameraError::DeviceNotFound { index });
        }

        let camera = Camera::new(CameraIndex::Index(index), constraints.requested_format())?;
        let format = camera.camera_format();
        tracing::info!(
            "Opened camera {} with settled format {}x{} @ {} fps",
            index,
            format.resolution().width(),
            format.resolution().height(),
            format.frame_rate()
        );
        Ok(camera)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_constraints_match_open_request() {
        let c = CameraConstraints::default();
        assert_eq!(c.min_width, 640);
        assert_eq!(c.min_height, 480);
        assert_eq!(c.min_frame_rate, 24);
    }

    #[test]
    fn open_on_missing_index_reports_not_found() {
        let manager = CameraManager::new();
        let devices = match manager.enumerate() {
            Ok(d) => d,
            Err(_) => {
                eprintln!("Skipping open_on_missing_index_reports_not_found: no camera backend");
                return;
            }
        };
        if devices.is_empty() {
            eprintln!("Skipping open_on_missing_index_reports_not_found: no cameras attached");
            return;
        }
        let missing = devices.iter().map(|d| d.index).max().unwrap() + 100;
        let result = manager.open(missing, &CameraConstraints::default());
        assert!(matches!(
            result,
            Err(CameraError::DeviceNotFound { index }) if index == missing
        ));
    }
}
