use super::common::{CheckContext, CheckError, CheckReport};
use super::SystemCheck;
use readycheck_camera::{measure, CameraConstraints, CameraManager, CameraReading};
use readycheck_foundation::CameraError;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

/// How long the camera streams while the achieved frame rate is measured.
const SAMPLE_WINDOW: Duration = Duration::from_secs(2);

#[derive(Default)]
pub struct CameraCheck;

impl CameraCheck {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl SystemCheck for CameraCheck {
    fn name(&self) -> &'static str {
        "camera"
    }

    async fn run(&mut self, ctx: &CheckContext) -> Result<CheckReport, CheckError> {
        let index = ctx.camera_index;
        let thresholds = ctx.thresholds.camera;

        // The camera handle stays on the blocking thread for its whole life;
        // only the reading crosses back.
        let reading = tokio::task::spawn_blocking(move || -> Result<CameraReading, CameraError> {
            let manager = CameraManager::new();
            let mut camera = manager.open(index, &CameraConstraints::default())?;
            measure(&mut camera, SAMPLE_WINDOW)
        })
        .await
        .map_err(|e| CheckError::internal(format!("camera task panicked: {}", e)))??;

        let min_width = thresholds.min_width();
        let min_height = thresholds.min_height();
        let min_fps = thresholds.min_fps();
        let fps = reading.effective_fps();
        let pass = reading.width >= min_width && reading.height >= min_height && fps >= min_fps;

        let metrics = HashMap::from([
            ("width".to_string(), json!(reading.width)),
            ("height".to_string(), json!(reading.height)),
            ("frame_rate".to_string(), json!(reading.frame_rate)),
            (
                "measured_fps".to_string(),
                json!((reading.measured_fps * 10.0).round() / 10.0),
            ),
            ("frames_sampled".to_string(), json!(reading.frames_sampled)),
        ]);

        let notes = if pass {
            None
        } else {
            Some(format!(
                "Camera quality too low. Got {}x{} at {:.0} FPS. Minimum is {}x{} @ {:.0} FPS.",
                reading.width, reading.height, fps, min_width, min_height, min_fps
            ))
        };

        Ok(CheckReport {
            check: self.name().to_string(),
            pass,
            metrics,
            notes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::thresholds::CameraThresholds;

    fn reading(width: u32, height: u32, fps: f64) -> CameraReading {
        CameraReading {
            width,
            height,
            frame_rate: fps,
            measured_fps: fps,
            frames_sampled: 48,
        }
    }

    fn passes(r: &CameraReading, t: &CameraThresholds) -> bool {
        r.width >= t.min_width() && r.height >= t.min_height() && r.effective_fps() >= t.min_fps()
    }

    #[test]
    fn settled_format_at_threshold_passes() {
        let t = CameraThresholds::default();
        assert!(passes(&reading(480, 480, 24.0), &t));
        assert!(passes(&reading(1280, 720, 30.0), &t));
    }

    #[test]
    fn low_geometry_or_rate_fails() {
        let t = CameraThresholds::default();
        assert!(!passes(&reading(320, 240, 30.0), &t));
        assert!(!passes(&reading(640, 360, 30.0), &t));
        assert!(!passes(&reading(640, 480, 15.0), &t));
    }
}
