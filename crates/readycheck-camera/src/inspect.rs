use nokhwa::Camera;
use readycheck_foundation::CameraError;
use serde::Serialize;
use std::time::{Duration, Instant};

/// What the camera actually delivered: the settled format plus the frame
/// rate achieved while streaming.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CameraReading {
    pub width: u32,
    pub height: u32,
    /// Frame rate the driver reported for the settled format.
    pub frame_rate: f64,
    /// Frame rate observed over the sampling window.
    pub measured_fps: f64,
    pub frames_sampled: u64,
}

impl CameraReading {
    /// Rate used for threshold checks. Some drivers report 0 for the settled
    /// rate; the measured rate stands in for it then.
    pub fn effective_fps(&self) -> f64 {
        if self.frame_rate > 0.0 {
            self.frame_rate
        } else {
            self.measured_fps
        }
    }
}

/// Stream frames for `window` and report settled geometry plus achieved
/// frame rate. The stream is stopped before returning, releasing the device.
pub fn measure(camera: &mut Camera, window: Duration) -> Result<CameraReading, CameraError> {
    let format = camera.camera_format();
    camera.open_stream()?;

    let start = Instant::now();
    let mut frames: u64 = 0;
    let mut first_error = None;

    while start.elapsed() < window {
        match camera.frame() {
            Ok(_) => frames += 1,
            Err(e) => {
                tracing::warn!("Frame read failed after {} frames: {}", frames, e);
                first_error = Some(e);
                break;
            }
        }
    }
    let elapsed = start.elapsed();

    if let Err(e) = camera.stop_stream() {
        tracing::warn!("Failed to stop camera stream: {}", e);
    }

    if frames == 0 {
        return match first_error {
            Some(e) => Err(e.into()),
            None => Err(CameraError::NoFrames { duration: window }),
        };
    }

    let measured_fps = frames as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    Ok(CameraReading {
        width: format.resolution().width(),
        height: format.resolution().height(),
        frame_rate: format.frame_rate() as f64,
        measured_fps,
        frames_sampled: frames,
    })
}
