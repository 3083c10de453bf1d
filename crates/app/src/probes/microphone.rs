use super::common::{CheckContext, CheckError, CheckErrorKind, CheckReport};
use super::SystemCheck;
use readycheck_audio::{LevelCaptureThread, LevelMeter};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::time::Duration;

/// Bound on device open + permission prompt.
const OPEN_TIMEOUT: Duration = Duration::from_secs(10);

pub struct MicrophoneCheck {
    meter: LevelMeter,
}

impl Default for MicrophoneCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl MicrophoneCheck {
    pub fn new() -> Self {
        Self {
            meter: LevelMeter::new(),
        }
    }

    /// Handle for live observation (dashboard level gauge) while the check
    /// is running.
    pub fn meter(&self) -> LevelMeter {
        self.meter.clone()
    }
}

#[async_trait::async_trait]
impl SystemCheck for MicrophoneCheck {
    fn name(&self) -> &'static str {
        "microphone"
    }

    async fn run(&mut self, ctx: &CheckContext) -> Result<CheckReport, CheckError> {
        self.meter.reset();

        let device = ctx.device.clone();
        let meter = self.meter.clone();
        let (capture, config) = tokio::task::spawn_blocking(move || {
            LevelCaptureThread::spawn(device, meter, OPEN_TIMEOUT)
        })
        .await
        .map_err(|e| CheckError::internal(format!("capture task panicked: {}", e)))??;

        tracing::info!(
            "Metering '{}' for {:?}; speak into the microphone",
            config.name,
            ctx.duration
        );
        tokio::time::sleep(ctx.duration).await;

        let watchdog_triggered = capture.watchdog_triggered();
        let callbacks = capture.stats().callbacks.load(Ordering::Relaxed);
        let stream_errors = capture.stats().stream_errors.load(Ordering::Relaxed);

        // Release the device before judging the window
        tokio::task::spawn_blocking(move || capture.stop())
            .await
            .map_err(|e| CheckError::internal(format!("capture stop panicked: {}", e)))?;

        if self.meter.samples_seen() == 0 || watchdog_triggered {
            return Err(CheckError {
                kind: CheckErrorKind::Device,
                message: "Microphone produced no audio data.".to_string(),
            });
        }

        let peak_db = self.meter.peak_db();
        let min_peak_db = ctx.thresholds.microphone.min_peak_db();
        let pass = peak_db >= min_peak_db;

        let metrics = HashMap::from([
            ("device".to_string(), json!(config.name)),
            ("sample_rate".to_string(), json!(config.sample_rate)),
            ("channels".to_string(), json!(config.channels)),
            (
                "peak_db".to_string(),
                json!((peak_db * 10.0).round() / 10.0),
            ),
            (
                "level_percent".to_string(),
                json!((self.meter.level_percent() * 10.0).round() / 10.0),
            ),
            ("samples".to_string(), json!(self.meter.samples_seen())),
            ("callbacks".to_string(), json!(callbacks)),
            ("stream_errors".to_string(), json!(stream_errors)),
        ]);

        let notes = if pass {
            None
        } else {
            Some(format!(
                "Microphone input too quiet. Max level was {:.1} dB. Minimum required is {:.0} dB.",
                peak_db, min_peak_db
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
