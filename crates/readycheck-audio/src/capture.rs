use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use readycheck_foundation::{real_clock, AudioError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::device::DeviceManager;
use super::meter::LevelMeter;
use super::watchdog::WatchdogTimer;

const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings the device actually granted.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub name: String,
    pub sample_rate: u32,
    pub channels: u16,
}

#[derive(Debug, Default)]
pub struct CaptureStats {
    pub callbacks: AtomicU64,
    pub samples: AtomicU64,
    pub stream_errors: AtomicU64,
}

/// Handle to the dedicated capture thread. The cpal stream is not Send, so
/// it is built and dropped entirely inside the thread; this handle only
/// carries the shutdown flag and shared observers.
pub struct LevelCaptureThread {
    handle: JoinHandle<()>,
    shutdown: Arc<AtomicBool>,
    stats: Arc<CaptureStats>,
    watchdog: WatchdogTimer,
}

impl LevelCaptureThread {
    /// Open the requested (or default) microphone and start metering.
    ///
    /// Blocks until the device reports a negotiated config or `open_timeout`
    /// elapses. A hung permission prompt or driver surfaces as
    /// `AudioError::OpenTimeout`; the abandoned thread tears itself down once
    /// the blocked open call returns.
    pub fn spawn(
        device_name: Option<String>,
        meter: LevelMeter,
        open_timeout: Duration,
    ) -> Result<(Self, DeviceConfig), AudioError> {
        let running = Arc::new(AtomicBool::new(true));
        let shutdown = Arc::clone(&running);
        let stats = Arc::new(CaptureStats::default());
        let watchdog = WatchdogTimer::new(WATCHDOG_TIMEOUT, real_clock());
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<DeviceConfig, AudioError>>(1);

        let thread_stats = Arc::clone(&stats);
        let thread_watchdog = watchdog.clone();
        let thread_running = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("level-capture".to_string())
            .spawn(move || {
                let mut capture = match LevelCapture::new(
                    meter,
                    thread_stats,
                    thread_watchdog,
                    Arc::clone(&thread_running),
                ) {
                    Ok(c) => c,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                match capture.start(device_name.as_deref()) {
                    Ok(cfg) => {
                        tracing::info!(
                            "Level capture started on '{}' ({} Hz, {} ch)",
                            cfg.name,
                            cfg.sample_rate,
                            cfg.channels
                        );
                        let _ = ready_tx.send(Ok(cfg));
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                }

                while thread_running.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(50));
                }

                capture.stop();
                tracing::info!("Level capture thread shut down");
            })
            .map_err(|e| AudioError::Fatal(format!("Failed to spawn capture thread: {}", e)))?;

        match ready_rx.recv_timeout(open_timeout) {
            Ok(Ok(cfg)) => Ok((
                Self {
                    handle,
                    shutdown,
                    stats,
                    watchdog,
                },
                cfg,
            )),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                // Detach: the thread notices the cleared flag as soon as the
                // blocked open returns.
                shutdown.store(false, Ordering::SeqCst);
                Err(AudioError::OpenTimeout {
                    duration: open_timeout,
                })
            }
        }
    }

    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    pub fn watchdog_triggered(&self) -> bool {
        self.watchdog.is_triggered()
    }

    /// Stop capturing and release the microphone handle.
    pub fn stop(self) {
        self.shutdown.store(false, Ordering::SeqCst);
        let _ = self.handle.join();
    }
}

struct LevelCapture {
    device_manager: DeviceManager,
    stream: Option<Stream>,
    meter: LevelMeter,
    stats: Arc<CaptureStats>,
    watchdog: WatchdogTimer,
    running: Arc<AtomicBool>,
}

impl LevelCapture {
    fn new(
        meter: LevelMeter,
        stats: Arc<CaptureStats>,
        watchdog: WatchdogTimer,
        running: Arc<AtomicBool>,
    ) -> Result<Self, AudioError> {
        Ok(Self {
            device_manager: DeviceManager::new()?,
            stream: None,
            meter,
            stats,
            watchdog,
            running,
        })
    }

    fn start(&mut self, device_name: Option<&str>) -> Result<DeviceConfig, AudioError> {
        let device = self.device_manager.open_device(device_name)?;
        let name = device.name().unwrap_or_else(|_| "unknown".to_string());
        tracing::info!(
            "Selected input device: {} (host: {:?})",
            name,
            self.device_manager.host_id()
        );

        let (config, sample_format) = negotiate_config(&device)?;
        let device_config = DeviceConfig {
            name,
            sample_rate: config.sample_rate.0,
            channels: config.channels,
        };

        let stream = self.build_stream(device, config, sample_format)?;
        stream.play()?;
        self.stream = Some(stream);
        self.watchdog.start(Arc::clone(&self.running));

        Ok(device_config)
    }

    fn build_stream(
        &mut self,
        device: cpal::Device,
        config: StreamConfig,
        sample_format: SampleFormat,
    ) -> Result<Stream, AudioError> {
        let meter = self.meter.clone();
        let stats = Arc::clone(&self.stats);
        let watchdog = self.watchdog.clone();
        let running = Arc::clone(&self.running);

        let err_stats = Arc::clone(&self.stats);
        let err_fn = move |err: cpal::StreamError| {
            tracing::error!("Audio stream error: {}", err);
            err_stats.stream_errors.fetch_add(1, Ordering::Relaxed);
        };

        let handle_f32 = move |data: &[f32]| {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            watchdog.feed();
            meter.update(data);
            stats.callbacks.fetch_add(1, Ordering::Relaxed);
            stats.samples.fetch_add(data.len() as u64, Ordering::Relaxed);
        };

        // Convert integer formats to f32 without allocating in the callback
        thread_local! {
            static CONVERT_BUFFER: std::cell::RefCell<Vec<f32>> = const { std::cell::RefCell::new(Vec::new()) };
        }

        let stream = match sample_format {
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _: &_| {
                    handle_f32(data);
                },
                err_fn,
                None,
            )?,
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _: &_| {
                    CONVERT_BUFFER.with(|buf| {
                        let mut converted = buf.borrow_mut();
                        converted.clear();
                        converted.reserve(data.len());
                        for &s in data {
                            converted.push(s as f32 / 32768.0);
                        }
                        handle_f32(&converted);
                    });
                },
                err_fn,
                None,
            )?,
            SampleFormat::U16 => device.build_input_stream(
                &config,
                move |data: &[u16], _: &_| {
                    CONVERT_BUFFER.with(|buf| {
                        let mut converted = buf.borrow_mut();
                        converted.clear();
                        converted.reserve(data.len());
                        // Center unsigned [0,65535] before scaling
                        for &s in data {
                            converted.push((s as f32 - 32768.0) / 32768.0);
                        }
                        handle_f32(&converted);
                    });
                },
                err_fn,
                None,
            )?,
            other => {
                return Err(AudioError::FormatNotSupported {
                    format: format!("{:?}", other),
                });
            }
        };

        Ok(stream)
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
        }
        self.watchdog.stop();
    }
}

fn negotiate_config(device: &cpal::Device) -> Result<(StreamConfig, SampleFormat), AudioError> {
    if let Ok(default_config) = device.default_input_config() {
        return Ok((
            StreamConfig {
                channels: default_config.channels(),
                sample_rate: default_config.sample_rate(),
                buffer_size: cpal::BufferSize::Default,
            },
            default_config.sample_format(),
        ));
    }

    // Fall back to the first advertised config
    if let Ok(configs) = device.supported_input_configs() {
        if let Some(config) = configs.into_iter().next() {
            return Ok((config.with_max_sample_rate().into(), config.sample_format()));
        }
    }

    Err(AudioError::FormatNotSupported {
        format: "No supported audio formats".to_string(),
    })
}
