use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Silence floor: an all-zero buffer reads as -100 dBFS rather than -inf.
const RMS_FLOOR: f64 = 1e-5;

/// Display normalization window: -60 dBFS maps to 0%, 0 dBFS to 100%.
const DISPLAY_RANGE_DB: f64 = 60.0;

/// Smoothing factor for the display level (old * 0.7 + new * 0.3).
const SMOOTHING: f64 = 0.7;

/// Peak-tracking level meter fed from the capture callback.
///
/// `update` runs on the audio thread; readers (probe, dashboard) observe
/// through cheap cloned handles.
#[derive(Clone)]
pub struct LevelMeter {
    inner: Arc<MeterState>,
}

struct MeterState {
    peak_db: RwLock<f64>,
    instant_db: RwLock<f64>,
    level_pct: RwLock<f64>,
    samples_seen: AtomicU64,
    updates: AtomicU64,
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl LevelMeter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MeterState {
                peak_db: RwLock::new(f64::NEG_INFINITY),
                instant_db: RwLock::new(f64::NEG_INFINITY),
                level_pct: RwLock::new(0.0),
                samples_seen: AtomicU64::new(0),
                updates: AtomicU64::new(0),
            }),
        }
    }

    /// Fold one callback's worth of samples into the meter.
    pub fn update(&self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }

        let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        let rms = (sum_sq / samples.len() as f64).sqrt();
        let db = 20.0 * rms.max(RMS_FLOOR).log10();

        {
            let mut peak = self.inner.peak_db.write();
            if db > *peak {
                *peak = db;
            }
        }
        *self.inner.instant_db.write() = db;

        let instant_pct = ((db + DISPLAY_RANGE_DB) / DISPLAY_RANGE_DB).clamp(0.0, 1.0) * 100.0;
        {
            let mut level = self.inner.level_pct.write();
            *level = *level * SMOOTHING + instant_pct * (1.0 - SMOOTHING);
        }

        self.inner
            .samples_seen
            .fetch_add(samples.len() as u64, Ordering::Relaxed);
        self.inner.updates.fetch_add(1, Ordering::Relaxed);
    }

    /// Loudest level observed since the last reset, in dBFS.
    pub fn peak_db(&self) -> f64 {
        *self.inner.peak_db.read()
    }

    /// Level of the most recent callback, in dBFS.
    pub fn instant_db(&self) -> f64 {
        *self.inner.instant_db.read()
    }

    /// Smoothed display level in 0..=100.
    pub fn level_percent(&self) -> f64 {
        *self.inner.level_pct.read()
    }

    pub fn samples_seen(&self) -> u64 {
        self.inner.samples_seen.load(Ordering::Relaxed)
    }

    pub fn updates(&self) -> u64 {
        self.inner.updates.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        *self.inner.peak_db.write() = f64::NEG_INFINITY;
        *self.inner.instant_db.write() = f64::NEG_INFINITY;
        *self.inner.level_pct.write() = 0.0;
        self.inner.samples_seen.store(0, Ordering::Relaxed);
        self.inner.updates.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn silence_reads_as_floor() {
        let meter = LevelMeter::new();
        meter.update(&[0.0; 1024]);
        assert!(approx(meter.instant_db(), -100.0, 0.01));
        assert!(approx(meter.peak_db(), -100.0, 0.01));
        assert!(approx(meter.level_percent(), 0.0, 0.01));
    }

    #[test]
    fn full_scale_square_reads_near_zero_db() {
        let meter = LevelMeter::new();
        // Alternating +-1.0 has RMS exactly 1.0 -> 0 dBFS.
        let samples: Vec<f32> = (0..1024).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        meter.update(&samples);
        assert!(approx(meter.instant_db(), 0.0, 0.01));
    }

    #[test]
    fn half_scale_constant_reads_minus_six_db() {
        let meter = LevelMeter::new();
        meter.update(&[0.5; 2048]);
        // 20*log10(0.5) = -6.02 dB
        assert!(approx(meter.instant_db(), -6.02, 0.05));
    }

    #[test]
    fn peak_holds_across_quieter_updates() {
        let meter = LevelMeter::new();
        meter.update(&[0.5; 512]);
        let loud = meter.peak_db();
        meter.update(&[0.01; 512]);
        assert_eq!(meter.peak_db(), loud);
        assert!(meter.instant_db() < loud);
    }

    #[test]
    fn display_level_smooths_toward_instant() {
        let meter = LevelMeter::new();
        // -6 dB -> instant display (60-6)/60*100 = 90%
        meter.update(&[0.5; 512]);
        let first = meter.level_percent();
        assert!(approx(first, 27.0, 0.5), "first = {first}");
        meter.update(&[0.5; 512]);
        let second = meter.level_percent();
        assert!(second > first && second < 90.0);
        // Converges toward 90 over repeated updates
        for _ in 0..50 {
            meter.update(&[0.5; 512]);
        }
        assert!(approx(meter.level_percent(), 90.0, 1.0));
    }

    #[test]
    fn display_level_is_clamped() {
        let meter = LevelMeter::new();
        for _ in 0..100 {
            let samples: Vec<f32> = (0..512).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
            meter.update(&samples);
        }
        assert!(meter.level_percent() <= 100.0);
    }

    #[test]
    fn empty_update_is_ignored() {
        let meter = LevelMeter::new();
        meter.update(&[]);
        assert_eq!(meter.samples_seen(), 0);
        assert_eq!(meter.peak_db(), f64::NEG_INFINITY);
    }

    #[test]
    fn reset_clears_all_state() {
        let meter = LevelMeter::new();
        meter.update(&[0.5; 512]);
        assert!(meter.samples_seen() > 0);
        meter.reset();
        assert_eq!(meter.samples_seen(), 0);
        assert_eq!(meter.peak_db(), f64::NEG_INFINITY);
        assert_eq!(meter.level_percent(), 0.0);
    }
}
