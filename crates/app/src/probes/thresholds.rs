use serde::Deserialize;

// Acceptance thresholds. The camera numbers are deliberately looser than the
// open request (640x480 requested, 480x480 accepted): a device that settles
// slightly below the requested geometry can still pass.
pub const DEFAULT_MIN_CAMERA_WIDTH: u32 = 480;
pub const DEFAULT_MIN_CAMERA_HEIGHT: u32 = 480;
pub const DEFAULT_MIN_CAMERA_FPS: f64 = 24.0;
pub const DEFAULT_MIN_PEAK_DB: f64 = -40.0;
pub const DEFAULT_MIN_DOWNLOAD_MBPS: f64 = 2.0;
pub const DEFAULT_MIN_UPLOAD_MBPS: f64 = 2.0;

#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct CameraThresholds {
    pub min_width: Option<u32>,
    pub min_height: Option<u32>,
    pub min_fps: Option<f64>,
}

impl CameraThresholds {
    pub fn min_width(&self) -> u32 {
        self.min_width.unwrap_or(DEFAULT_MIN_CAMERA_WIDTH)
    }

    pub fn min_height(&self) -> u32 {
        self.min_height.unwrap_or(DEFAULT_MIN_CAMERA_HEIGHT)
    }

    pub fn min_fps(&self) -> f64 {
        self.min_fps.unwrap_or(DEFAULT_MIN_CAMERA_FPS)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct MicrophoneThresholds {
    pub min_peak_db: Option<f64>,
}

impl MicrophoneThresholds {
    pub fn min_peak_db(&self) -> f64 {
        self.min_peak_db.unwrap_or(DEFAULT_MIN_PEAK_DB)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct NetworkThresholds {
    pub min_download_mbps: Option<f64>,
    pub min_upload_mbps: Option<f64>,
}

impl NetworkThresholds {
    pub fn min_download_mbps(&self) -> f64 {
        self.min_download_mbps.unwrap_or(DEFAULT_MIN_DOWNLOAD_MBPS)
    }

    pub fn min_upload_mbps(&self) -> f64 {
        self.min_upload_mbps.unwrap_or(DEFAULT_MIN_UPLOAD_MBPS)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct Thresholds {
    #[serde(default)]
    pub camera: CameraThresholds,
    #[serde(default)]
    pub microphone: MicrophoneThresholds,
    #[serde(default)]
    pub network: NetworkThresholds,
}

pub fn load_from_file(path: &std::path::Path) -> anyhow::Result<Thresholds> {
    let s = std::fs::read_to_string(path)?;
    let t: Thresholds = toml::from_str(&s)?;
    Ok(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_fixed_acceptance_values() {
        let t = Thresholds::default();
        assert_eq!(t.camera.min_width(), 480);
        assert_eq!(t.camera.min_height(), 480);
        assert_eq!(t.camera.min_fps(), 24.0);
        assert_eq!(t.microphone.min_peak_db(), -40.0);
        assert_eq!(t.network.min_download_mbps(), 2.0);
        assert_eq!(t.network.min_upload_mbps(), 2.0);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let t: Thresholds = toml::from_str(
            r#"
            [microphone]
            min_peak_db = -50.0

            [network]
            min_download_mbps = 5.0
            "#,
        )
        .unwrap();
        assert_eq!(t.microphone.min_peak_db(), -50.0);
        assert_eq!(t.network.min_download_mbps(), 5.0);
        assert_eq!(t.network.min_upload_mbps(), 2.0);
        assert_eq!(t.camera.min_width(), 480);
    }

    #[test]
    fn empty_toml_is_all_defaults() {
        let t: Thresholds = toml::from_str("").unwrap();
        assert_eq!(t.camera.min_fps(), 24.0);
    }

    #[test]
    fn load_from_file_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("thresholds.toml");
        std::fs::write(&path, "[camera]\nmin_width = 640\n").unwrap();
        let t = load_from_file(&path).unwrap();
        assert_eq!(t.camera.min_width(), 640);
        assert_eq!(t.camera.min_height(), 480);
    }
}
