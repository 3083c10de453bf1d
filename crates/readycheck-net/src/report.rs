use readycheck_foundation::NetworkError;
use serde::{Deserialize, Serialize};

/// Wire shape of `GET /api/network`: all three values arrive as decimal
/// strings.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSpeedStats {
    pub download: String,
    pub upload: String,
    pub ping: String,
}

/// Parsed speed sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpeedSample {
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub ping_ms: f64,
}

impl TryFrom<RawSpeedStats> for SpeedSample {
    type Error = NetworkError;

    fn try_from(raw: RawSpeedStats) -> Result<Self, NetworkError> {
        Ok(Self {
            download_mbps: parse_decimal("download", &raw.download)?,
            upload_mbps: parse_decimal("upload", &raw.upload)?,
            ping_ms: parse_decimal("ping", &raw.ping)?,
        })
    }
}

fn parse_decimal(field: &'static str, value: &str) -> Result<f64, NetworkError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| NetworkError::Parse {
            field,
            value: value.to_string(),
        })
}
