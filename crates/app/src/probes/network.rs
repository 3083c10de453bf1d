use super::common::{CheckContext, CheckError, CheckReport};
use super::SystemCheck;
use readycheck_net::{HttpSpeedEndpoint, SpeedEndpoint, SpeedSample};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Fetches one sample from the external speed endpoint and thresholds it.
/// Ping is reported but never gated on.
#[derive(Default)]
pub struct NetworkCheck {
    endpoint: Option<Box<dyn SpeedEndpoint>>,
}

impl NetworkCheck {
    pub fn new() -> Self {
        Self { endpoint: None }
    }

    /// Substitute the sample source (tests, canned demos).
    pub fn with_endpoint(endpoint: Box<dyn SpeedEndpoint>) -> Self {
        Self {
            endpoint: Some(endpoint),
        }
    }
}

#[async_trait::async_trait]
impl SystemCheck for NetworkCheck {
    fn name(&self) -> &'static str {
        "network"
    }

    async fn run(&mut self, ctx: &CheckContext) -> Result<CheckReport, CheckError> {
        let sample: SpeedSample = match &self.endpoint {
            Some(endpoint) => endpoint.fetch().await?,
            None => {
                HttpSpeedEndpoint::new(&ctx.endpoint_base, REQUEST_TIMEOUT)?
                    .fetch()
                    .await?
            }
        };

        let min_download = ctx.thresholds.network.min_download_mbps();
        let min_upload = ctx.thresholds.network.min_upload_mbps();
        let pass = sample.download_mbps >= min_download && sample.upload_mbps >= min_upload;

        let metrics = HashMap::from([
            ("download_mbps".to_string(), json!(sample.download_mbps)),
            ("upload_mbps".to_string(), json!(sample.upload_mbps)),
            ("ping_ms".to_string(), json!(sample.ping_ms)),
        ]);

        let notes = if pass {
            None
        } else {
            Some(format!(
                "Network too slow. Requires at least {:.0} Mbps upload/download.",
                min_download.max(min_upload)
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
    use readycheck_foundation::NetworkError;

    struct CannedEndpoint(SpeedSample);

    #[async_trait::async_trait]
    impl SpeedEndpoint for CannedEndpoint {
        async fn fetch(&self) -> Result<SpeedSample, NetworkError> {
            Ok(self.0)
        }
    }

    struct FailingEndpoint;

    #[async_trait::async_trait]
    impl SpeedEndpoint for FailingEndpoint {
        async fn fetch(&self) -> Result<SpeedSample, NetworkError> {
            Err(NetworkError::BadStatus { status: 502 })
        }
    }

    fn sample(download: f64, upload: f64, ping: f64) -> SpeedSample {
        SpeedSample {
            download_mbps: download,
            upload_mbps: upload,
            ping_ms: ping,
        }
    }

    #[tokio::test]
    async fn fast_connection_passes() {
        let mut check = NetworkCheck::with_endpoint(Box::new(CannedEndpoint(sample(
            42.7, 11.3, 28.0,
        ))));
        let report = check.run(&CheckContext::default()).await.unwrap();
        assert!(report.pass);
        assert!(report.notes.is_none());
        assert_eq!(report.metrics["ping_ms"], serde_json::json!(28.0));
    }

    #[tokio::test]
    async fn boundary_speeds_pass() {
        let mut check =
            NetworkCheck::with_endpoint(Box::new(CannedEndpoint(sample(2.0, 2.0, 300.0))));
        let report = check.run(&CheckContext::default()).await.unwrap();
        assert!(report.pass, "2.0/2.0 Mbps is exactly the minimum");
    }

    #[tokio::test]
    async fn slow_upload_fails_even_with_fast_download() {
        let mut check =
            NetworkCheck::with_endpoint(Box::new(CannedEndpoint(sample(100.0, 1.9, 10.0))));
        let report = check.run(&CheckContext::default()).await.unwrap();
        assert!(!report.pass);
        assert!(report.notes.unwrap().contains("Network too slow"));
    }

    #[tokio::test]
    async fn high_ping_alone_does_not_fail() {
        let mut check =
            NetworkCheck::with_endpoint(Box::new(CannedEndpoint(sample(10.0, 10.0, 900.0))));
        let report = check.run(&CheckContext::default()).await.unwrap();
        assert!(report.pass);
    }

    #[tokio::test]
    async fn endpoint_failure_maps_to_the_retry_message() {
        let mut check = NetworkCheck::with_endpoint(Box::new(FailingEndpoint));
        let err = check.run(&CheckContext::default()).await.unwrap_err();
        assert_eq!(err.message, "Failed to run network test. Please try again.");
    }
}
