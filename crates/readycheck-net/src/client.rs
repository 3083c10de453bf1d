use async_trait::async_trait;
use readycheck_foundation::NetworkError;
use std::time::Duration;

use crate::report::{RawSpeedStats, SpeedSample};

pub const SPEED_ENDPOINT_PATH: &str = "/api/network";

/// Source of speed samples. The HTTP implementation talks to the external
/// measurement endpoint; tests substitute canned or failing sources.
#[async_trait]
pub trait SpeedEndpoint: Send + Sync {
    async fn fetch(&self) -> Result<SpeedSample, NetworkError>;
}

pub struct HttpSpeedEndpoint {
    url: reqwest::Url,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpSpeedEndpoint {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, NetworkError> {
        let base: reqwest::Url = base_url
            .parse()
            .map_err(|e| NetworkError::Request(format!("invalid base url {:?}: {}", base_url, e)))?;
        let url = base
            .join(SPEED_ENDPOINT_PATH)
            .map_err(|e| NetworkError::Request(format!("invalid endpoint url: {}", e)))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkError::Request(e.to_string()))?;
        Ok(Self {
            url,
            client,
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }
}

#[async_trait]
impl SpeedEndpoint for HttpSpeedEndpoint {
    async fn fetch(&self) -> Result<SpeedSample, NetworkError> {
        tracing::debug!("Fetching speed sample from {}", self.url);

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NetworkError::Timeout {
                        duration: self.timeout,
                    }
                } else {
                    NetworkError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::BadStatus {
                status: status.as_u16(),
            });
        }

        let raw: RawSpeedStats = response
            .json()
            .await
            .map_err(|e| NetworkError::Decode(e.to_string()))?;

        SpeedSample::try_from(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_is_joined_onto_the_base() {
        let endpoint =
            HttpSpeedEndpoint::new("http://127.0.0.1:3000", Duration::from_secs(5)).unwrap();
        assert_eq!(endpoint.url(), "http://127.0.0.1:3000/api/network");
    }

    #[test]
    fn base_path_is_replaced_not_extended() {
        // Rooted join semantics: the endpoint path is absolute.
        let endpoint =
            HttpSpeedEndpoint::new("http://example.test/somewhere", Duration::from_secs(5))
                .unwrap();
        assert_eq!(endpoint.url(), "http://example.test/api/network");
    }

    #[test]
    fn garbage_base_url_is_rejected() {
        let result = HttpSpeedEndpoint::new("not a url", Duration::from_secs(5));
        assert!(matches!(result, Err(NetworkError::Request(_))));
    }
}
