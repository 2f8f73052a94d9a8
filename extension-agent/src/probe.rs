use std::time;

use http::StatusCode;
use tracing::{info, warn};

/// Result of a single diagnostic request.
#[derive(Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    Success,
    UnexpectedStatus(StatusCode),
    RequestFailed,
}

/// Out-of-band connectivity check against an arbitrary endpoint. Failures are only logged:
/// the result never affects the agent lifecycle.
pub struct DiagnosticProbe {
    endpoint: String,
    client: reqwest::Client,
}

impl DiagnosticProbe {
    pub fn new(endpoint: &str, timeout: time::Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent("lifecycle-extension-agent")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            endpoint: endpoint.to_owned(),
            client,
        })
    }

    pub async fn check(&self) -> ProbeOutcome {
        info!(endpoint = %self.endpoint, "attempting diagnostic GET request");

        match self.client.get(&self.endpoint).send().await {
            Ok(response) if response.status() == StatusCode::OK => {
                info!(
                    endpoint = %self.endpoint,
                    status = %response.status(),
                    "diagnostic request succeeded"
                );
                ProbeOutcome::Success
            }
            Ok(response) => {
                warn!(
                    endpoint = %self.endpoint,
                    status = %response.status(),
                    "diagnostic request returned unexpected status"
                );
                ProbeOutcome::UnexpectedStatus(response.status())
            }
            Err(error) => {
                warn!(endpoint = %self.endpoint, %error, "diagnostic request failed");
                ProbeOutcome::RequestFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_probe_outcomes() {
        let server = MockServer::start_async().await;
        let ok = server
            .mock_async(|when, then| {
                when.method(GET).path("/ok");
                then.status(200).body("fine");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/unavailable");
                then.status(503);
            })
            .await;

        let timeout = time::Duration::from_secs(5);

        let probe = DiagnosticProbe::new(&server.url("/ok"), timeout).unwrap();
        assert_eq!(probe.check().await, ProbeOutcome::Success);
        ok.assert_hits_async(1).await;

        let probe = DiagnosticProbe::new(&server.url("/unavailable"), timeout).unwrap();
        assert_eq!(
            probe.check().await,
            ProbeOutcome::UnexpectedStatus(StatusCode::SERVICE_UNAVAILABLE)
        );

        let probe = DiagnosticProbe::new("http://127.0.0.1:1/", timeout).unwrap();
        assert_eq!(probe.check().await, ProbeOutcome::RequestFailed);

        let probe = DiagnosticProbe::new("not a url", timeout).unwrap();
        assert_eq!(probe.check().await, ProbeOutcome::RequestFailed);
    }

    #[tokio::test]
    async fn test_probe_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/slow");
                then.status(200).delay(time::Duration::from_secs(2));
            })
            .await;

        let probe =
            DiagnosticProbe::new(&server.url("/slow"), time::Duration::from_millis(100)).unwrap();

        assert_eq!(probe.check().await, ProbeOutcome::RequestFailed);
    }
}
