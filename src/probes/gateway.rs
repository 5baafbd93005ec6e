//! IPFS gateway latency checks.
//!
//! Each gateway is asked for a small pinned artifact and the full round
//! trip is timed. The artifact content is verified, so a gateway serving
//! error pages with a 200 status still fails the check.

use std::time::Duration;

use async_trait::async_trait;

use teia_status_types::{HealthReport, ProbeId};

use crate::client::{ProbeError, GATEWAY_TIMEOUT};
use crate::probe::{CheckContext, Probe};

/// Round trips faster than this count as responsive.
const RESPONSIVE_LIMIT: Duration = Duration::from_millis(5000);

/// What the fetched artifact must look like.
enum Expectation {
    /// Any non-empty body (the pinned artifact is a small image).
    NonEmpty,
    /// The body must equal this text once trimmed.
    Literal(&'static str),
}

/// Latency and correctness of one IPFS gateway.
pub struct GatewayProbe {
    id: ProbeId,
    gateway: &'static str,
    artifact: String,
    expect: Expectation,
}

impl GatewayProbe {
    /// The public gateway, serving a pinned 1×1 image.
    pub fn nft_storage_link(artifact: String) -> Self {
        Self {
            id: ProbeId::IpfsGateway,
            gateway: "nftstorage.link",
            artifact,
            expect: Expectation::NonEmpty,
        }
    }

    /// The Teia cache gateway, serving a pinned text file containing
    /// `ok`. The file is excluded from edge caching, so the fetch always
    /// exercises the gateway itself.
    pub fn teia_cache(artifact: String) -> Self {
        Self {
            id: ProbeId::TeiaIpfsGateway,
            gateway: "cache.teia.rocks",
            artifact,
            expect: Expectation::Literal("ok"),
        }
    }

    fn label(&self) -> String {
        format!("IPFS gateway ({})", self.gateway)
    }

    fn classify(&self, elapsed: Duration) -> HealthReport {
        let report = if elapsed < RESPONSIVE_LIMIT {
            HealthReport::ok(self.id, format!("{} is responsive.", self.label()))
        } else {
            HealthReport::degraded(self.id, format!("{} is slow.", self.label()))
        };
        report.with_latency(elapsed.as_millis() as u64)
    }
}

#[async_trait]
impl Probe for GatewayProbe {
    fn id(&self) -> ProbeId {
        self.id
    }

    async fn run(&self, cx: &CheckContext) -> Result<HealthReport, ProbeError> {
        let (body, elapsed) = cx.http.timed_get(&self.artifact, GATEWAY_TIMEOUT).await?;
        match self.expect {
            Expectation::NonEmpty if body.is_empty() => {
                return Err(ProbeError::MalformedResponse(
                    "gateway returned an empty artifact".into(),
                ));
            }
            Expectation::Literal(want) => {
                let text = String::from_utf8_lossy(&body);
                if text.trim() != want {
                    return Err(ProbeError::MalformedResponse(format!(
                        "gateway artifact mismatch: expected {want:?}"
                    )));
                }
            }
            _ => {}
        }
        Ok(self.classify(elapsed))
    }

    fn fallback(&self, _error: &ProbeError) -> HealthReport {
        HealthReport::down(
            self.id,
            format!("{} is experiencing technical difficulties.", self.label()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Http, RetryPolicy};
    use crate::probe::execute;
    use teia_status_types::Status;

    fn cx() -> CheckContext {
        CheckContext {
            http: Http::with_retry(RetryPolicy::none()),
            reference: None,
        }
    }

    #[test]
    fn classification_splits_at_the_responsive_limit() {
        let probe = GatewayProbe::nft_storage_link("unused".into());
        let fast = probe.classify(Duration::from_millis(3000));
        assert_eq!(fast.status, Status::Ok);
        assert_eq!(fast.message, "IPFS gateway (nftstorage.link) is responsive.");
        assert_eq!(fast.metrics.latency_ms, Some(3000));

        let slow = probe.classify(Duration::from_millis(6000));
        assert_eq!(slow.status, Status::Degraded);
        assert_eq!(slow.message, "IPFS gateway (nftstorage.link) is slow.");
    }

    #[tokio::test]
    async fn cache_gateway_accepts_the_pinned_ok_artifact() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ipfs/Qmf46hrJfcA8TvEMh6VNHM2G4JxsykxfYwcfhRr5ZFT12E")
            .with_status(200)
            .with_body("ok\n")
            .create_async()
            .await;

        let probe = GatewayProbe::teia_cache(format!(
            "{}/ipfs/Qmf46hrJfcA8TvEMh6VNHM2G4JxsykxfYwcfhRr5ZFT12E",
            server.url()
        ));
        let report = execute(&probe, &cx()).await;
        assert_eq!(report.status, Status::Ok);
        assert!(report.metrics.latency_ms.is_some());
    }

    #[tokio::test]
    async fn wrong_artifact_content_is_technical_difficulties() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ipfs/Qmf46hrJfcA8TvEMh6VNHM2G4JxsykxfYwcfhRr5ZFT12E")
            .with_status(200)
            .with_body("<html>gateway error</html>")
            .create_async()
            .await;

        let probe = GatewayProbe::teia_cache(format!(
            "{}/ipfs/Qmf46hrJfcA8TvEMh6VNHM2G4JxsykxfYwcfhRr5ZFT12E",
            server.url()
        ));
        let report = execute(&probe, &cx()).await;
        assert_eq!(report.status, Status::Down);
        assert_eq!(
            report.message,
            "IPFS gateway (cache.teia.rocks) is experiencing technical difficulties."
        );
    }

    #[tokio::test]
    async fn empty_image_body_is_technical_difficulties() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ipfs/pinned-image")
            .with_status(200)
            .with_body("")
            .create_async()
            .await;

        let probe =
            GatewayProbe::nft_storage_link(format!("{}/ipfs/pinned-image", server.url()));
        let report = execute(&probe, &cx()).await;
        assert_eq!(report.status, Status::Down);
    }
}
