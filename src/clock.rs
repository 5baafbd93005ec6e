//! The reference clock: an authoritative view of the current chain height.
//!
//! Every drift check compares its data source against the head reported by
//! the TzKT API. The clock is refreshed once per cycle, before any probe
//! runs, and doubles as the health check for the TzKT API itself.

use std::time::Duration;

use parking_lot::RwLock;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::warn;

use teia_status_types::drift::HEAD_LAG_TOLERANCE;
use teia_status_types::{HealthReport, ProbeId};

use crate::client::{Http, RPC_TIMEOUT};
use crate::config::CANARY_ACCOUNT;

const TZKT_ONLINE: &str = "TzKT API is online.";
const TZKT_DOWN: &str = "TzKT API is down.";
const TZKT_LAGGING: &str = "TzKT API has fallen behind the blockchain updates.";

/// Chain head as reported by TzKT.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TzktHead {
    level: i64,
    known_level: i64,
}

/// The head all drift comparisons key off, plus when it was observed.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceHead {
    /// Last level indexed by the reference API.
    pub level: i64,
    /// Newest level the reference API knows the chain has reached.
    pub known_level: i64,
    pub observed_at: Instant,
}

impl ReferenceHead {
    pub fn age(&self) -> Duration {
        self.observed_at.elapsed()
    }
}

/// Holds the most recent reference head across cycles.
///
/// Written only by [`ReferenceClock::refresh`]; probes read a copy
/// captured once per cycle, so every check in a cycle sees the same head.
#[derive(Debug, Default)]
pub struct ReferenceClock {
    head: RwLock<Option<ReferenceHead>>,
}

impl ReferenceClock {
    /// Heads older than this are no longer trusted for drift comparisons.
    /// A refresh failure leaves the previous head in place, so the limit
    /// caps how long stale data can keep producing verdicts.
    pub const MAX_AGE: Duration = Duration::from_secs(300);

    pub fn new() -> Self {
        Self::default()
    }

    /// The current head, if one was observed recently enough.
    pub fn current(&self) -> Option<ReferenceHead> {
        (*self.head.read()).filter(|head| head.age() <= Self::MAX_AGE)
    }

    /// Refresh the head from TzKT and report on the API itself.
    ///
    /// Always returns a report for [`ProbeId::TzktApi`]: `Down` when the
    /// head cannot be fetched or the API stops answering queries,
    /// `Degraded` when the API trails the chain it indexes.
    pub async fn refresh(&self, http: &Http, tzkt_api: &str) -> HealthReport {
        let head_url = format!("{tzkt_api}/v1/head");
        let head: TzktHead = match http.get_json(&head_url).await {
            Ok(head) => head,
            Err(err) => {
                warn!(error = %err, "failed to refresh the reference head");
                return HealthReport::down(ProbeId::TzktApi, TZKT_DOWN);
            }
        };

        *self.head.write() = Some(ReferenceHead {
            level: head.level,
            known_level: head.known_level,
            observed_at: Instant::now(),
        });

        let lag = head.known_level - head.level;
        if lag > HEAD_LAG_TOLERANCE as i64 {
            return HealthReport::degraded(ProbeId::TzktApi, TZKT_LAGGING).with_delta(lag as u64);
        }

        let ops_url =
            format!("{tzkt_api}/v1/accounts/{CANARY_ACCOUNT}/operations?sort=0&limit=2");
        match http.get_ok(&ops_url, RPC_TIMEOUT).await {
            Ok(()) => HealthReport::ok(ProbeId::TzktApi, TZKT_ONLINE),
            Err(err) => {
                warn!(error = %err, "TzKT API stopped answering queries");
                HealthReport::down(ProbeId::TzktApi, TZKT_DOWN)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn set_head(&self, level: i64, known_level: i64) {
        *self.head.write() = Some(ReferenceHead {
            level,
            known_level,
            observed_at: Instant::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teia_status_types::Status;

    #[tokio::test]
    async fn fresh_head_is_stored_and_reported_online() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/head")
            .with_status(200)
            .with_body(r#"{"level": 3200000, "knownLevel": 3200002}"#)
            .create_async()
            .await;
        server
            .mock(
                "GET",
                format!("/v1/accounts/{CANARY_ACCOUNT}/operations?sort=0&limit=2").as_str(),
            )
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let clock = ReferenceClock::new();
        let http = Http::with_retry(crate::client::RetryPolicy::none());
        let report = clock.refresh(&http, &server.url()).await;

        assert_eq!(report.status, Status::Ok);
        assert_eq!(report.message, TZKT_ONLINE);
        let head = clock.current().unwrap();
        assert_eq!(head.level, 3_200_000);
        assert_eq!(head.known_level, 3_200_002);
    }

    #[tokio::test]
    async fn lagging_reference_is_degraded_but_still_usable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/head")
            .with_status(200)
            .with_body(r#"{"level": 3200000, "knownLevel": 3200020}"#)
            .create_async()
            .await;

        let clock = ReferenceClock::new();
        let http = Http::with_retry(crate::client::RetryPolicy::none());
        let report = clock.refresh(&http, &server.url()).await;

        assert_eq!(report.status, Status::Degraded);
        assert_eq!(report.metrics.delta, Some(20));
        // the head is stored regardless, drift checks keep working
        assert!(clock.current().is_some());
    }

    #[tokio::test]
    async fn failed_refresh_reports_down_and_keeps_the_old_head() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/head")
            .with_status(500)
            .create_async()
            .await;

        let clock = ReferenceClock::new();
        clock.set_head(3_100_000, 3_100_000);
        let http = Http::with_retry(crate::client::RetryPolicy::none());
        let report = clock.refresh(&http, &server.url()).await;

        assert_eq!(report.status, Status::Down);
        assert_eq!(report.message, TZKT_DOWN);
        assert_eq!(clock.current().unwrap().level, 3_100_000);
    }

    #[tokio::test(start_paused = true)]
    async fn heads_age_out_after_the_staleness_limit() {
        let clock = ReferenceClock::new();
        clock.set_head(3_100_000, 3_100_000);
        assert!(clock.current().is_some());

        tokio::time::advance(ReferenceClock::MAX_AGE + Duration::from_secs(1)).await;
        assert!(clock.current().is_none());
    }

    #[tokio::test]
    async fn unreachable_query_endpoint_reports_down() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/head")
            .with_status(200)
            .with_body(r#"{"level": 3200000, "knownLevel": 3200001}"#)
            .create_async()
            .await;
        server
            .mock(
                "GET",
                format!("/v1/accounts/{CANARY_ACCOUNT}/operations?sort=0&limit=2").as_str(),
            )
            .with_status(502)
            .create_async()
            .await;

        let clock = ReferenceClock::new();
        let http = Http::with_retry(crate::client::RetryPolicy::none());
        let report = clock.refresh(&http, &server.url()).await;
        assert_eq!(report.status, Status::Down);
    }
}
