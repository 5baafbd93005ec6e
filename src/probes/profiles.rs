//! TzProfiles health: indexer freshness plus a profile lookup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use teia_status_types::drift::{DriftPolicy, KNOWN_LEVEL_TOLERANCE, TIME_TOLERANCE_MINUTES};
use teia_status_types::{HealthReport, ProbeId};

use crate::client::ProbeError;
use crate::config::CANARY_ACCOUNT;
use crate::probe::{CheckContext, Probe};

const PROFILES_ONLINE: &str = "TzProfiles is online.";
const PROFILES_DOWN: &str = "TzProfiles is down.";
const PROFILES_BEHIND: &str = "TzProfiles indexer has fallen behind the blockchain updates.";

const PROFILES_HEAD_QUERY: &str = "query { dipdup_head { name level timestamp } }";

/// Freshness of the TzProfiles indexer and availability of its lookup API.
///
/// Staleness is judged two ways: the indexer head timestamp must be
/// recent, and where a reference head is available its known level may
/// not run more than a few blocks ahead of the indexed level. The level
/// test is directional; an indexer ahead of the reference is fine.
pub struct TzProfilesProbe {
    graphql: String,
    api: String,
}

impl TzProfilesProbe {
    pub fn new(graphql: String, api: String) -> Self {
        Self { graphql, api }
    }
}

#[async_trait]
impl Probe for TzProfilesProbe {
    fn id(&self) -> ProbeId {
        ProbeId::Tzprofiles
    }

    async fn run(&self, cx: &CheckContext) -> Result<HealthReport, ProbeError> {
        let data = cx
            .http
            .graphql(&self.graphql, PROFILES_HEAD_QUERY, None, Value::Null)
            .await?;
        let head = &data["dipdup_head"][0];
        let timestamp = head["timestamp"]
            .as_str()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .ok_or_else(|| {
                ProbeError::MalformedResponse("dipdup head has no parsable timestamp".into())
            })?;

        let age_minutes =
            (Utc::now().signed_duration_since(timestamp).num_seconds().abs() + 59) / 60;
        let freshness =
            DriftPolicy::minutes(TIME_TOLERANCE_MINUTES).compare(age_minutes, 0);

        let behind_reference = match cx.reference {
            Some(reference) => head["level"]
                .as_i64()
                .map(|level| reference.known_level - level > KNOWN_LEVEL_TOLERANCE as i64)
                .unwrap_or(false),
            None => false,
        };

        if !freshness.in_sync || behind_reference {
            return Ok(
                HealthReport::degraded(self.id(), PROFILES_BEHIND).with_delta(freshness.delta)
            );
        }

        let url = format!("{}/{}", self.api, CANARY_ACCOUNT);
        let profiles: Vec<Value> = cx.http.get_json(&url).await?;
        if profiles.is_empty() {
            Ok(HealthReport::down(self.id(), PROFILES_DOWN))
        } else {
            Ok(HealthReport::ok(self.id(), PROFILES_ONLINE))
        }
    }

    fn fallback(&self, _error: &ProbeError) -> HealthReport {
        HealthReport::down(self.id(), PROFILES_DOWN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Http, RetryPolicy};
    use crate::clock::ReferenceHead;
    use crate::probe::execute;
    use chrono::Duration;
    use teia_status_types::Status;
    use tokio::time::Instant;

    fn cx_with_reference(level: i64, known_level: i64) -> CheckContext {
        CheckContext {
            http: Http::with_retry(RetryPolicy::none()),
            reference: Some(ReferenceHead {
                level,
                known_level,
                observed_at: Instant::now(),
            }),
        }
    }

    fn head_body(level: i64, timestamp: DateTime<Utc>) -> String {
        format!(
            r#"{{"data": {{"dipdup_head": [{{"name": "main", "level": {level}, "timestamp": "{}"}}]}}}}"#,
            timestamp.to_rfc3339()
        )
    }

    #[tokio::test]
    async fn fresh_head_and_populated_profile_is_online() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/graphql")
            .with_status(200)
            .with_body(head_body(1000, Utc::now()))
            .create_async()
            .await;
        server
            .mock("GET", format!("/{CANARY_ACCOUNT}").as_str())
            .with_status(200)
            .with_body(r#"[{"profile": "exists"}]"#)
            .create_async()
            .await;

        let probe = TzProfilesProbe::new(
            format!("{}/v1/graphql", server.url()),
            server.url(),
        );
        let report = execute(&probe, &cx_with_reference(1000, 1002)).await;
        assert_eq!(report.status, Status::Ok);
        assert_eq!(report.message, PROFILES_ONLINE);
    }

    #[tokio::test]
    async fn stale_head_timestamp_is_behind() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/graphql")
            .with_status(200)
            .with_body(head_body(1000, Utc::now() - Duration::minutes(25)))
            .create_async()
            .await;

        let probe = TzProfilesProbe::new(
            format!("{}/v1/graphql", server.url()),
            server.url(),
        );
        let report = execute(&probe, &cx_with_reference(1000, 1002)).await;
        assert_eq!(report.status, Status::Degraded);
        assert_eq!(report.message, PROFILES_BEHIND);
        assert!(report.metrics.delta.unwrap_or(0) >= 25);
    }

    #[tokio::test]
    async fn reference_running_ahead_flags_the_indexer() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/graphql")
            .with_status(200)
            .with_body(head_body(1000, Utc::now()))
            .create_async()
            .await;

        let probe = TzProfilesProbe::new(
            format!("{}/v1/graphql", server.url()),
            server.url(),
        );
        // known level 1010 vs indexed 1000: more than 5 blocks ahead
        let report = execute(&probe, &cx_with_reference(1000, 1010)).await;
        assert_eq!(report.status, Status::Degraded);
    }

    #[tokio::test]
    async fn empty_profile_lookup_is_down() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/graphql")
            .with_status(200)
            .with_body(head_body(1000, Utc::now()))
            .create_async()
            .await;
        server
            .mock("GET", format!("/{CANARY_ACCOUNT}").as_str())
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let probe = TzProfilesProbe::new(
            format!("{}/v1/graphql", server.url()),
            server.url(),
        );
        let report = execute(&probe, &cx_with_reference(1000, 1002)).await;
        assert_eq!(report.status, Status::Down);
        assert_eq!(report.message, PROFILES_DOWN);
    }

    #[tokio::test]
    async fn missing_reference_still_judges_freshness() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/graphql")
            .with_status(200)
            .with_body(head_body(1000, Utc::now()))
            .create_async()
            .await;
        server
            .mock("GET", format!("/{CANARY_ACCOUNT}").as_str())
            .with_status(200)
            .with_body(r#"[{"profile": "exists"}]"#)
            .create_async()
            .await;

        let probe = TzProfilesProbe::new(
            format!("{}/v1/graphql", server.url()),
            server.url(),
        );
        let cx = CheckContext {
            http: Http::with_retry(RetryPolicy::none()),
            reference: None,
        };
        let report = execute(&probe, &cx).await;
        assert_eq!(report.status, Status::Ok);
    }
}
