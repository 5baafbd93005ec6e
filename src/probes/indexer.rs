//! Chain-indexer drift checks: Teia's dipdup indexer, the Teia-operated
//! TzKT server, the TezTok indexer, and the Objkt.com indexer.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use teia_status_types::drift::LEVEL_TOLERANCE;
use teia_status_types::{Drift, DriftPolicy, HealthReport, ProbeId};

use crate::client::ProbeError;
use crate::probe::{CheckContext, Probe};

/// Appended to every delayed-indexer message.
const OPERATIONS_IMPACT: &str =
    "During this period, operations (mint, collect, swap) are prone to fail.";

fn classify_drift(
    id: ProbeId,
    subject: &str,
    up_to_date: &'static str,
    drift: Drift,
) -> HealthReport {
    if drift.in_sync {
        HealthReport::ok(id, up_to_date).with_delta(drift.delta)
    } else {
        HealthReport::degraded(
            id,
            format!("{subject} is currently {}. {OPERATIONS_IMPACT}", drift.delay()),
        )
        .with_delta(drift.delta)
    }
}

const INDEXER_UP_TO_DATE: &str = "Teia indexer is up to date.";
const INDEXER_UNKNOWN: &str = "Cannot determine the Teia indexer head status.";
const INDEXER_ERROR: &str = "Teia indexer is experiencing technical difficulties.";

const HEAD_STATUS_QUERY: &str = "query { dipdup_head_status { name status } }";
const HEAD_QUERY: &str = "query { dipdup_head { name level } }";

/// Drift of the Teia dipdup indexer against the reference head.
///
/// The indexer publishes one head per tracked datasource; the probe only
/// trusts the head whose self-reported status is `OK`.
pub struct IndexerProbe {
    endpoint: String,
}

impl IndexerProbe {
    pub fn new(endpoint: String) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl Probe for IndexerProbe {
    fn id(&self) -> ProbeId {
        ProbeId::TeiaIndexer
    }

    async fn run(&self, cx: &CheckContext) -> Result<HealthReport, ProbeError> {
        let reference = cx.reference()?;

        let status = cx
            .http
            .graphql(&self.endpoint, HEAD_STATUS_QUERY, None, Value::Null)
            .await?;
        let nodes = status["dipdup_head_status"].as_array().ok_or_else(|| {
            ProbeError::MalformedResponse("dipdup_head_status is missing".into())
        })?;
        let Some(name) = nodes
            .iter()
            .find(|node| node["status"] == "OK")
            .and_then(|node| node["name"].as_str())
        else {
            return Ok(HealthReport::unknown(self.id(), INDEXER_UNKNOWN));
        };

        let heads = cx
            .http
            .graphql(&self.endpoint, HEAD_QUERY, None, Value::Null)
            .await?;
        let level = heads["dipdup_head"]
            .as_array()
            .and_then(|heads| heads.iter().find(|head| head["name"] == name))
            .and_then(|head| head["level"].as_i64())
            .ok_or_else(|| {
                ProbeError::MalformedResponse(format!("no dipdup head named {name}"))
            })?;

        let drift = DriftPolicy::blocks(LEVEL_TOLERANCE).compare(reference.level, level);
        Ok(classify_drift(
            self.id(),
            "Teia indexer",
            INDEXER_UP_TO_DATE,
            drift,
        ))
    }

    fn fallback(&self, error: &ProbeError) -> HealthReport {
        match error {
            ProbeError::NoReference => HealthReport::unknown(self.id(), INDEXER_UNKNOWN),
            _ => HealthReport::down(self.id(), INDEXER_ERROR),
        }
    }
}

const TZKT_SERVER_UP_TO_DATE: &str = "Teia TzKT server is up to date.";
const TZKT_SERVER_UNKNOWN: &str = "Cannot determine the Teia TzKT server status.";
const TZKT_SERVER_ERROR: &str = "Teia TzKT server is experiencing technical difficulties.";

#[derive(Debug, Deserialize)]
struct ServerHead {
    level: i64,
}

/// Drift of the Teia-operated TzKT server against the reference head.
pub struct TzktServerProbe {
    head_url: String,
}

impl TzktServerProbe {
    pub fn new(head_url: String) -> Self {
        Self { head_url }
    }
}

#[async_trait]
impl Probe for TzktServerProbe {
    fn id(&self) -> ProbeId {
        ProbeId::TeiaTzkt
    }

    async fn run(&self, cx: &CheckContext) -> Result<HealthReport, ProbeError> {
        let reference = cx.reference()?;
        let head: ServerHead = cx.http.get_json(&self.head_url).await?;
        let drift = DriftPolicy::blocks(LEVEL_TOLERANCE).compare(reference.level, head.level);
        Ok(classify_drift(
            self.id(),
            "Teia TzKT server",
            TZKT_SERVER_UP_TO_DATE,
            drift,
        ))
    }

    fn fallback(&self, error: &ProbeError) -> HealthReport {
        match error {
            ProbeError::NoReference => HealthReport::unknown(self.id(), TZKT_SERVER_UNKNOWN),
            _ => HealthReport::down(self.id(), TZKT_SERVER_ERROR),
        }
    }
}

const TEZTOK_UP_TO_DATE: &str = "TezTok indexer is up to date.";
const TEZTOK_OFFLINE: &str = "TezTok indexer is offline.";
const TEZTOK_METADATA_ERRORS: &str = "TezTok indexer metadata processing errors.";
const TEZTOK_UNKNOWN: &str = "Cannot determine the TezTok indexer status.";

const TEZTOK_LEVEL_QUERY: &str =
    "query MyQuery { events_aggregate { aggregate { max { level } } } }";
const TEZTOK_MEDIA_QUERY: &str =
    "query MyQuery { tokens(order_by: {minted_at: desc}, limit: 20) { metadata_status } }";

/// Newest tokens inspected by the metadata-quality scan.
const MEDIA_SAMPLE: usize = 20;
/// Broken metadata entries tolerated within the sample.
const MEDIA_ERROR_LIMIT: usize = 10;

/// Drift and metadata health of the TezTok indexer.
pub struct TeztokProbe {
    endpoint: String,
}

impl TeztokProbe {
    pub fn new(endpoint: String) -> Self {
        Self { endpoint }
    }

    /// Count of recently minted tokens whose metadata never processed.
    /// A scan failure is not a probe failure; the drift verdict stands.
    async fn broken_metadata_count(&self, cx: &CheckContext) -> Option<usize> {
        match cx
            .http
            .graphql(&self.endpoint, TEZTOK_MEDIA_QUERY, Some("MyQuery"), Value::Null)
            .await
        {
            Ok(data) => data["tokens"].as_array().map(|tokens| {
                tokens
                    .iter()
                    .take(MEDIA_SAMPLE)
                    .filter(|token| {
                        token["metadata_status"] == "error"
                            || token["metadata_status"] == "unprocessed"
                    })
                    .count()
            }),
            Err(err) => {
                debug!(error = %err, "TezTok metadata scan failed");
                None
            }
        }
    }
}

#[async_trait]
impl Probe for TeztokProbe {
    fn id(&self) -> ProbeId {
        ProbeId::TeztokIndexer
    }

    async fn run(&self, cx: &CheckContext) -> Result<HealthReport, ProbeError> {
        let reference = cx.reference()?;

        let data = cx
            .http
            .graphql(&self.endpoint, TEZTOK_LEVEL_QUERY, Some("MyQuery"), Value::Null)
            .await?;
        let Some(level) = data["events_aggregate"]["aggregate"]["max"]["level"].as_i64() else {
            return Ok(HealthReport::down(self.id(), TEZTOK_OFFLINE));
        };

        let drift = DriftPolicy::blocks(LEVEL_TOLERANCE).compare(reference.level, level);
        if !drift.in_sync {
            return Ok(HealthReport::degraded(
                self.id(),
                format!(
                    "TezTok indexer is currently {}. {OPERATIONS_IMPACT}",
                    drift.delay()
                ),
            )
            .with_delta(drift.delta));
        }

        if let Some(broken) = self.broken_metadata_count(cx).await {
            if broken >= MEDIA_ERROR_LIMIT {
                return Ok(HealthReport::degraded(self.id(), TEZTOK_METADATA_ERRORS)
                    .with_delta(drift.delta));
            }
        }
        Ok(HealthReport::ok(self.id(), TEZTOK_UP_TO_DATE).with_delta(drift.delta))
    }

    fn fallback(&self, error: &ProbeError) -> HealthReport {
        match error {
            ProbeError::NoReference => HealthReport::unknown(self.id(), TEZTOK_UNKNOWN),
            _ => HealthReport::down(self.id(), TEZTOK_OFFLINE),
        }
    }
}

const OBJKT_ONLINE: &str = "Objkt.com indexer is online.";
const OBJKT_OFFLINE: &str = "Objkt.com indexer is offline.";

const OBJKT_TOKEN_QUERY: &str = r#"query getToken($tokenId: String!, $fa2: String!) {
  token(where: {token_id: {_eq: $tokenId}, fa_contract: {_eq: $fa2}}) {
    creators { creator_address }
    listings(order_by: {price: asc}, where: {status: {_eq: "active"}}) { id price }
  }
}"#;

/// A long-lived token whose listing data the Objkt indexer always serves.
const OBJKT_TOKEN_ID: &str = "768380";
const OBJKT_FA2: &str = "KT1RJ6PbjHpwc3M5rw5s2Nbmefwbuwbdxton";

/// Reachability of the Objkt.com indexer.
pub struct ObjktProbe {
    endpoint: String,
}

impl ObjktProbe {
    pub fn new(endpoint: String) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl Probe for ObjktProbe {
    fn id(&self) -> ProbeId {
        ProbeId::ObjktIndexer
    }

    async fn run(&self, cx: &CheckContext) -> Result<HealthReport, ProbeError> {
        let data = cx
            .http
            .graphql(
                &self.endpoint,
                OBJKT_TOKEN_QUERY,
                Some("getToken"),
                json!({ "tokenId": OBJKT_TOKEN_ID, "fa2": OBJKT_FA2 }),
            )
            .await?;
        if data["token"].is_null() {
            Ok(HealthReport::down(self.id(), OBJKT_OFFLINE))
        } else {
            Ok(HealthReport::ok(self.id(), OBJKT_ONLINE))
        }
    }

    fn fallback(&self, _error: &ProbeError) -> HealthReport {
        HealthReport::down(self.id(), OBJKT_OFFLINE)
    }
}
