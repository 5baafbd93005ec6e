//! Marketplace activity aggregates rendered at the foot of the report.

use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};
use serde_json::{json, Value};

use teia_status_types::{HealthReport, ProbeId};

use crate::client::ProbeError;
use crate::probe::{CheckContext, Probe};

const LATEST_MINT_QUERY: &str = r#"query LatestFeed {
  token(order_by: {id: desc}, limit: 1, where: {artifact_uri: {_neq: ""}}) { id }
}"#;

const MINT_HISTORY_QUERY: &str = r#"query MintHistory($timestamp: timestamptz!) {
  token(where: {artifact_uri: {_neq: ""}, timestamp: {_gte: $timestamp}}) { id }
}"#;

const SWAP_HISTORY_QUERY: &str = r#"query SwapHistory($timestamp: timestamptz!) {
  swap(where: {contract_address: {_eq: "KT1PHubm9HtyQEJ4BBpMTVomq6mhbfNZ9z5w"}, timestamp: {_gte: $timestamp}}) { id }
}"#;

/// ISO-8601 timestamp for "24 hours ago", as the `timestamptz` GraphQL
/// variables expect.
fn window_start() -> String {
    (Utc::now() - Duration::hours(24)).to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Token ids arrive as numbers or numeric strings depending on the API
/// version.
fn numeric(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|raw| raw.parse().ok()))
}

/// Id of the newest minted OBJKT with a non-empty artifact.
pub struct LatestMintProbe {
    endpoint: String,
}

impl LatestMintProbe {
    pub fn new(endpoint: String) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl Probe for LatestMintProbe {
    fn id(&self) -> ProbeId {
        ProbeId::LatestMint
    }

    async fn run(&self, cx: &CheckContext) -> Result<HealthReport, ProbeError> {
        let data = cx
            .http
            .graphql(&self.endpoint, LATEST_MINT_QUERY, Some("LatestFeed"), Value::Null)
            .await?;
        let id = numeric(&data["token"][0]["id"]).ok_or_else(|| {
            ProbeError::MalformedResponse("latest token has no numeric id".into())
        })?;
        Ok(HealthReport::ok(self.id(), format!("Latest mint is OBJKT {id}.")).with_count(id))
    }

    fn fallback(&self, _error: &ProbeError) -> HealthReport {
        HealthReport::unknown(self.id(), "Cannot determine the latest OBJKT mint.")
    }
}

/// Number of OBJKTs minted in the trailing 24 hours.
pub struct MintHistoryProbe {
    endpoint: String,
}

impl MintHistoryProbe {
    pub fn new(endpoint: String) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl Probe for MintHistoryProbe {
    fn id(&self) -> ProbeId {
        ProbeId::MintHistory
    }

    async fn run(&self, cx: &CheckContext) -> Result<HealthReport, ProbeError> {
        let data = cx
            .http
            .graphql(
                &self.endpoint,
                MINT_HISTORY_QUERY,
                Some("MintHistory"),
                json!({ "timestamp": window_start() }),
            )
            .await?;
        let count = data["token"]
            .as_array()
            .map(Vec::len)
            .ok_or_else(|| ProbeError::MalformedResponse("token list is missing".into()))?
            as u64;
        Ok(HealthReport::ok(
            self.id(),
            format!("Number of OBJKT mints in the last 24 hours: {count}"),
        )
        .with_count(count))
    }

    fn fallback(&self, _error: &ProbeError) -> HealthReport {
        HealthReport::unknown(
            self.id(),
            "Cannot determine the number of OBJKT mints in the last 24 hours.",
        )
    }
}

/// Number of marketplace swaps created in the trailing 24 hours.
pub struct SwapHistoryProbe {
    endpoint: String,
}

impl SwapHistoryProbe {
    pub fn new(endpoint: String) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl Probe for SwapHistoryProbe {
    fn id(&self) -> ProbeId {
        ProbeId::SwapHistory
    }

    async fn run(&self, cx: &CheckContext) -> Result<HealthReport, ProbeError> {
        let data = cx
            .http
            .graphql(
                &self.endpoint,
                SWAP_HISTORY_QUERY,
                Some("SwapHistory"),
                json!({ "timestamp": window_start() }),
            )
            .await?;
        let count = data["swap"]
            .as_array()
            .map(Vec::len)
            .ok_or_else(|| ProbeError::MalformedResponse("swap list is missing".into()))?
            as u64;
        Ok(HealthReport::ok(
            self.id(),
            format!("Number of Teia swaps in the last 24 hours: {count}"),
        )
        .with_count(count))
    }

    fn fallback(&self, _error: &ProbeError) -> HealthReport {
        HealthReport::unknown(
            self.id(),
            "Cannot determine the number of Teia swaps in the last 24 hours.",
        )
    }
}
