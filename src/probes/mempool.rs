//! Pending-transaction pressure on the marketplace contract.

use async_trait::async_trait;
use serde_json::Value;

use teia_status_types::{HealthReport, ProbeId};

use crate::client::ProbeError;
use crate::probe::{CheckContext, Probe};

const MEMPOOL_NOMINAL: &str = "Nominal number of transactions in the blockchain mempool.";
const MEMPOOL_HIGH: &str = "High number of transactions in the blockchain mempool.";
const MEMPOOL_UNKNOWN: &str = "Mempool status cannot be queried.";

/// More pending marketplace transactions than this means congestion.
const PENDING_LIMIT: usize = 10;

const MEMPOOL_QUERY: &str = r#"query {
  transactions(
    where: {destination: {_eq: "KT1PHubm9HtyQEJ4BBpMTVomq6mhbfNZ9z5w"}, status: {_neq: "in_chain"}, network: {_eq: "mainnet"}},
    limit: 100,
    order_by: {created_at: desc}
  ) { hash status created_at }
}"#;

/// Counts marketplace transactions sitting in the mempool without making
/// it on chain.
pub struct MempoolProbe {
    endpoint: String,
}

impl MempoolProbe {
    pub fn new(endpoint: String) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl Probe for MempoolProbe {
    fn id(&self) -> ProbeId {
        ProbeId::Mempool
    }

    async fn run(&self, cx: &CheckContext) -> Result<HealthReport, ProbeError> {
        let data = cx
            .http
            .graphql(&self.endpoint, MEMPOOL_QUERY, None, Value::Null)
            .await?;
        let pending = data["transactions"]
            .as_array()
            .ok_or_else(|| ProbeError::MalformedResponse("transactions is missing".into()))?
            .len();

        let report = if pending > PENDING_LIMIT {
            HealthReport::degraded(self.id(), MEMPOOL_HIGH)
        } else {
            HealthReport::ok(self.id(), MEMPOOL_NOMINAL)
        };
        Ok(report.with_count(pending as u64))
    }

    fn fallback(&self, _error: &ProbeError) -> HealthReport {
        HealthReport::unknown(self.id(), MEMPOOL_UNKNOWN)
    }
}
