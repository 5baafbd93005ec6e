//! RPC fleet fan-out.
//!
//! One probe covers the whole fleet: every node is polled concurrently,
//! each with its own timeout, and the batch is committed as a single
//! multi-line report only after every node has resolved. A node failure
//! is recorded in its own line and never fails the batch.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::future::join_all;
use parking_lot::RwLock;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::warn;

use teia_status_types::{HealthReport, ProbeId, Status};

use crate::client::{Http, ProbeError, RPC_TIMEOUT};
use crate::probe::{CheckContext, Probe};

const RPC_UNKNOWN: &str = "Cannot determine RPC nodes status";
const RPC_HEADER: &str = "RPC nodes status:";

#[derive(Debug, Deserialize)]
struct BlockHeader {
    level: i64,
}

#[derive(Debug)]
enum NodeOutcome {
    Responded { level_delta: u64, time_ms: u64 },
    Failed,
}

#[derive(Debug)]
struct NodeStatus {
    node: String,
    outcome: NodeOutcome,
}

impl NodeStatus {
    fn render(&self) -> String {
        match &self.outcome {
            NodeOutcome::Responded {
                level_delta,
                time_ms,
            } => format!(
                "- {}: level={level_delta} time={time_ms}ms, status=OK",
                self.node
            ),
            NodeOutcome::Failed => format!("- {}: cannot determine status", self.node),
        }
    }
}

/// Holds the probe's in-flight flag for the duration of one fan-out.
/// Dropping the guard releases the flag, so every exit path releases it.
struct FlightGuard<'a>(&'a AtomicBool);

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
            .then(|| Self(flag))
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Level drift and latency of every node in the RPC fleet.
///
/// Re-entrant calls are a silent no-op: while a fan-out is in flight, an
/// overlapping run returns the previous batch report unchanged.
pub struct RpcNodesProbe {
    nodes: Vec<String>,
    in_flight: AtomicBool,
    last: RwLock<Option<HealthReport>>,
}

impl RpcNodesProbe {
    pub fn new(nodes: Vec<String>) -> Self {
        Self {
            nodes,
            in_flight: AtomicBool::new(false),
            last: RwLock::new(None),
        }
    }

    fn node_url(node: &str) -> String {
        if node.starts_with("http://") || node.starts_with("https://") {
            format!("{node}/chains/main/blocks/head/header")
        } else {
            format!("https://{node}/chains/main/blocks/head/header")
        }
    }

    async fn poll_node(http: &Http, reference_level: i64, node: String) -> NodeStatus {
        let url = Self::node_url(&node);
        let started = Instant::now();
        match http.get_json_timeout::<BlockHeader>(&url, RPC_TIMEOUT).await {
            Ok(header) => NodeStatus {
                outcome: NodeOutcome::Responded {
                    level_delta: reference_level.abs_diff(header.level),
                    time_ms: started.elapsed().as_millis() as u64,
                },
                node,
            },
            Err(err) => {
                warn!(node = %node, error = %err, "RPC node check failed");
                NodeStatus {
                    node,
                    outcome: NodeOutcome::Failed,
                }
            }
        }
    }

    fn last_or_unknown(&self) -> HealthReport {
        self.last
            .read()
            .clone()
            .unwrap_or_else(|| HealthReport::unknown(ProbeId::RpcNodes, RPC_UNKNOWN))
    }
}

#[async_trait]
impl Probe for RpcNodesProbe {
    fn id(&self) -> ProbeId {
        ProbeId::RpcNodes
    }

    async fn run(&self, cx: &CheckContext) -> Result<HealthReport, ProbeError> {
        let Some(_guard) = FlightGuard::acquire(&self.in_flight) else {
            // A previous fan-out is still in flight; leave its batch alone.
            return Ok(self.last_or_unknown());
        };

        let Some(reference) = cx.reference else {
            let report = HealthReport::unknown(self.id(), RPC_UNKNOWN);
            *self.last.write() = Some(report.clone());
            return Ok(report);
        };

        let polls = self
            .nodes
            .iter()
            .cloned()
            .map(|node| Self::poll_node(&cx.http, reference.level, node));
        let statuses = join_all(polls).await;

        let responded = statuses
            .iter()
            .filter(|status| matches!(status.outcome, NodeOutcome::Responded { .. }))
            .count();
        let status = if responded == statuses.len() {
            Status::Ok
        } else {
            Status::Degraded
        };

        let mut message = String::from(RPC_HEADER);
        for node_status in &statuses {
            message.push('\n');
            message.push_str(&node_status.render());
        }

        let report =
            HealthReport::new(self.id(), status, message).with_count(responded as u64);
        *self.last.write() = Some(report.clone());
        Ok(report)
    }

    fn fallback(&self, _error: &ProbeError) -> HealthReport {
        HealthReport::unknown(self.id(), RPC_UNKNOWN)
    }
}
