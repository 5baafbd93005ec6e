//! The probe seam: one async unit of work per external service.

use async_trait::async_trait;
use tracing::warn;

use teia_status_types::{HealthReport, ProbeId};

use crate::client::{Http, ProbeError};
use crate::clock::ReferenceHead;

/// Everything a probe may read during one cycle.
///
/// The reference head is captured once, after the clock refresh, so every
/// probe in a cycle judges drift against the same value. `None` means no
/// fresh head is available this cycle.
#[derive(Debug, Clone)]
pub struct CheckContext {
    pub http: Http,
    pub reference: Option<ReferenceHead>,
}

impl CheckContext {
    /// The reference head, or [`ProbeError::NoReference`] for probes that
    /// cannot produce a verdict without one.
    pub fn reference(&self) -> Result<ReferenceHead, ProbeError> {
        self.reference.ok_or(ProbeError::NoReference)
    }
}

/// A single health check.
///
/// Implementations fetch from their own data source and classify what they
/// find. A failed fetch is returned as an error and converted by
/// [`execute`] into the probe's fallback report, so an error never crosses
/// the probe boundary and one broken service never hides the others.
#[async_trait]
pub trait Probe: Send + Sync {
    fn id(&self) -> ProbeId;

    async fn run(&self, cx: &CheckContext) -> Result<HealthReport, ProbeError>;

    /// The report substituted when [`Probe::run`] fails.
    fn fallback(&self, error: &ProbeError) -> HealthReport;
}

/// Drive a probe to completion, converting any failure into its fallback
/// report.
pub async fn execute(probe: &dyn Probe, cx: &CheckContext) -> HealthReport {
    match probe.run(cx).await {
        Ok(report) => report,
        Err(error) => {
            warn!(probe = %probe.id(), error = %error, "check failed");
            probe.fallback(&error)
        }
    }
}
