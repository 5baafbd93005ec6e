//! The published outcome of one full check cycle.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::{HealthReport, ProbeId, Status};

/// Immutable, fully-merged result of one cycle.
///
/// A snapshot is assembled once per cycle, after every probe has finished,
/// and then published wholesale. Readers never observe a half-updated
/// cycle: they either see the previous snapshot or this one.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusSnapshot {
    /// Monotonic cycle counter. The first completed cycle is 1; the
    /// placeholder published before any cycle completes is 0.
    pub cycle: u64,
    /// Unix timestamp in milliseconds at assembly time.
    pub timestamp_ms: u64,
    /// One report per registered probe, in declared report order.
    pub reports: Vec<HealthReport>,
}

impl StatusSnapshot {
    pub fn new(cycle: u64, reports: Vec<HealthReport>) -> Self {
        Self {
            cycle,
            timestamp_ms: current_timestamp_ms(),
            reports,
        }
    }

    pub fn with_timestamp(cycle: u64, timestamp_ms: u64, reports: Vec<HealthReport>) -> Self {
        Self {
            cycle,
            timestamp_ms,
            reports,
        }
    }

    /// The snapshot published between process start and the end of the
    /// first cycle: every base probe present, every verdict unknown.
    pub fn pending() -> Self {
        let reports = ProbeId::ALL
            .iter()
            .map(|id| {
                HealthReport::unknown(*id, format!("{} has not been checked yet.", id.label()))
            })
            .collect();
        Self::new(0, reports)
    }

    /// Look up one probe's report.
    pub fn get(&self, id: ProbeId) -> Option<&HealthReport> {
        self.reports.iter().find(|report| report.id == id)
    }

    /// Worst status across every report, or `Unknown` for an empty
    /// snapshot.
    pub fn overall(&self) -> Status {
        self.reports
            .iter()
            .map(|report| report.status)
            .max()
            .unwrap_or(Status::Unknown)
    }

    /// Id of the most recently minted OBJKT, when the activity check ran.
    pub fn latest_mint_id(&self) -> Option<u64> {
        self.get(ProbeId::LatestMint)?.metrics.count
    }

    /// Number of mints observed in the trailing 24 hours.
    pub fn mint_count_24h(&self) -> Option<u64> {
        self.get(ProbeId::MintHistory)?.metrics.count
    }

    /// Number of marketplace swaps observed in the trailing 24 hours.
    pub fn swap_count_24h(&self) -> Option<u64> {
        self.get(ProbeId::SwapHistory)?.metrics.count
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HealthReport> {
        self.reports.iter()
    }
}

fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
