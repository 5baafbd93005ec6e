//! Cycle orchestration and snapshot publication.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use teia_status_types::{HealthReport, ProbeId, StatusSnapshot};

use crate::client::Http;
use crate::clock::ReferenceClock;
use crate::config::Settings;
use crate::probe::{execute, CheckContext, Probe};
use crate::probes;
use crate::report;

/// Runs the probe roster on a fixed cadence and publishes one snapshot
/// per completed cycle.
///
/// Cloning is cheap; clones share the same state and the same published
/// snapshot.
#[derive(Clone)]
pub struct StatusChecker {
    inner: Arc<Inner>,
}

struct Inner {
    http: Http,
    clock: ReferenceClock,
    tzkt_api: String,
    probes: Vec<Arc<dyn Probe>>,
    interval: Duration,
    snapshot: RwLock<Arc<StatusSnapshot>>,
    started: AtomicBool,
    cycles: AtomicU64,
}

impl StatusChecker {
    pub fn new(settings: &Settings) -> Self {
        Self::with_probes(settings, Http::new(), probes::roster(settings))
    }

    /// Assemble a checker around an explicit roster and client. Tests use
    /// this to drive hand-built probes.
    pub fn with_probes(settings: &Settings, http: Http, probes: Vec<Arc<dyn Probe>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                http,
                clock: ReferenceClock::new(),
                tzkt_api: settings.endpoints.tzkt_api.clone(),
                probes,
                interval: settings.interval(),
                snapshot: RwLock::new(Arc::new(StatusSnapshot::pending())),
                started: AtomicBool::new(false),
                cycles: AtomicU64::new(0),
            }),
        }
    }

    /// Begin periodic checking. Idempotent: only the first call spawns
    /// the cycle task, and the first cycle starts immediately.
    pub fn start(&self) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let checker = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(checker.inner.interval);
            // A slow cycle delays the next tick instead of bursting.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                checker.run_cycle().await;
            }
        });
    }

    /// Execute one full cycle: refresh the reference clock, run every
    /// probe concurrently, publish the merged snapshot.
    ///
    /// Normally driven by [`StatusChecker::start`]; exposed for one-shot
    /// runs.
    pub async fn run_cycle(&self) {
        let inner = &self.inner;

        // The clock refresh is an ordering barrier: every probe in this
        // cycle sees the head it produced, or none at all.
        let clock_report = inner.clock.refresh(&inner.http, &inner.tzkt_api).await;
        let cx = CheckContext {
            http: inner.http.clone(),
            reference: inner.clock.current(),
        };

        let mut tasks = Vec::with_capacity(inner.probes.len());
        for probe in &inner.probes {
            let probe = Arc::clone(probe);
            let cx = cx.clone();
            tasks.push((
                probe.id(),
                tokio::spawn(async move { execute(probe.as_ref(), &cx).await }),
            ));
        }

        let mut results: HashMap<ProbeId, HealthReport> =
            HashMap::with_capacity(tasks.len() + 1);
        results.insert(clock_report.id, clock_report);
        for (id, task) in tasks {
            let report = match task.await {
                Ok(report) => report,
                Err(err) => {
                    error!(probe = %id, error = %err, "check task aborted");
                    HealthReport::unknown(id, aborted_message(id))
                }
            };
            results.insert(id, report);
        }

        let cycle = inner.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Arc::new(StatusSnapshot::new(cycle, ordered_reports(results)));
        *inner.snapshot.write() = snapshot;

        if cycle == 1 {
            info!("initial status report:\n{}", self.status());
        }
    }

    /// Render the most recently completed snapshot. Non-blocking and
    /// never triggers a check.
    pub fn status(&self) -> String {
        report::render(&self.snapshot())
    }

    /// The typed snapshot, for in-process consumers. Readers keep a
    /// consistent view for as long as they hold the `Arc`.
    pub fn snapshot(&self) -> Arc<StatusSnapshot> {
        Arc::clone(&self.inner.snapshot.read())
    }

    /// Completed cycles since start.
    pub fn cycles(&self) -> u64 {
        self.inner.cycles.load(Ordering::SeqCst)
    }
}

fn aborted_message(id: ProbeId) -> String {
    format!("{} status could not be determined.", id.label())
}

/// Ids in report order: the declared base order plus the DAO tally when
/// compiled in.
fn roster_ids() -> Vec<ProbeId> {
    let mut ids = ProbeId::ALL.to_vec();
    #[cfg(feature = "dao-poll")]
    ids.push(ProbeId::DaoPoll);
    ids
}

/// Arrange results in declared order. A probe that produced nothing gets
/// an `Unknown` entry, so the snapshot is total by construction.
fn ordered_reports(mut results: HashMap<ProbeId, HealthReport>) -> Vec<HealthReport> {
    roster_ids()
        .into_iter()
        .map(|id| {
            results
                .remove(&id)
                .unwrap_or_else(|| HealthReport::unknown(id, aborted_message(id)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ProbeError, RetryPolicy};
    use async_trait::async_trait;
    use teia_status_types::Status;

    /// Probe returning a fixed outcome, for driving the scheduler.
    struct FakeProbe {
        id: ProbeId,
        outcome: FakeOutcome,
    }

    enum FakeOutcome {
        Healthy,
        Fails,
        Panics,
    }

    impl FakeProbe {
        fn healthy(id: ProbeId) -> Arc<dyn Probe> {
            Arc::new(Self {
                id,
                outcome: FakeOutcome::Healthy,
            })
        }

        fn failing(id: ProbeId) -> Arc<dyn Probe> {
            Arc::new(Self {
                id,
                outcome: FakeOutcome::Fails,
            })
        }

        fn panicking(id: ProbeId) -> Arc<dyn Probe> {
            Arc::new(Self {
                id,
                outcome: FakeOutcome::Panics,
            })
        }
    }

    #[async_trait]
    impl Probe for FakeProbe {
        fn id(&self) -> ProbeId {
            self.id
        }

        async fn run(&self, _cx: &CheckContext) -> Result<HealthReport, ProbeError> {
            match self.outcome {
                FakeOutcome::Healthy => {
                    Ok(HealthReport::ok(self.id, format!("{} fine", self.id)))
                }
                FakeOutcome::Fails => Err(ProbeError::Unreachable("refused".into())),
                FakeOutcome::Panics => panic!("probe exploded"),
            }
        }

        fn fallback(&self, _error: &ProbeError) -> HealthReport {
            HealthReport::down(self.id, format!("{} broken", self.id))
        }
    }

    async fn checker_with_live_clock(
        probes: Vec<Arc<dyn Probe>>,
    ) -> (mockito::ServerGuard, StatusChecker) {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/head")
            .with_status(200)
            .with_body(r#"{"level": 1000, "knownLevel": 1000}"#)
            .create_async()
            .await;
        server
            .mock(
                "GET",
                mockito::Matcher::Regex(r"^/v1/accounts/.*$".into()),
            )
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        let mut settings = Settings::default();
        settings.endpoints.tzkt_api = server.url();
        let checker =
            StatusChecker::with_probes(&settings, Http::with_retry(RetryPolicy::none()), probes);
        (server, checker)
    }

    #[tokio::test]
    async fn before_the_first_cycle_the_snapshot_is_the_placeholder() {
        let (_server, checker) = checker_with_live_clock(Vec::new()).await;
        let snapshot = checker.snapshot();
        assert_eq!(snapshot.cycle, 0);
        assert!(checker
            .status()
            .contains("Teia.art has not been checked yet."));
    }

    #[tokio::test]
    async fn a_cycle_produces_one_entry_per_declared_probe_in_order() {
        let (_server, checker) = checker_with_live_clock(vec![
            FakeProbe::healthy(ProbeId::TeiaSite),
            FakeProbe::healthy(ProbeId::TeiaIndexer),
        ])
        .await;
        checker.run_cycle().await;

        let snapshot = checker.snapshot();
        assert_eq!(snapshot.cycle, 1);
        let expected = roster_ids();
        assert_eq!(snapshot.len(), expected.len());
        for (report, id) in snapshot.iter().zip(expected) {
            assert_eq!(report.id, id);
        }
        // probes that ran carry their verdicts, the rest are unknown
        assert_eq!(
            snapshot.get(ProbeId::TeiaSite).unwrap().status,
            Status::Ok
        );
        assert_eq!(
            snapshot.get(ProbeId::Mempool).unwrap().status,
            Status::Unknown
        );
    }

    #[tokio::test]
    async fn failing_and_panicking_probes_never_hide_the_others() {
        let (_server, checker) = checker_with_live_clock(vec![
            FakeProbe::healthy(ProbeId::TeiaSite),
            FakeProbe::failing(ProbeId::TeiaIndexer),
            FakeProbe::panicking(ProbeId::Mempool),
        ])
        .await;
        checker.run_cycle().await;

        let snapshot = checker.snapshot();
        assert_eq!(
            snapshot.get(ProbeId::TeiaSite).unwrap().status,
            Status::Ok
        );
        // a failed probe surfaces its fallback
        assert_eq!(
            snapshot.get(ProbeId::TeiaIndexer).unwrap().status,
            Status::Down
        );
        // a panicked task is substituted, not absent
        let aborted = snapshot.get(ProbeId::Mempool).unwrap();
        assert_eq!(aborted.status, Status::Unknown);
        assert_eq!(
            aborted.message,
            "Blockchain mempool status could not be determined."
        );
    }

    #[tokio::test]
    async fn the_clock_report_lands_in_the_snapshot() {
        let (_server, checker) = checker_with_live_clock(Vec::new()).await;
        checker.run_cycle().await;
        let snapshot = checker.snapshot();
        assert_eq!(
            snapshot.get(ProbeId::TzktApi).unwrap().message,
            "TzKT API is online."
        );
    }

    #[tokio::test]
    async fn status_is_idempotent_between_cycles() {
        let (_server, checker) = checker_with_live_clock(vec![
            FakeProbe::healthy(ProbeId::TeiaSite),
        ])
        .await;
        checker.run_cycle().await;
        assert_eq!(checker.status(), checker.status());
    }

    #[tokio::test]
    async fn readers_holding_a_snapshot_keep_a_consistent_view() {
        let (_server, checker) = checker_with_live_clock(vec![
            FakeProbe::healthy(ProbeId::TeiaSite),
        ])
        .await;
        checker.run_cycle().await;
        let before = checker.snapshot();
        checker.run_cycle().await;
        // the old Arc still describes cycle 1 in full
        assert_eq!(before.cycle, 1);
        assert_eq!(checker.snapshot().cycle, 2);
    }

    #[tokio::test]
    async fn start_spawns_only_once() {
        let (_server, checker) = checker_with_live_clock(Vec::new()).await;
        checker.start();
        checker.start();
        assert!(checker.inner.started.load(Ordering::SeqCst));
    }
}
