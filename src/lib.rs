//! # teia-status
//!
//! Periodic health checker for the distributed services backing
//! https://teia.art: chain indexers, IPFS gateways, RPC nodes, the GUI,
//! and the storage layer.
//!
//! Every cycle the checker refreshes an authoritative chain head from the
//! TzKT API, runs the full probe roster concurrently against it, and
//! publishes an immutable [`StatusSnapshot`]. The rendered report is one
//! line per service in a fixed order, with Discord-markdown emphasis on
//! anything that is not healthy.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     StatusChecker                        │
//! │                                                          │
//! │  interval tick ─▶ ReferenceClock.refresh()  (barrier)    │
//! │                        │                                 │
//! │                        ▼                                 │
//! │            CheckContext { http, reference }              │
//! │                        │                                 │
//! │        ┌───────────────┼───────────────┐                 │
//! │        ▼               ▼               ▼                 │
//! │     Probe ...       Probe ...       Probe ...  (spawned) │
//! │        └───────────────┼───────────────┘                 │
//! │                        ▼  join                           │
//! │               StatusSnapshot (Arc swap)                  │
//! └──────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//!                  report::render() ─▶ String
//! ```
//!
//! - **[`clock`]**: the reference chain head, refreshed first each cycle
//! - **[`probe`]** / **[`probes`]**: one async check per external service
//! - **[`checker`]**: cadence, fault isolation, snapshot publication
//! - **[`report`]**: fixed-order rendering of the composite report
//! - **[`client`]**: shared HTTP/GraphQL plumbing with bounded retries
//! - **[`config`]**: endpoints, credentials, and the check interval
//!
//! ## Usage
//!
//! ```no_run
//! use teia_status::{Settings, StatusChecker};
//!
//! #[tokio::main]
//! async fn main() {
//!     let settings = Settings::default();
//!     let checker = StatusChecker::new(&settings);
//!     checker.start();
//!
//!     // later, from any task: the latest report, without triggering
//!     // a check
//!     println!("{}", checker.status());
//! }
//! ```
//!
//! ## Feature flags
//!
//! - `dao-poll`: compile in the DAO distribution-poll tally, appended
//!   after the base report order.

pub mod checker;
pub mod client;
pub mod clock;
pub mod config;
pub mod probe;
pub mod probes;
pub mod report;

pub use checker::StatusChecker;
pub use client::{Http, ProbeError, RetryPolicy};
pub use clock::{ReferenceClock, ReferenceHead};
pub use config::{Endpoints, Settings};
pub use probe::{CheckContext, Probe};

pub use teia_status_types as types;
pub use teia_status_types::{
    Drift, DriftPolicy, HealthReport, Metrics, ProbeId, Status, StatusSnapshot,
};
