//! # teia-status-types
//!
//! Core types shared by the teia.art status checker and anything that
//! consumes its output.
//!
//! This crate is deliberately free of I/O. It defines:
//!
//! - [`ProbeId`]: the fixed roster of checks and their report order
//! - [`Status`]: severity classification for a single check
//! - [`HealthReport`]: the outcome of one check for one cycle
//! - [`DriftPolicy`] / [`Drift`]: threshold comparison between two views
//!   of the chain
//! - [`StatusSnapshot`]: the fully-merged, immutable result of one cycle
//!
//! ## Example
//!
//! ```
//! use teia_status_types::{DriftPolicy, HealthReport, ProbeId};
//!
//! let drift = DriftPolicy::blocks(50).compare(1000, 1060);
//! assert!(!drift.in_sync);
//!
//! let report = HealthReport::degraded(
//!     ProbeId::TeiaIndexer,
//!     format!("Teia indexer is currently {}.", drift.delay()),
//! )
//! .with_delta(drift.delta);
//! assert_eq!(report.metrics.delta, Some(60));
//! ```
//!
//! ## Feature flags
//!
//! - `serde`: derive `Serialize`/`Deserialize` for every type in this crate.

pub mod drift;
pub mod report;
pub mod snapshot;
pub mod status;

pub use drift::{Drift, DriftPolicy, DriftUnit};
pub use report::{HealthReport, Metrics, ProbeId};
pub use snapshot::StatusSnapshot;
pub use status::Status;
