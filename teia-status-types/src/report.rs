//! Probe identities and per-probe health reports.

use core::fmt;

use crate::Status;

/// Identity of every check in the roster.
///
/// [`ProbeId::ALL`] declares the report order, which is part of the
/// external contract: consumers of the rendered report scan it
/// positionally. `DaoPoll` is not part of the base order; it is appended
/// at the end when the optional DAO check is compiled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum ProbeId {
    TeiaSite,
    TeiaCommit,
    TeiaIndexer,
    TeiaTzkt,
    TeztokIndexer,
    ObjktIndexer,
    IpfsGateway,
    TeiaIpfsGateway,
    NftStorage,
    TzktApi,
    Tzprofiles,
    Mempool,
    RestrictedList,
    RpcNodes,
    LatestMint,
    MintHistory,
    SwapHistory,
    DaoPoll,
}

impl ProbeId {
    /// The base roster, in report order.
    pub const ALL: [ProbeId; 17] = [
        ProbeId::TeiaSite,
        ProbeId::TeiaCommit,
        ProbeId::TeiaIndexer,
        ProbeId::TeiaTzkt,
        ProbeId::TeztokIndexer,
        ProbeId::ObjktIndexer,
        ProbeId::IpfsGateway,
        ProbeId::TeiaIpfsGateway,
        ProbeId::NftStorage,
        ProbeId::TzktApi,
        ProbeId::Tzprofiles,
        ProbeId::Mempool,
        ProbeId::RestrictedList,
        ProbeId::RpcNodes,
        ProbeId::LatestMint,
        ProbeId::MintHistory,
        ProbeId::SwapHistory,
    ];

    /// Stable kebab-case identifier, used in logs and serialized output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeId::TeiaSite => "teia-site",
            ProbeId::TeiaCommit => "teia-commit",
            ProbeId::TeiaIndexer => "teia-indexer",
            ProbeId::TeiaTzkt => "teia-tzkt",
            ProbeId::TeztokIndexer => "teztok-indexer",
            ProbeId::ObjktIndexer => "objkt-indexer",
            ProbeId::IpfsGateway => "ipfs-gateway",
            ProbeId::TeiaIpfsGateway => "teia-ipfs-gateway",
            ProbeId::NftStorage => "nft-storage",
            ProbeId::TzktApi => "tzkt-api",
            ProbeId::Tzprofiles => "tzprofiles",
            ProbeId::Mempool => "mempool",
            ProbeId::RestrictedList => "restricted-list",
            ProbeId::RpcNodes => "rpc-nodes",
            ProbeId::LatestMint => "latest-mint",
            ProbeId::MintHistory => "mint-history",
            ProbeId::SwapHistory => "swap-history",
            ProbeId::DaoPoll => "dao-poll",
        }
    }

    /// Human-readable subject, used in placeholder and fallback messages.
    pub fn label(&self) -> &'static str {
        match self {
            ProbeId::TeiaSite => "Teia.art",
            ProbeId::TeiaCommit => "Teia.art deployment",
            ProbeId::TeiaIndexer => "Teia indexer",
            ProbeId::TeiaTzkt => "Teia TzKT server",
            ProbeId::TeztokIndexer => "TezTok indexer",
            ProbeId::ObjktIndexer => "Objkt.com indexer",
            ProbeId::IpfsGateway => "IPFS gateway (nftstorage.link)",
            ProbeId::TeiaIpfsGateway => "IPFS gateway (cache.teia.rocks)",
            ProbeId::NftStorage => "NFT.Storage",
            ProbeId::TzktApi => "TzKT API",
            ProbeId::Tzprofiles => "TzProfiles",
            ProbeId::Mempool => "Blockchain mempool",
            ProbeId::RestrictedList => "Restricted list",
            ProbeId::RpcNodes => "RPC nodes",
            ProbeId::LatestMint => "Latest mint",
            ProbeId::MintHistory => "Mint history",
            ProbeId::SwapHistory => "Swap history",
            ProbeId::DaoPoll => "DAO distribution poll",
        }
    }
}

impl fmt::Display for ProbeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional numeric measurements attached to a report.
///
/// Which fields are populated depends on the probe: drift checks fill
/// `delta`, latency checks fill `latency_ms`, tally checks fill `count`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Metrics {
    /// Block or minute distance from the reference, where measured.
    pub delta: Option<u64>,
    /// Round-trip time in milliseconds, where measured.
    pub latency_ms: Option<u64>,
    /// Item tally (pending transactions, votes, mints), where measured.
    pub count: Option<u64>,
}

/// The outcome of one probe for one cycle.
///
/// Reports are immutable once constructed; a probe's next run replaces the
/// previous report wholesale rather than mutating it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HealthReport {
    pub id: ProbeId,
    pub status: Status,
    /// Human-readable verdict line(s). Multi-line messages are allowed and
    /// are rendered verbatim.
    pub message: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub metrics: Metrics,
}

impl HealthReport {
    pub fn new(id: ProbeId, status: Status, message: impl Into<String>) -> Self {
        Self {
            id,
            status,
            message: message.into(),
            metrics: Metrics::default(),
        }
    }

    pub fn ok(id: ProbeId, message: impl Into<String>) -> Self {
        Self::new(id, Status::Ok, message)
    }

    pub fn unknown(id: ProbeId, message: impl Into<String>) -> Self {
        Self::new(id, Status::Unknown, message)
    }

    pub fn degraded(id: ProbeId, message: impl Into<String>) -> Self {
        Self::new(id, Status::Degraded, message)
    }

    pub fn down(id: ProbeId, message: impl Into<String>) -> Self {
        Self::new(id, Status::Down, message)
    }

    pub fn with_delta(mut self, delta: u64) -> Self {
        self.metrics.delta = Some(delta);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.metrics.latency_ms = Some(latency_ms);
        self
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.metrics.count = Some(count);
        self
    }
}
