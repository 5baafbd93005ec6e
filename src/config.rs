//! Runtime configuration.
//!
//! Every knob has a production default, so the checker runs with no
//! configuration at all. A TOML file and `TEIA_STATUS__*` environment
//! variables can override individual fields; credentials are only ever
//! read from those sources.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Account with a long, stable operation history, used for reachability
/// lookups against TzKT and TzProfiles.
pub const CANARY_ACCOUNT: &str = "tz1XtjZTzEM6EQ3TnUPUQviCD6WfcsZRHXbj";

/// External endpoints the checks talk to.
///
/// Kept separate from credentials so tests can point every probe at a
/// local mock server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// TzKT API base, the reference clock's source.
    pub tzkt_api: String,
    /// Teia dipdup indexer GraphQL endpoint.
    pub teia_graphql: String,
    /// Teia-operated TzKT head endpoint.
    pub teia_tzkt_head: String,
    /// TezTok indexer GraphQL endpoint.
    pub teztok_graphql: String,
    /// Objkt.com indexer GraphQL endpoint.
    pub objkt_graphql: String,
    /// The Teia GUI itself.
    pub site: String,
    /// GitHub REST API base, for the deployed-commit comparison.
    pub github_api: String,
    /// NFT.Storage public status page.
    pub nft_storage_status: String,
    /// NFT.Storage API base, for the authorized retrieval check.
    pub nft_storage_api: String,
    /// Pinned artifact fetched through the public IPFS gateway.
    pub ipfs_gateway_artifact: String,
    /// Pinned artifact fetched through the Teia cache gateway.
    pub teia_ipfs_gateway_artifact: String,
    /// TzProfiles dipdup GraphQL endpoint.
    pub tzprofiles_graphql: String,
    /// TzProfiles lookup API base.
    pub tzprofiles_api: String,
    /// Dipdup mempool GraphQL endpoint.
    pub mempool_graphql: String,
    /// Community-maintained restricted list, served raw from GitHub.
    pub restricted_list: String,
    /// RPC node hosts checked by the fan-out probe. A bare host gets
    /// `https://` prepended; entries may carry an explicit scheme.
    pub rpc_nodes: Vec<String>,
    #[cfg(feature = "dao-poll")]
    pub dao: DaoEndpoints,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            tzkt_api: "https://api.tzkt.io".into(),
            teia_graphql: "https://api.teia.rocks/v1/graphql".into(),
            teia_tzkt_head: "https://tzkt.teia.rocks/v1/head".into(),
            teztok_graphql: "https://teztok.teia.rocks/v1/graphql".into(),
            objkt_graphql: "https://data.objkt.com/v3/graphql".into(),
            site: "https://teia.art".into(),
            github_api: "https://api.github.com".into(),
            nft_storage_status: "https://status.nft.storage/".into(),
            nft_storage_api: "https://api.nft.storage".into(),
            ipfs_gateway_artifact:
                "https://nftstorage.link/ipfs/bafybeibwzifw52ttrkqlikfzext5akxu7lz4xiwjgwzmqcpdzmp3n5vnbe"
                    .into(),
            teia_ipfs_gateway_artifact:
                "https://cache.teia.rocks/ipfs/Qmf46hrJfcA8TvEMh6VNHM2G4JxsykxfYwcfhRr5ZFT12E"
                    .into(),
            tzprofiles_graphql: "https://indexer.tzprofiles.com/v1/graphql".into(),
            tzprofiles_api: "https://api.tzprofiles.com".into(),
            mempool_graphql: "https://mempool.dipdup.net/v1/graphql".into(),
            restricted_list:
                "https://raw.githubusercontent.com/teia-community/teia-report/main/restricted.json"
                    .into(),
            rpc_nodes: vec![
                "mainnet.api.tez.ie".into(),
                "mainnet.smartpy.io".into(),
                "rpc.tzbeta.net".into(),
                "mainnet.tezos.marigold.dev".into(),
                "rpc.tzkt.io/mainnet".into(),
                "mainnet.teia.rocks".into(),
            ],
            #[cfg(feature = "dao-poll")]
            dao: DaoEndpoints::default(),
        }
    }
}

/// Endpoints for the optional DAO distribution-poll tally.
#[cfg(feature = "dao-poll")]
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaoEndpoints {
    /// Eligible-voter list, pinned on IPFS.
    pub users_list: String,
    /// Poll metadata document, pinned on IPFS.
    pub poll_info: String,
    /// TzKT bigmap query returning every vote cast on the poll.
    pub votes: String,
}

#[cfg(feature = "dao-poll")]
impl Default for DaoEndpoints {
    fn default() -> Self {
        Self {
            users_list:
                "https://cache.teia.rocks/ipfs/QmNihShvZkXq7aoSSH3Nt1VeLjgGkESr3LoCzShNyV4uzp"
                    .into(),
            poll_info:
                "https://cache.teia.rocks/ipfs/QmeJ9ATjn4ge9phDzvpmdZzRZdRoKJdyk4swPiVgaxAx6z"
                    .into(),
            votes: "https://api.mainnet.tzkt.io/v1/bigmaps/64367/keys?limit=10000&key.string=QmeJ9ATjn4ge9phDzvpmdZzRZdRoKJdyk4swPiVgaxAx6z"
                .into(),
        }
    }
}

/// Top-level settings for the checker.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seconds between check cycles.
    pub interval_secs: Option<u64>,
    /// API key for the NFT.Storage authorized retrieval check. Without
    /// it, the probe stops at the public status page.
    pub nft_storage_key: Option<String>,
    /// Token for the GitHub commits API, to avoid anonymous rate limits.
    pub github_token: Option<String>,
    pub endpoints: Endpoints,
}

impl Settings {
    pub const DEFAULT_INTERVAL_SECS: u64 = 60;

    /// Load settings from an optional TOML file, then apply
    /// `TEIA_STATUS__*` environment overrides on top.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }
        builder
            .add_source(
                config::Environment::with_prefix("TEIA_STATUS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.unwrap_or(Self::DEFAULT_INTERVAL_SECS))
    }
}
