//! The fixed roster of checks, one module per service family.

mod activity;
#[cfg(feature = "dao-poll")]
mod dao;
mod gateway;
mod indexer;
mod lists;
mod mempool;
mod profiles;
mod rpc;
mod site;
mod storage;

use std::sync::Arc;

use crate::config::Settings;
use crate::probe::Probe;

pub use rpc::RpcNodesProbe;

/// Build the full probe roster.
///
/// The reference clock is not part of the roster: the scheduler runs it
/// first and folds its report in. Everything else lands here, and the
/// optional DAO tally is appended when compiled in.
pub fn roster(settings: &Settings) -> Vec<Arc<dyn Probe>> {
    let e = &settings.endpoints;
    #[allow(unused_mut)]
    let mut probes: Vec<Arc<dyn Probe>> = vec![
        Arc::new(site::SiteProbe::new(e.site.clone())),
        Arc::new(site::CommitProbe::new(
            e.site.clone(),
            e.github_api.clone(),
            settings.github_token.clone(),
        )),
        Arc::new(indexer::IndexerProbe::new(e.teia_graphql.clone())),
        Arc::new(indexer::TzktServerProbe::new(e.teia_tzkt_head.clone())),
        Arc::new(indexer::TeztokProbe::new(e.teztok_graphql.clone())),
        Arc::new(indexer::ObjktProbe::new(e.objkt_graphql.clone())),
        Arc::new(gateway::GatewayProbe::nft_storage_link(
            e.ipfs_gateway_artifact.clone(),
        )),
        Arc::new(gateway::GatewayProbe::teia_cache(
            e.teia_ipfs_gateway_artifact.clone(),
        )),
        Arc::new(storage::NftStorageProbe::new(
            e.nft_storage_status.clone(),
            e.nft_storage_api.clone(),
            settings.nft_storage_key.clone(),
        )),
        Arc::new(profiles::TzProfilesProbe::new(
            e.tzprofiles_graphql.clone(),
            e.tzprofiles_api.clone(),
        )),
        Arc::new(mempool::MempoolProbe::new(e.mempool_graphql.clone())),
        Arc::new(lists::RestrictedListProbe::new(e.restricted_list.clone())),
        Arc::new(RpcNodesProbe::new(e.rpc_nodes.clone())),
        Arc::new(activity::LatestMintProbe::new(e.teia_graphql.clone())),
        Arc::new(activity::MintHistoryProbe::new(e.teia_graphql.clone())),
        Arc::new(activity::SwapHistoryProbe::new(e.teia_graphql.clone())),
    ];
    #[cfg(feature = "dao-poll")]
    probes.push(Arc::new(dao::DaoPollProbe::new(settings.endpoints.dao.clone())));
    probes
}
