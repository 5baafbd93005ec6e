//! NFT.Storage health: public status page plus an authorized retrieval.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use teia_status_types::{HealthReport, ProbeId};

use crate::client::ProbeError;
use crate::probe::{CheckContext, Probe};

const STORAGE_OPERATIONAL: &str = "NFT.Storage is operational.";
const STORAGE_INCIDENT: &str = "NFT.Storage is experiencing an incident.";
const STORAGE_OUTAGE: &str = "NFT.Storage is experiencing an outage.";
const STORAGE_UNKNOWN: &str = "NFT.Storage status is unknown.";

/// Marker the status page renders while any incident is open.
const INCIDENT_MARKER: &str = "unresolved-incidents";

/// A CID known to be stored, fetched through the authorized API.
const CHECK_CID: &str = "bafkreidivzimqfqtoqxkrpge6bjyhlvxqs3rhe73owtmdulaxr5do5in7u";

fn component_status_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)data-component-status="([a-z_]*)""#)
            .expect("valid component-status regex")
    })
}

#[derive(Debug, Deserialize)]
struct StorageCheck {
    ok: bool,
}

/// Scrapes the NFT.Storage status page, then confirms the API actually
/// serves stored content when an API key is configured.
pub struct NftStorageProbe {
    status_url: String,
    api: String,
    key: Option<String>,
}

impl NftStorageProbe {
    pub fn new(status_url: String, api: String, key: Option<String>) -> Self {
        Self {
            status_url,
            api,
            key,
        }
    }
}

#[async_trait]
impl Probe for NftStorageProbe {
    fn id(&self) -> ProbeId {
        ProbeId::NftStorage
    }

    async fn run(&self, cx: &CheckContext) -> Result<HealthReport, ProbeError> {
        let page = cx.http.get_text(&self.status_url).await?;

        if page.contains(INCIDENT_MARKER) {
            return Ok(HealthReport::degraded(self.id(), STORAGE_INCIDENT));
        }
        let Some(component) = component_status_re()
            .captures(&page)
            .map(|captures| captures[1].to_lowercase())
        else {
            return Ok(HealthReport::unknown(self.id(), STORAGE_UNKNOWN));
        };
        if component != "operational" {
            return Ok(HealthReport::down(self.id(), STORAGE_OUTAGE));
        }

        // Page says operational; without a key that verdict stands.
        let Some(key) = self.key.as_deref() else {
            return Ok(HealthReport::ok(self.id(), STORAGE_OPERATIONAL));
        };
        let url = format!("{}/{}", self.api, CHECK_CID);
        match cx.http.get_json_bearer::<StorageCheck>(&url, Some(key)).await {
            Ok(check) if check.ok => Ok(HealthReport::ok(self.id(), STORAGE_OPERATIONAL)),
            Ok(_) => Ok(HealthReport::down(self.id(), STORAGE_OUTAGE)),
            Err(err) => {
                warn!(error = %err, "NFT.Storage API retrieval failed");
                Ok(HealthReport::down(self.id(), STORAGE_OUTAGE))
            }
        }
    }

    fn fallback(&self, _error: &ProbeError) -> HealthReport {
        HealthReport::unknown(self.id(), STORAGE_UNKNOWN)
    }
}
