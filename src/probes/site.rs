//! Checks for the Teia GUI: reachability and deployed revision.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use teia_status_types::{HealthReport, ProbeId};

use crate::client::ProbeError;
use crate::probe::{CheckContext, Probe};

const SITE_ONLINE: &str = "Teia.art is online.";
const SITE_OFFLINE: &str = "Teia.art is offline.";

/// A served GUI page always carries a document head; an error page from
/// the hosting layer does not.
const HEAD_MARKER: &str = "<head>";

/// Reachability of the Teia GUI itself.
pub struct SiteProbe {
    url: String,
}

impl SiteProbe {
    pub fn new(url: String) -> Self {
        Self { url }
    }
}

#[async_trait]
impl Probe for SiteProbe {
    fn id(&self) -> ProbeId {
        ProbeId::TeiaSite
    }

    async fn run(&self, cx: &CheckContext) -> Result<HealthReport, ProbeError> {
        let body = cx.http.get_text(&self.url).await?;
        if body.contains(HEAD_MARKER) {
            Ok(HealthReport::ok(self.id(), SITE_ONLINE))
        } else {
            Ok(HealthReport::down(self.id(), SITE_OFFLINE))
        }
    }

    fn fallback(&self, _error: &ProbeError) -> HealthReport {
        HealthReport::down(self.id(), SITE_OFFLINE)
    }
}

const COMMIT_LATEST: &str = "Teia.art has the latest GitHub commit.";
const COMMIT_BEHIND: &str = "Teia.art is behind the latest GitHub commit.";
const COMMIT_UNKNOWN: &str = "Cannot determine the commit deployed on Teia.art.";

const COMMIT_HEADER: &str = "x-teia-commit-hash";
const UI_REPO: &str = "teia-community/teia-ui";

fn build_commit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<meta name="build-commit" content="([a-z0-9]*)""#)
            .expect("valid build-commit regex")
    })
}

#[derive(Debug, Deserialize)]
struct CommitInfo {
    sha: String,
}

/// Compares the revision the GUI serves against the newest commit on the
/// main branch of its repository.
pub struct CommitProbe {
    site: String,
    github_api: String,
    token: Option<String>,
}

impl CommitProbe {
    pub fn new(site: String, github_api: String, token: Option<String>) -> Self {
        Self {
            site,
            github_api,
            token,
        }
    }

    /// The deployed commit, from the response header when the host sets
    /// it, otherwise from the build-commit meta tag in the page.
    async fn deployed_sha(&self, cx: &CheckContext) -> Result<Option<String>, ProbeError> {
        match cx.http.head_header(&self.site, COMMIT_HEADER).await {
            Ok(Some(sha)) if !sha.is_empty() => return Ok(Some(sha)),
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(error = %err, "commit header probe failed, trying the page body")
            }
        }
        let body = cx.http.get_text(&self.site).await?;
        Ok(build_commit_re()
            .captures(&body)
            .map(|captures| captures[1].to_string()))
    }
}

#[async_trait]
impl Probe for CommitProbe {
    fn id(&self) -> ProbeId {
        ProbeId::TeiaCommit
    }

    async fn run(&self, cx: &CheckContext) -> Result<HealthReport, ProbeError> {
        let Some(deployed) = self.deployed_sha(cx).await? else {
            return Ok(HealthReport::unknown(self.id(), COMMIT_UNKNOWN));
        };

        let url = format!("{}/repos/{}/commits/main", self.github_api, UI_REPO);
        let latest: CommitInfo = cx
            .http
            .get_json_bearer(&url, self.token.as_deref())
            .await?;

        if latest.sha == deployed {
            Ok(HealthReport::ok(self.id(), COMMIT_LATEST))
        } else {
            Ok(HealthReport::degraded(self.id(), COMMIT_BEHIND))
        }
    }

    fn fallback(&self, _error: &ProbeError) -> HealthReport {
        HealthReport::unknown(self.id(), COMMIT_UNKNOWN)
    }
}
