//! Validation of the community-maintained restricted list.
//!
//! The list gates marketplace actions; a malformed entry would silently
//! disable the restriction, so shape errors are reported as `Down`.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use teia_status_types::{HealthReport, ProbeId};

use crate::client::ProbeError;
use crate::probe::{CheckContext, Probe};

const LIST_OK: &str = "Restricted list is well-formatted.";
const LIST_NOT_ARRAY: &str = "Restricted list is not formatted correctly.";
const LIST_UNAVAILABLE: &str = "Restricted list could not be retrieved.";

fn address_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(tz1|tz2|tz3|KT1)[0-9a-zA-Z]{33}$").expect("valid address regex")
    })
}

/// True when `account` has the shape of a Tezos address.
pub(crate) fn valid_tezos_account(account: &str) -> bool {
    address_re().is_match(account.trim())
}

/// Downloads the restricted list and validates every entry.
pub struct RestrictedListProbe {
    url: String,
}

impl RestrictedListProbe {
    pub fn new(url: String) -> Self {
        Self { url }
    }
}

#[async_trait]
impl Probe for RestrictedListProbe {
    fn id(&self) -> ProbeId {
        ProbeId::RestrictedList
    }

    async fn run(&self, cx: &CheckContext) -> Result<HealthReport, ProbeError> {
        let list: Value = cx.http.get_json(&self.url).await?;
        let Some(entries) = list.as_array() else {
            return Ok(HealthReport::down(self.id(), LIST_NOT_ARRAY));
        };

        for entry in entries {
            let invalid = match entry.as_str() {
                Some(account) if valid_tezos_account(account) => continue,
                Some(account) => account.trim().to_string(),
                None => entry.to_string(),
            };
            return Ok(HealthReport::down(
                self.id(),
                format!("Restricted list contains an invalid address: {invalid}."),
            ));
        }
        Ok(HealthReport::ok(self.id(), LIST_OK).with_count(entries.len() as u64))
    }

    fn fallback(&self, _error: &ProbeError) -> HealthReport {
        HealthReport::down(self.id(), LIST_UNAVAILABLE)
    }
}
