//! Tally of the DAO token distribution poll (feature `dao-poll`).
//!
//! Kept out of the base roster: the poll is a one-off community vote, so
//! the probe is compiled in on demand and appended after the declared
//! report order.

use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::Value;

use teia_status_types::{HealthReport, ProbeId};

use crate::client::ProbeError;
use crate::config::DaoEndpoints;
use crate::probe::{CheckContext, Probe};

const DAO_UNKNOWN: &str = "Cannot determine Teia Token Distribution Voting results";
const USERS_NOT_ARRAY: &str = "Teia user list is not formatted correctly.";

/// Tallies votes on the distribution poll, counting only ballots cast by
/// addresses on the Teia users list.
pub struct DaoPollProbe {
    endpoints: DaoEndpoints,
}

impl DaoPollProbe {
    pub fn new(endpoints: DaoEndpoints) -> Self {
        Self { endpoints }
    }
}

#[async_trait]
impl Probe for DaoPollProbe {
    fn id(&self) -> ProbeId {
        ProbeId::DaoPoll
    }

    async fn run(&self, cx: &CheckContext) -> Result<HealthReport, ProbeError> {
        let users: Value = cx.http.get_json(&self.endpoints.users_list).await?;
        let Some(users) = users.as_array() else {
            return Ok(HealthReport::down(self.id(), USERS_NOT_ARRAY));
        };
        let eligible: HashSet<&str> = users.iter().filter_map(Value::as_str).collect();

        let poll: Value = cx.http.get_json(&self.endpoints.poll_info).await?;
        let options = poll_options(&poll);

        let votes: Value = cx.http.get_json(&self.endpoints.votes).await?;
        let votes = votes
            .as_array()
            .ok_or_else(|| ProbeError::MalformedResponse("votes are not an array".into()))?;

        let mut tallies = vec![0u64; options.len()];
        let mut valid = 0u64;
        let mut invalid = 0u64;
        for vote in votes {
            let by_user = vote["key"]["address"]
                .as_str()
                .map(|address| eligible.contains(address))
                .unwrap_or(false);
            if !by_user {
                invalid += 1;
                continue;
            }
            valid += 1;
            if let Some(choice) = vote["value"]
                .as_str()
                .and_then(|raw| raw.parse::<usize>().ok())
            {
                if (1..=tallies.len()).contains(&choice) {
                    tallies[choice - 1] += 1;
                }
            }
        }

        let mut message = format!(
            "{valid} Teia users have voted so far ({invalid} votes were invalid):"
        );
        for (option, count) in options.iter().zip(&tallies) {
            let share = if valid == 0 {
                0.0
            } else {
                *count as f64 * 100.0 / valid as f64
            };
            message.push_str(&format!("\n- {option}: {count} votes ({share:.1}%)"));
        }

        Ok(HealthReport::ok(self.id(), message).with_count(valid))
    }

    fn fallback(&self, _error: &ProbeError) -> HealthReport {
        HealthReport::unknown(self.id(), DAO_UNKNOWN)
    }
}

/// Option labels from the poll document. Single-choice polls label their
/// two options YES/NO; additional labels come from the `opt*` fields.
fn poll_options(poll: &Value) -> Vec<String> {
    if poll["multi"] == "false" {
        return vec!["YES".into(), "NO".into()];
    }
    (1..=3)
        .filter_map(|i| poll[format!("opt{i}")].as_str().map(str::to_owned))
        .collect()
}
