//! Severity classification for a single check.

use core::fmt;

/// Health classification of one probe outcome.
///
/// Variants are declared in severity order, so the derived `Ord` lets the
/// worst status of a set be taken with `Iterator::max`. `Unknown` ranks
/// above `Ok`: a check that could not run is worse than one that passed,
/// but says less than a confirmed degradation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Status {
    /// The service behaved as expected.
    Ok,
    /// The check could not produce a verdict.
    Unknown,
    /// The service responded but outside its normal envelope.
    Degraded,
    /// The service is unreachable or failing.
    Down,
}

impl Status {
    /// True only for [`Status::Ok`].
    pub fn is_healthy(&self) -> bool {
        matches!(self, Status::Ok)
    }

    /// Stable uppercase token, usable in logs and report summaries.
    pub fn symbol(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Unknown => "UNKNOWN",
            Status::Degraded => "DEGRADED",
            Status::Down => "DOWN",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering_matches_declaration() {
        assert!(Status::Ok < Status::Unknown);
        assert!(Status::Unknown < Status::Degraded);
        assert!(Status::Degraded < Status::Down);
    }

    #[test]
    fn worst_of_a_set_is_the_max() {
        let statuses = [Status::Ok, Status::Degraded, Status::Unknown];
        assert_eq!(statuses.into_iter().max(), Some(Status::Degraded));
    }

    #[test]
    fn only_ok_is_healthy() {
        assert!(Status::Ok.is_healthy());
        assert!(!Status::Unknown.is_healthy());
        assert!(!Status::Degraded.is_healthy());
        assert!(!Status::Down.is_healthy());
    }

    #[test]
    fn symbols_are_uppercase_tokens() {
        assert_eq!(Status::Ok.symbol(), "OK");
        assert_eq!(Status::Down.to_string(), "DOWN");
    }
}
