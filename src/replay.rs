use std::fmt;
use std::str::FromStr;

use crate::error::ChallengeError;

/// Identifies a created challenge record across process runs.
///
/// Written to stdout after a successful create as
/// `zoneId,recordFQDN` and read back on cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayTarget {
    pub zone_id: String,
    pub record_fqdn: String,
}

impl ReplayTarget {
    #[must_use]
    pub fn new(zone_id: &str, record_fqdn: &str) -> Self {
        Self {
            zone_id: zone_id.to_string(),
            record_fqdn: record_fqdn.to_string(),
        }
    }
}

impl fmt::Display for ReplayTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.zone_id, self.record_fqdn)
    }
}

impl FromStr for ReplayTarget {
    type Err = ChallengeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.trim().split(',').map(str::trim).collect();
        match fields.as_slice() {
            [zone_id, record_fqdn] if !zone_id.is_empty() && !record_fqdn.is_empty() => {
                Ok(Self::new(zone_id, record_fqdn))
            }
            _ => Err(ChallengeError::MalformedReplayInput(s.to_string())),
        }
    }
}
