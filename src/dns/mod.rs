pub mod cloudflare;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::{ChallengeError, ChallengeResult};

/// Record type used for every challenge record.
pub const RECORD_TYPE_TXT: &str = "TXT";

/// TTL hint selecting the lowest tier a free account is offered.
pub const FREE_TIER_TTL: &str = "For our premium supporters";

/// Error prefixes a free-tier account gets back when a challenge
/// record already exists or the subdomain quota is used up.
pub const FREE_TIER_CONFLICTS: [&str; 2] = [
    "You already have another already existent",
    "You have no more subdomain capacity allocated",
];

/// One zone of the account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ZoneEntry {
    id: String,
    nameservers: Vec<String>,
}

/// Zones the account controls, keyed by lowercased zone name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneCatalog {
    zones: BTreeMap<String, ZoneEntry>,
}

impl ZoneCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, id: &str) {
        self.insert_with_nameservers(name, id, Vec::new());
    }

    /// Insert a zone together with the nameservers authoritative
    /// for it.
    pub fn insert_with_nameservers(&mut self, name: &str, id: &str, nameservers: Vec<String>) {
        self.zones.insert(
            normalize_name(name),
            ZoneEntry {
                id: id.to_string(),
                nameservers,
            },
        );
    }

    #[must_use]
    pub fn zone_id(&self, name: &str) -> Option<&str> {
        self.zones
            .get(&normalize_name(name))
            .map(|z| z.id.as_str())
    }

    /// Authoritative nameservers of a zone, empty when the provider
    /// did not report any.
    #[must_use]
    pub fn nameservers(&self, name: &str) -> &[String] {
        self.zones
            .get(&normalize_name(name))
            .map_or(&[], |z| z.nameservers.as_slice())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.zones.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

impl<N: AsRef<str>, I: AsRef<str>> FromIterator<(N, I)> for ZoneCatalog {
    fn from_iter<T: IntoIterator<Item = (N, I)>>(iter: T) -> Self {
        let mut catalog = Self::new();
        for (name, id) in iter {
            catalog.insert(name.as_ref(), id.as_ref());
        }
        catalog
    }
}

/// DNS names compare case-insensitively and without the root dot.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

/// A record as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// Fully-qualified record name.
    pub name: String,
    pub record_type: String,
    pub value: String,
}

/// Records of one zone, keyed by provider record id.
pub type RecordSet = BTreeMap<String, DnsRecord>;

/// Ids of every record in `records` named `fqdn`.
#[must_use]
pub fn find_record_ids(records: &RecordSet, fqdn: &str) -> Vec<String> {
    records
        .iter()
        .filter(|(_, r)| {
            r.name
                .trim_end_matches('.')
                .eq_ignore_ascii_case(fqdn.trim_end_matches('.'))
        })
        .map(|(id, _)| id.clone())
        .collect()
}

/// Decides whether a failed record creation is a conflict that a
/// delete-and-retry can clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictMatcher {
    prefixes: Vec<String>,
}

impl ConflictMatcher {
    /// Empty prefixes are dropped so they cannot match every error.
    #[must_use]
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }

    #[must_use]
    pub fn free_tier() -> Self {
        Self::new(FREE_TIER_CONFLICTS)
    }

    /// Only provider errors are considered; the message is matched
    /// by prefix after trimming leading whitespace.
    #[must_use]
    pub fn matches(&self, err: &ChallengeError) -> bool {
        let ChallengeError::Provider(message) = err else {
            return false;
        };
        let message = message.trim_start();
        self.prefixes.iter().any(|p| message.starts_with(p.as_str()))
    }
}

impl Default for ConflictMatcher {
    fn default() -> Self {
        Self::free_tier()
    }
}

/// Zone catalog and record operations of a DNS provider account.
#[async_trait]
pub trait RecordApi: Send + Sync {
    /// All zones the account controls.
    async fn list_zones(&self) -> ChallengeResult<ZoneCatalog>;

    /// All records in a zone.
    async fn list_records(&self, zone_id: &str) -> ChallengeResult<RecordSet>;

    /// Ids of the records named `fqdn`. Empty when none match.
    fn find_record_ids(&self, records: &RecordSet, fqdn: &str) -> Vec<String> {
        find_record_ids(records, fqdn)
    }

    /// Create a record. `name` is relative to the zone.
    async fn create_record(
        &self,
        zone_id: &str,
        name: &str,
        record_type: &str,
        value: &str,
        ttl: &str,
    ) -> ChallengeResult<()>;

    /// Delete one record.
    async fn delete_record(&self, zone_id: &str, record_id: &str) -> ChallengeResult<()>;

    /// TTL hint used when none is configured.
    fn default_ttl(&self) -> &str {
        FREE_TIER_TTL
    }

    /// Errors from `create_record` this provider reports for
    /// conflicting or over-quota records.
    fn conflict_matcher(&self) -> ConflictMatcher {
        ConflictMatcher::free_tier()
    }
}
