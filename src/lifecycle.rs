//! Create and delete of a DNS-01 challenge record.
//!
//! `create` runs `resolve zone -> remove stale record -> create
//! (one conflict retry) -> wait for propagation`. `delete` runs in
//! a later process and only knows the [`ReplayTarget`] printed by
//! `create`.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::deadline::Deadline;
use crate::dns::{ConflictMatcher, RECORD_TYPE_TXT, RecordApi, ZoneCatalog, normalize_name};
use crate::error::{ChallengeError, ChallengeResult};
use crate::lookup::TxtLookup;
use crate::poller::{PollPolicy, PollReport, PropagationPoller};
use crate::replay::ReplayTarget;
use crate::zone;

/// Input of one create run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeRequest {
    /// Domain under validation.
    pub challenge_domain: String,
    /// Token supplied by the CA.
    pub challenge_value: String,
    /// Overall deadline; `None` or zero means no deadline.
    pub timeout: Option<Duration>,
}

impl ChallengeRequest {
    #[must_use]
    pub fn new(challenge_domain: &str, challenge_value: &str) -> Self {
        Self {
            challenge_domain: challenge_domain.to_string(),
            challenge_value: challenge_value.to_string(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Where the challenge record lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeRecord {
    pub zone_id: String,
    pub zone_name: String,
    /// Host label relative to the zone.
    pub record_name: String,
    pub record_fqdn: String,
    /// Authoritative nameservers the provider lists for the zone.
    pub nameservers: Vec<String>,
}

impl ChallengeRecord {
    /// Pick the zone for `domain` from `catalog` and name the
    /// record.
    pub fn derive(catalog: &ZoneCatalog, domain: &str) -> ChallengeResult<Self> {
        let domain = normalize_name(domain);
        let domain = domain.as_str();
        let zone_name =
            zone::resolve_zone(catalog.names(), domain).ok_or_else(|| {
                ChallengeError::ZoneNotFound {
                    domain: domain.to_string(),
                }
            })?;
        let zone_id = catalog
            .zone_id(zone_name)
            .ok_or_else(|| ChallengeError::ZoneNotFound {
                domain: domain.to_string(),
            })?;
        let record_name = zone::record_name_for(domain, zone_name);
        let record_fqdn = zone::record_fqdn(&record_name, zone_name);
        Ok(Self {
            zone_id: zone_id.to_string(),
            zone_name: zone_name.to_string(),
            record_name,
            record_fqdn,
            nameservers: catalog.nameservers(zone_name).to_vec(),
        })
    }

    #[must_use]
    pub fn replay_target(&self) -> ReplayTarget {
        ReplayTarget::new(&self.zone_id, &self.record_fqdn)
    }
}

/// Result of a successful create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOutcome {
    pub record: ChallengeRecord,
    /// Whether creation hit a provider conflict and was retried.
    pub conflict_retried: bool,
    pub report: PollReport,
}

/// Drives one challenge through a provider's record API and a TXT
/// lookup.
pub struct ChallengeLifecycle<A, L> {
    api: A,
    poller: PropagationPoller<L>,
    conflict: ConflictMatcher,
    ttl: Option<String>,
    token: CancellationToken,
}

impl<A: RecordApi, L: TxtLookup> ChallengeLifecycle<A, L> {
    /// Uses the provider's own conflict matcher and TTL and the
    /// default poll policy.
    #[must_use]
    pub fn new(api: A, lookup: L) -> Self {
        let conflict = api.conflict_matcher();
        Self {
            api,
            poller: PropagationPoller::new(lookup, PollPolicy::default()),
            conflict,
            ttl: None,
            token: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poller.set_policy(policy);
        self
    }

    #[must_use]
    pub fn conflict_matcher(mut self, matcher: ConflictMatcher) -> Self {
        self.conflict = matcher;
        self
    }

    #[must_use]
    pub fn ttl(mut self, ttl: &str) -> Self {
        self.ttl = Some(ttl.to_string());
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Publish the challenge TXT record and wait until the
    /// nameserver serves it.
    ///
    /// A record left by an earlier run is removed first. If the
    /// provider rejects creation with a conflict, every record at
    /// the name is deleted and creation is retried once.
    pub async fn create(&self, request: &ChallengeRequest) -> ChallengeResult<CreateOutcome> {
        let deadline = Deadline::new(request.timeout, self.token.clone());

        let catalog = deadline.run(self.api.list_zones()).await??;
        let record = ChallengeRecord::derive(&catalog, &request.challenge_domain)?;
        info!(
            zone_name = %record.zone_name,
            zone_id = %record.zone_id,
            nameservers = ?record.nameservers,
            "found zone"
        );
        deadline
            .run(self.poller.lookup().use_zone_nameservers(&record.nameservers))
            .await??;

        deadline.check()?;
        match self.delete_matching(&deadline, &record.zone_id, &record.record_fqdn).await {
            Ok(count) => info!(record = %record.record_fqdn, count, "removed stale challenge records"),
            Err(ChallengeError::RecordNotFound { .. }) => {
                debug!(record = %record.record_fqdn, "no stale challenge record");
            }
            Err(e) => return Err(e),
        }

        deadline.check()?;
        info!(
            name = %record.record_name,
            value = %request.challenge_value,
            "creating dns challenge"
        );
        let payload = format!("\"{}\"", request.challenge_value);
        let mut conflict_retried = false;
        if let Err(err) = self.create_record(&deadline, &record, &payload).await {
            if err.is_interrupt() || !self.conflict.matches(&err) {
                return Err(err);
            }
            warn!(error = %err, "existing challenge, deleting and retrying creation");

            deadline.check()?;
            match self.delete_matching(&deadline, &record.zone_id, &record.record_fqdn).await {
                Ok(_) | Err(ChallengeError::RecordNotFound { .. }) => {}
                Err(e) => return Err(e),
            }

            deadline.check()?;
            self.create_record(&deadline, &record, &payload).await?;
            conflict_retried = true;
        }

        deadline.check()?;
        let report = self
            .poller
            .await_value(&record.record_fqdn, &request.challenge_value, &deadline)
            .await;
        if let Some(err) = report.error(&record.record_fqdn) {
            return Err(err);
        }

        Ok(CreateOutcome {
            record,
            conflict_retried,
            report,
        })
    }

    /// Delete every record named `target.record_fqdn` in
    /// `target.zone_id`. Returns how many were deleted.
    ///
    /// Fails with [`ChallengeError::RecordNotFound`] when none
    /// match. Stops at the first failed deletion.
    pub async fn delete(
        &self,
        target: &ReplayTarget,
        timeout: Option<Duration>,
    ) -> ChallengeResult<usize> {
        let deadline = Deadline::new(timeout, self.token.clone());
        self.delete_matching(&deadline, &target.zone_id, &target.record_fqdn)
            .await
    }

    async fn create_record(
        &self,
        deadline: &Deadline,
        record: &ChallengeRecord,
        payload: &str,
    ) -> ChallengeResult<()> {
        deadline
            .run(self.api.create_record(
                &record.zone_id,
                &record.record_name,
                RECORD_TYPE_TXT,
                payload,
                self.ttl.as_deref().unwrap_or_else(|| self.api.default_ttl()),
            ))
            .await?
    }

    async fn delete_matching(
        &self,
        deadline: &Deadline,
        zone_id: &str,
        fqdn: &str,
    ) -> ChallengeResult<usize> {
        let records = deadline.run(self.api.list_records(zone_id)).await??;
        let ids = self.api.find_record_ids(&records, fqdn);
        info!(record = %fqdn, record_ids = ?ids, "found records to delete");
        if ids.is_empty() {
            return Err(ChallengeError::RecordNotFound {
                fqdn: fqdn.to_string(),
            });
        }

        for id in &ids {
            deadline.run(self.api.delete_record(zone_id, id)).await??;
        }
        Ok(ids.len())
    }
}
