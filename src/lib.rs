//! Certbot manual hook for ACME DNS-01 challenges.
//!
//! The hook publishes the challenge token as a TXT record at
//! `_acme-challenge.<domain>`, waits until the zone's
//! authoritative nameserver serves it, and removes it again on a
//! later cleanup run.
//!
//! # Overview
//!
//! - [`ChallengeLifecycle`] drives a challenge: it resolves the
//!   zone, replaces any stale record, recovers once from a
//!   provider conflict, then hands over to the
//!   [`PropagationPoller`].
//! - [`RecordApi`](dns::RecordApi) is the provider seam (zone
//!   catalog, record listing, creation, deletion), implemented for
//!   [`Cloudflare`].
//! - [`TxtLookup`](lookup::TxtLookup) is the DNS seam,
//!   implemented by [`NameserverLookup`] against a single
//!   nameserver, either configured or taken from the zone.
//!
//! # Create and delete
//!
//! Creation and deletion happen in separate processes. After a
//! successful create the hook prints `zoneId,recordFQDN`; certbot
//! passes that line back through `CERTBOT_AUTH_OUTPUT` to the
//! cleanup run, which parses it as a [`ReplayTarget`].
//!
//! ```sh
//! certbot certonly --manual --preferred-challenges dns \
//!     --manual-auth-hook dns01-hook \
//!     --manual-cleanup-hook dns01-hook \
//!     -d example.com
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use dns01_hook::{
//!     ChallengeLifecycle, ChallengeRequest, Cloudflare,
//!     NameserverLookup,
//! };
//! use std::time::Duration;
//!
//! # async fn run() -> anyhow::Result<()> {
//! // polls the nameservers Cloudflare lists for the zone
//! let lookup = NameserverLookup::follow_zone(Duration::from_secs(3));
//! let lifecycle =
//!     ChallengeLifecycle::new(Cloudflare::from_env().await?, lookup);
//!
//! let request = ChallengeRequest::new("www.example.com", "token")
//!     .timeout(Duration::from_secs(600));
//! let outcome = lifecycle.create(&request).await?;
//! println!("{}", outcome.record.replay_target());
//! # Ok(())
//! # }
//! ```

// Allow noisy pedantic lints that don't add value for a
// hook binary's library.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod deadline;
pub mod dns;
pub mod error;
pub mod lifecycle;
pub mod lookup;
pub mod poller;
pub mod replay;
pub mod zone;

pub use config::HookConfig;
pub use deadline::Deadline;
pub use dns::cloudflare::Cloudflare;
pub use dns::{ConflictMatcher, DnsRecord, RecordApi, RecordSet, ZoneCatalog};
pub use error::{ChallengeError, ChallengeResult};
pub use lifecycle::{ChallengeLifecycle, ChallengeRecord, ChallengeRequest, CreateOutcome};
pub use lookup::{LookupError, NameserverLookup, TxtLookup};
pub use poller::{Observation, PollAttempt, PollOutcome, PollPolicy, PollReport, PropagationPoller};
pub use replay::ReplayTarget;
pub use zone::{record_name_for, resolve_zone};
