//! TXT lookups against one authoritative nameserver.

use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfig, ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::xfer::Protocol;
use hickory_resolver::{Resolver, TokioResolver};
use tracing::{info, warn};

use crate::error::{ChallengeError, ChallengeResult};

/// Port used for nameservers given without one.
pub const DNS_PORT: u16 = 53;

/// Why a TXT lookup produced no answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// The name does not exist (yet).
    #[error("no such record: {0}")]
    NotFound(String),

    /// Anything else: timeouts, refused queries, network errors.
    #[error("{0}")]
    Other(String),
}

/// Capability to look up the TXT values published at a name.
#[async_trait]
pub trait TxtLookup: Send + Sync {
    /// Offer the nameservers the provider lists for the zone being
    /// polled. Lookups that are already pinned ignore them.
    async fn use_zone_nameservers(&self, _nameservers: &[String]) -> ChallengeResult<()> {
        Ok(())
    }

    async fn lookup_txt(&self, fqdn: &str) -> Result<Vec<String>, LookupError>;
}

#[async_trait]
impl<T: TxtLookup + ?Sized> TxtLookup for Arc<T> {
    async fn use_zone_nameservers(&self, nameservers: &[String]) -> ChallengeResult<()> {
        (**self).use_zone_nameservers(nameservers).await
    }

    async fn lookup_txt(&self, fqdn: &str) -> Result<Vec<String>, LookupError> {
        (**self).lookup_txt(fqdn).await
    }
}

#[derive(Debug)]
struct Target {
    nameserver: SocketAddr,
    resolver: TokioResolver,
}

/// hickory resolver aimed at a single nameserver with caching
/// disabled.
///
/// A lookup built with [`connect`](Self::connect) or
/// [`with_addr`](Self::with_addr) stays on that nameserver. One
/// built with [`follow_zone`](Self::follow_zone) picks the first
/// reachable nameserver the provider reports for the zone.
#[derive(Debug)]
pub struct NameserverLookup {
    timeout: Duration,
    pinned: bool,
    target: RwLock<Option<Arc<Target>>>,
}

impl NameserverLookup {
    /// Resolve `nameserver` (`host` or `host:port`) once and pin
    /// the lookup to it.
    pub async fn connect(nameserver: &str, timeout: Duration) -> ChallengeResult<Self> {
        let addr = resolve_nameserver(nameserver).await?;
        Ok(Self::with_addr(addr, timeout))
    }

    #[must_use]
    pub fn with_addr(nameserver: SocketAddr, timeout: Duration) -> Self {
        Self {
            timeout,
            pinned: true,
            target: RwLock::new(Some(Arc::new(Target {
                nameserver,
                resolver: build_resolver(nameserver, timeout),
            }))),
        }
    }

    /// No nameserver yet; one is chosen from the zone before
    /// polling. Does no network I/O.
    #[must_use]
    pub const fn follow_zone(timeout: Duration) -> Self {
        Self {
            timeout,
            pinned: false,
            target: RwLock::new(None),
        }
    }

    /// The nameserver queried, once one is chosen.
    #[must_use]
    pub fn nameserver(&self) -> Option<SocketAddr> {
        self.current().map(|t| t.nameserver)
    }

    #[must_use]
    pub const fn is_pinned(&self) -> bool {
        self.pinned
    }

    fn current(&self) -> Option<Arc<Target>> {
        self.target
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl TxtLookup for NameserverLookup {
    async fn use_zone_nameservers(&self, nameservers: &[String]) -> ChallengeResult<()> {
        if self.pinned {
            return Ok(());
        }
        let mut last_error = None;
        for host in nameservers {
            match resolve_nameserver(host).await {
                Ok(addr) => {
                    info!(nameserver = %host, %addr, "polling zone nameserver");
                    let target = Target {
                        nameserver: addr,
                        resolver: build_resolver(addr, self.timeout),
                    };
                    *self.target.write().unwrap_or_else(PoisonError::into_inner) =
                        Some(Arc::new(target));
                    return Ok(());
                }
                Err(e) => {
                    warn!(nameserver = %host, error = %e, "cannot resolve zone nameserver");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            ChallengeError::Config(
                "provider reports no nameserver for the zone, set --nameserver".into(),
            )
        }))
    }

    async fn lookup_txt(&self, fqdn: &str) -> Result<Vec<String>, LookupError> {
        let Some(target) = self.current() else {
            return Err(LookupError::Other("no nameserver selected".into()));
        };
        let name = absolute_name(fqdn);
        match target.resolver.txt_lookup(name.as_str()).await {
            Ok(lookup) => Ok(lookup
                .iter()
                .map(|txt| {
                    txt.txt_data()
                        .iter()
                        .map(|data| String::from_utf8_lossy(data))
                        .collect()
                })
                .collect()),
            Err(e) => Err(classify(&e.to_string())),
        }
    }
}

fn build_resolver(nameserver: SocketAddr, timeout: Duration) -> TokioResolver {
    let mut config = ResolverConfig::new();
    config.add_name_server(NameServerConfig::new(nameserver, Protocol::Udp));
    config.add_name_server(NameServerConfig::new(nameserver, Protocol::Tcp));

    let mut opts = ResolverOpts::default();
    opts.timeout = timeout;
    opts.attempts = 1;
    opts.cache_size = 0;

    Resolver::builder_with_config(config, TokioConnectionProvider::default())
        .with_options(opts)
        .build()
}

/// `host:port` for a nameserver, adding the DNS port when missing.
#[must_use]
pub fn nameserver_address(nameserver: &str) -> String {
    let nameserver = nameserver.trim().trim_end_matches('.');
    if nameserver.parse::<SocketAddr>().is_ok() {
        return nameserver.to_string();
    }
    if let Ok(ip) = nameserver.parse::<IpAddr>() {
        return SocketAddr::new(ip, DNS_PORT).to_string();
    }
    if nameserver.contains(':') {
        nameserver.to_string()
    } else {
        format!("{nameserver}:{DNS_PORT}")
    }
}

async fn resolve_nameserver(nameserver: &str) -> ChallengeResult<SocketAddr> {
    let address = nameserver_address(nameserver);
    tokio::net::lookup_host(address.as_str())
        .await?
        .next()
        .ok_or_else(|| ChallengeError::Config(format!("nameserver {nameserver} has no address")))
}

fn absolute_name(fqdn: &str) -> String {
    if fqdn.ends_with('.') {
        fqdn.to_string()
    } else {
        format!("{fqdn}.")
    }
}

/// Sort a resolver error message into "not there yet" versus
/// everything else.
#[must_use]
pub fn classify(message: &str) -> LookupError {
    let lower = message.to_lowercase();
    if lower.contains("no records found")
        || lower.contains("nxdomain")
        || lower.contains("record not found")
        || lower.contains("no such host")
    {
        LookupError::NotFound(message.to_string())
    } else {
        LookupError::Other(message.to_string())
    }
}
