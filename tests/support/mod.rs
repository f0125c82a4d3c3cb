#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use dns01_hook::{
    ChallengeError, ChallengeResult, DnsRecord, LookupError, PollPolicy, RecordApi, RecordSet,
    TxtLookup, ZoneCatalog,
};

pub const ZONE_ID: &str = "123456";
pub const CHALLENGE_DOMAIN: &str = "s.example.com";
pub const CHALLENGE_VALUE: &str = "abc123";
pub const DUPLICATE: &str = " You already have another already existent record";

/// Fast timings so tests never wait on real propagation delays.
pub fn fast_policy() -> PollPolicy {
    PollPolicy {
        max_attempts: 30,
        lookup_timeout: Duration::from_millis(200),
        retry_delay: Duration::from_millis(1),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListZones,
    ListRecords(String),
    Create {
        zone_id: String,
        name: String,
        record_type: String,
        value: String,
        ttl: String,
    },
    Delete {
        zone_id: String,
        record_id: String,
    },
}

#[derive(Default)]
struct State {
    /// record id -> (zone id, record)
    records: BTreeMap<String, (String, DnsRecord)>,
    next_id: u32,
    create_failures: VecDeque<String>,
    delete_failures: HashMap<String, String>,
    calls: Vec<Call>,
}

/// In-memory provider account.
#[derive(Default)]
pub struct MockApi {
    zones: ZoneCatalog,
    stall_list_zones: bool,
    state: Mutex<State>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zone(mut self, name: &str, id: &str) -> Self {
        self.zones.insert(name, id);
        self
    }

    pub fn with_zone_nameservers(mut self, name: &str, id: &str, nameservers: &[&str]) -> Self {
        self.zones.insert_with_nameservers(
            name,
            id,
            nameservers.iter().map(|ns| (*ns).to_string()).collect(),
        );
        self
    }

    pub fn with_record(self, zone_id: &str, record_id: &str, fqdn: &str) -> Self {
        self.state.lock().unwrap().records.insert(
            record_id.to_string(),
            (
                zone_id.to_string(),
                DnsRecord {
                    name: fqdn.to_string(),
                    record_type: "TXT".into(),
                    value: "\"stale\"".into(),
                },
            ),
        );
        self
    }

    /// The next `create_record` call fails with `message`.
    pub fn fail_next_create(self, message: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .create_failures
            .push_back(message.to_string());
        self
    }

    /// Deleting `record_id` fails with `message`.
    pub fn fail_delete(self, record_id: &str, message: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .delete_failures
            .insert(record_id.to_string(), message.to_string());
        self
    }

    /// `list_zones` never completes.
    pub fn stall_list_zones(mut self) -> Self {
        self.stall_list_zones = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn create_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Create { .. }))
            .count()
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete { record_id, .. } => Some(record_id),
                _ => None,
            })
            .collect()
    }

    /// Names of the records currently stored.
    pub fn record_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .records
            .values()
            .map(|(_, r)| r.name.clone())
            .collect()
    }

    fn zone_name(&self, zone_id: &str) -> Option<String> {
        self.zones
            .names()
            .find(|n| self.zones.zone_id(n) == Some(zone_id))
            .map(String::from)
    }
}

#[async_trait]
impl RecordApi for MockApi {
    async fn list_zones(&self) -> ChallengeResult<ZoneCatalog> {
        self.state.lock().unwrap().calls.push(Call::ListZones);
        if self.stall_list_zones {
            std::future::pending::<()>().await;
        }
        Ok(self.zones.clone())
    }

    async fn list_records(&self, zone_id: &str) -> ChallengeResult<RecordSet> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListRecords(zone_id.to_string()));
        Ok(state
            .records
            .iter()
            .filter(|(_, (zone, _))| zone == zone_id)
            .map(|(id, (_, record))| (id.clone(), record.clone()))
            .collect())
    }

    async fn create_record(
        &self,
        zone_id: &str,
        name: &str,
        record_type: &str,
        value: &str,
        ttl: &str,
    ) -> ChallengeResult<()> {
        let zone_name = self.zone_name(zone_id);
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create {
            zone_id: zone_id.to_string(),
            name: name.to_string(),
            record_type: record_type.to_string(),
            value: value.to_string(),
            ttl: ttl.to_string(),
        });
        if let Some(message) = state.create_failures.pop_front() {
            return Err(ChallengeError::Provider(message));
        }
        let zone_name = zone_name.ok_or_else(|| ChallengeError::Provider("no such zone".into()))?;
        state.next_id += 1;
        let id = format!("rec-{}", state.next_id);
        state.records.insert(
            id,
            (
                zone_id.to_string(),
                DnsRecord {
                    name: format!("{name}.{zone_name}"),
                    record_type: record_type.to_string(),
                    value: value.to_string(),
                },
            ),
        );
        Ok(())
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> ChallengeResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Delete {
            zone_id: zone_id.to_string(),
            record_id: record_id.to_string(),
        });
        if let Some(message) = state.delete_failures.get(record_id) {
            return Err(ChallengeError::Provider(message.clone()));
        }
        state.records.remove(record_id);
        Ok(())
    }
}

/// TXT lookup answering from a script, then repeating a fallback.
pub struct ScriptedLookup {
    script: Mutex<VecDeque<Result<Vec<String>, LookupError>>>,
    fallback: Result<Vec<String>, LookupError>,
    queried: Mutex<Vec<String>>,
    calls: AtomicUsize,
    cancel_on_call: Option<(usize, CancellationToken)>,
    stall: bool,
    offered: Mutex<Vec<Vec<String>>>,
    refuse_nameservers: bool,
}

impl ScriptedLookup {
    /// Answers `Ok(values)` forever.
    pub fn answering(values: &[&str]) -> Self {
        Self::with_fallback(Ok(values.iter().map(|v| (*v).to_string()).collect()))
    }

    /// Reports the name as missing forever.
    pub fn absent() -> Self {
        Self::with_fallback(Err(LookupError::NotFound("no such host".into())))
    }

    /// Never answers.
    pub fn stalled() -> Self {
        let mut lookup = Self::absent();
        lookup.stall = true;
        lookup
    }

    pub fn with_fallback(fallback: Result<Vec<String>, LookupError>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            queried: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            cancel_on_call: None,
            stall: false,
            offered: Mutex::new(Vec::new()),
            refuse_nameservers: false,
        }
    }

    /// Answer these first, in order.
    pub fn then(self, answer: Result<Vec<String>, LookupError>) -> Self {
        self.script.lock().unwrap().push_back(answer);
        self
    }

    /// Cancel `token` while serving the `call`-th lookup (1-based).
    pub fn cancel_on_call(mut self, call: usize, token: CancellationToken) -> Self {
        self.cancel_on_call = Some((call, token));
        self
    }

    /// Fail when handed zone nameservers, as if none resolved.
    pub fn refuse_nameservers(mut self) -> Self {
        self.refuse_nameservers = true;
        self
    }

    /// Nameserver lists handed over by the lifecycle, in order.
    pub fn offered_nameservers(&self) -> Vec<Vec<String>> {
        self.offered.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queried(&self) -> Vec<String> {
        self.queried.lock().unwrap().clone()
    }
}

#[async_trait]
impl TxtLookup for ScriptedLookup {
    async fn use_zone_nameservers(&self, nameservers: &[String]) -> ChallengeResult<()> {
        self.offered.lock().unwrap().push(nameservers.to_vec());
        if self.refuse_nameservers {
            return Err(ChallengeError::Config("no zone nameserver resolves".into()));
        }
        Ok(())
    }

    async fn lookup_txt(&self, fqdn: &str) -> Result<Vec<String>, LookupError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.queried.lock().unwrap().push(fqdn.to_string());
        if let Some((at, token)) = &self.cancel_on_call {
            if call == *at {
                token.cancel();
            }
        }
        if self.stall {
            std::future::pending::<()>().await;
        }
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| self.fallback.clone())
    }
}

pub fn not_found() -> Result<Vec<String>, LookupError> {
    Err(LookupError::NotFound("no such host".into()))
}

pub fn transient(message: &str) -> Result<Vec<String>, LookupError> {
    Err(LookupError::Other(message.to_string()))
}

pub fn answer(values: &[&str]) -> Result<Vec<String>, LookupError> {
    Ok(values.iter().map(|v| (*v).to_string()).collect())
}
