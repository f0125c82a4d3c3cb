use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::cmd;
use crate::dns::{ConflictMatcher, DnsRecord, RecordApi, RecordSet, ZoneCatalog};
use crate::error::{ChallengeError, ChallengeResult};

const CF_API: &str = "https://api.cloudflare.com/client/v4";

/// TTL value Cloudflare reads as "automatic".
pub const AUTOMATIC_TTL: u32 = 1;

/// [`AUTOMATIC_TTL`] as a TTL hint.
pub const AUTOMATIC_TTL_HINT: &str = "1";

/// Largest page `GET /zones` accepts.
const ZONES_PER_PAGE: u32 = 50;

const RECORDS_PER_PAGE: u32 = 100;

/// Error prefixes Cloudflare returns for a duplicate record or an
/// exhausted record quota.
pub const CLOUDFLARE_CONFLICTS: [&str; 2] =
    ["An identical record already exists", "Record quota exceeded"];

/// Cloudflare record API driven through curl.
///
/// Requires `CF_API_TOKEN` environment variable set with a token
/// that has `Zone > Zone > Read` and `Zone > DNS > Edit`
/// permissions.
pub struct Cloudflare {
    token: String,
}

impl Cloudflare {
    #[must_use]
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
        }
    }

    /// Build a client from `CF_API_TOKEN`, checking that curl is
    /// available.
    pub async fn from_env() -> ChallengeResult<Self> {
        let token = std::env::var("CF_API_TOKEN").map_err(|_| {
            ChallengeError::EnvMissing(
                "CF_API_TOKEN not set. Create a token at: \
                 https://dash.cloudflare.com/profile/api-tokens"
                    .into(),
            )
        })?;
        if !cmd::command_exists("curl").await {
            return Err(ChallengeError::CommandNotFound("curl".into()));
        }
        Ok(Self::new(&token))
    }

    async fn api_request(
        &self,
        method: &str,
        path: &str,
        body: Option<&str>,
    ) -> ChallengeResult<String> {
        let url = format!("{CF_API}{path}");
        let mut args = vec![
            "-s".to_string(),
            "-X".to_string(),
            method.to_string(),
            "-H".to_string(),
            format!("Authorization: Bearer {}", self.token),
            "-H".to_string(),
            "Content-Type: application/json".to_string(),
        ];
        if let Some(b) = body {
            args.push("-d".to_string());
            args.push(b.to_string());
        }
        args.push(url);

        let args_ref: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run("curl", &args_ref).await
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
    result_info: Option<ResultInfo>,
}

#[derive(Deserialize)]
struct ResultInfo {
    #[serde(default)]
    total_pages: u32,
}

#[derive(Deserialize)]
struct ApiMessage {
    message: String,
}

#[derive(Deserialize)]
struct Zone {
    id: String,
    name: String,
    #[serde(default)]
    name_servers: Vec<String>,
}

#[derive(Deserialize)]
struct Record {
    id: String,
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    content: String,
}

/// Unwrap a Cloudflare response envelope. A failed envelope
/// becomes a provider error carrying the first API message
/// verbatim.
pub fn decode<T: DeserializeOwned>(body: &str) -> ChallengeResult<T> {
    decode_page(body).map(|(result, _)| result)
}

/// Like [`decode`], also returning the page count from
/// `result_info` (1 when absent).
fn decode_page<T: DeserializeOwned>(body: &str) -> ChallengeResult<(T, u32)> {
    let envelope: Envelope<T> = serde_json::from_str(body)?;
    if !envelope.success {
        let message = envelope
            .errors
            .into_iter()
            .next()
            .map_or_else(|| "Cloudflare API request failed".to_string(), |e| e.message);
        return Err(ChallengeError::Provider(message));
    }
    let pages = envelope
        .result_info
        .map_or(1, |info| info.total_pages.max(1));
    let result = envelope
        .result
        .ok_or_else(|| ChallengeError::Provider("Cloudflare API returned no result".into()))?;
    Ok((result, pages))
}

/// Add the zones of one `GET /zones` page to `catalog`. Returns
/// the total page count.
pub fn parse_zones(body: &str, catalog: &mut ZoneCatalog) -> ChallengeResult<u32> {
    let (zones, pages): (Vec<Zone>, u32) = decode_page(body)?;
    for zone in zones {
        catalog.insert_with_nameservers(&zone.name, &zone.id, zone.name_servers);
    }
    Ok(pages)
}

/// Add the records of one `GET /zones/{id}/dns_records` page to
/// `records`. Returns the total page count.
pub fn parse_records(body: &str, records: &mut RecordSet) -> ChallengeResult<u32> {
    let (page, pages): (Vec<Record>, u32) = decode_page(body)?;
    records.extend(page.into_iter().map(|r| {
        (
            r.id,
            DnsRecord {
                name: r.name,
                record_type: r.record_type,
                value: r.content,
            },
        )
    }));
    Ok(pages)
}

/// Numeric TTL hints are passed through; anything else selects
/// the automatic TTL.
#[must_use]
pub fn ttl_value(hint: &str) -> u32 {
    hint.trim().parse().unwrap_or(AUTOMATIC_TTL)
}

#[async_trait]
impl RecordApi for Cloudflare {
    async fn list_zones(&self) -> ChallengeResult<ZoneCatalog> {
        let mut catalog = ZoneCatalog::new();
        let mut page = 1;
        loop {
            let path = format!("/zones?per_page={ZONES_PER_PAGE}&page={page}");
            let response = self.api_request("GET", &path, None).await?;
            let pages = parse_zones(&response, &mut catalog)?;
            if page >= pages {
                return Ok(catalog);
            }
            page += 1;
        }
    }

    async fn list_records(&self, zone_id: &str) -> ChallengeResult<RecordSet> {
        let mut records = RecordSet::new();
        let mut page = 1;
        loop {
            let path =
                format!("/zones/{zone_id}/dns_records?per_page={RECORDS_PER_PAGE}&page={page}");
            let response = self.api_request("GET", &path, None).await?;
            let pages = parse_records(&response, &mut records)?;
            if page >= pages {
                return Ok(records);
            }
            page += 1;
        }
    }

    async fn create_record(
        &self,
        zone_id: &str,
        name: &str,
        record_type: &str,
        value: &str,
        ttl: &str,
    ) -> ChallengeResult<()> {
        let body = serde_json::json!({
            "type": record_type,
            "name": name,
            "content": value,
            "ttl": ttl_value(ttl),
        })
        .to_string();
        let path = format!("/zones/{zone_id}/dns_records");
        let response = self.api_request("POST", &path, Some(&body)).await?;
        decode::<serde_json::Value>(&response).map(|_| ())
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> ChallengeResult<()> {
        let path = format!("/zones/{zone_id}/dns_records/{record_id}");
        let response = self.api_request("DELETE", &path, None).await?;
        decode::<serde_json::Value>(&response).map(|_| ())
    }

    fn default_ttl(&self) -> &str {
        AUTOMATIC_TTL_HINT
    }

    fn conflict_matcher(&self) -> ConflictMatcher {
        ConflictMatcher::new(CLOUDFLARE_CONFLICTS)
    }
}
