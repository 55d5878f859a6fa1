//! Upstream campaign/lead endpoints.
//!
//! Each endpoint is decoded independently. A section that cannot be fetched
//! or decoded is replaced by the matching section of the fallback fixture;
//! the other sections are kept.

use crate::errors::SourceError;
use crate::models::{PartialTotals, RawCampaignRecord, RawDailyPoint, RawOriginCount, Section, SourceData};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

pub const CAMPAIGNS_PATH: &str = "/api/campaigns";
pub const ORIGINS_PATH: &str = "/api/leads/by-origin";
pub const DAILY_PATH: &str = "/api/leads/daily";

/// Envelope keys that sit next to the payload when there is no `data` wrapper.
const ENVELOPE_KEYS: [&str; 3] = ["success", "error", "message"];

#[derive(Debug, Clone, Default)]
pub struct CampaignPayload {
    pub campaigns: Vec<RawCampaignRecord>,
    pub totals: Option<PartialTotals>,
}

/// Outcome of fetching every endpoint once.
#[derive(Debug)]
pub struct FetchResults {
    pub campaigns: Result<CampaignPayload, SourceError>,
    pub origins: Result<Vec<RawOriginCount>, SourceError>,
    pub daily: Result<Vec<RawDailyPoint>, SourceError>,
}

impl FetchResults {
    #[cfg(test)]
    pub fn from_payloads(campaigns: &Value, origins: &Value, daily: &Value) -> Self {
        Self {
            campaigns: decode_campaigns(campaigns),
            origins: decode_origins(origins),
            daily: decode_daily(daily),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.campaigns.is_ok() && self.origins.is_ok() && self.daily.is_ok()
    }

    /// Takes every failed section from `fixture` and records it in
    /// `fallback_sections`.
    pub fn into_source_data(self, fixture: SourceData) -> SourceData {
        let mut data = SourceData::default();

        match self.campaigns {
            Ok(payload) => {
                data.campaigns = payload.campaigns;
                data.totals = payload.totals;
            }
            Err(err) => {
                log_fallback(Section::Campaigns, &err);
                data.campaigns = fixture.campaigns;
                data.totals = fixture.totals;
                data.fallback_sections.push(Section::Campaigns);
            }
        }

        match self.origins {
            Ok(origins) => data.origins = origins,
            Err(err) => {
                log_fallback(Section::Origins, &err);
                data.origins = fixture.origins;
                data.fallback_sections.push(Section::Origins);
            }
        }

        match self.daily {
            Ok(daily) => data.daily = daily,
            Err(err) => {
                log_fallback(Section::Daily, &err);
                data.daily = fixture.daily;
                data.fallback_sections.push(Section::Daily);
            }
        }

        data
    }
}

fn log_fallback(section: Section, err: &SourceError) {
    warn!(section = section.as_str(), "using fallback data: {err}");
}

pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    period_days: u32,
}

impl UpstreamClient {
    pub fn new(client: reqwest::Client, base_url: &str, timeout: Duration, period_days: u32) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            period_days,
        }
    }

    /// Fetches all endpoints concurrently. A slow or failing endpoint does not
    /// affect the others.
    pub async fn fetch_all(&self) -> FetchResults {
        let (campaigns, origins, daily) = tokio::join!(
            self.fetch_json(CAMPAIGNS_PATH),
            self.fetch_json(ORIGINS_PATH),
            self.fetch_json(DAILY_PATH),
        );

        FetchResults {
            campaigns: campaigns.and_then(|payload| decode_campaigns(&payload)),
            origins: origins.and_then(|payload| decode_origins(&payload)),
            daily: daily.and_then(|payload| decode_daily(&payload)),
        }
    }

    async fn fetch_json(&self, path: &str) -> Result<Value, SourceError> {
        let url = format!("{}{}?days={}", self.base_url, path, self.period_days);
        debug!("fetching {url}");

        let request = async {
            let response = self.client.get(&url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(SourceError::unavailable(format!("{url} returned {status}")));
            }
            let body = response.bytes().await?;
            let payload = serde_json::from_slice::<Value>(&body)
                .map_err(|err| SourceError::malformed(format!("{url}: {err}")))?;
            Ok::<Value, SourceError>(payload)
        };

        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::unavailable(format!(
                "{url} timed out after {}s",
                self.timeout.as_secs_f64()
            ))),
        }
    }
}

/// Strips the optional `{success, data}` envelope.
fn unwrap_envelope(payload: &Value) -> Result<&Value, SourceError> {
    let Value::Object(map) = payload else {
        return Err(SourceError::malformed("expected a JSON object"));
    };
    if map.is_empty() {
        return Err(SourceError::malformed("payload has no fields"));
    }
    if map.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(SourceError::malformed("upstream reported success: false"));
    }
    Ok(map.get("data").unwrap_or(payload))
}

pub fn decode_campaigns(payload: &Value) -> Result<CampaignPayload, SourceError> {
    match unwrap_envelope(payload)? {
        Value::Array(items) => Ok(CampaignPayload {
            campaigns: decode_objects(items, "campaign"),
            totals: None,
        }),
        Value::Object(map) => {
            let Some(Value::Array(items)) = map.get("campaigns") else {
                return Err(SourceError::malformed("'campaigns' is missing or not an array"));
            };
            let totals = match map.get("totals") {
                None | Some(Value::Null) => None,
                Some(totals @ Value::Object(_)) => Some(
                    serde_json::from_value::<PartialTotals>(totals.clone())
                        .map_err(|err| SourceError::malformed(format!("totals: {err}")))?,
                ),
                Some(_) => return Err(SourceError::malformed("'totals' is not an object")),
            };
            Ok(CampaignPayload {
                campaigns: decode_objects(items, "campaign"),
                totals,
            })
        }
        _ => Err(SourceError::malformed("campaign payload is neither an object nor an array")),
    }
}

pub fn decode_origins(payload: &Value) -> Result<Vec<RawOriginCount>, SourceError> {
    match unwrap_envelope(payload)? {
        Value::Array(items) => Ok(decode_objects(items, "origin")),
        Value::Object(map) => Ok(origins_from_map(map)),
        _ => Err(SourceError::malformed("origin payload is neither an object nor an array")),
    }
}

/// `{"facebook": {"count": 3, "percentage": 18.75}, "google": 11}`
fn origins_from_map(map: &Map<String, Value>) -> Vec<RawOriginCount> {
    payload_entries(map)
        .map(|(label, value)| {
            let count = match value {
                Value::Object(fields) => fields.get("count").or_else(|| fields.get("leads")),
                other => Some(other),
            };
            RawOriginCount {
                origin: Some(label.as_str().into()),
                count: count.and_then(|count| serde_json::from_value(count.clone()).ok()),
            }
        })
        .collect()
}

pub fn decode_daily(payload: &Value) -> Result<Vec<RawDailyPoint>, SourceError> {
    match unwrap_envelope(payload)? {
        Value::Array(items) => Ok(decode_objects(items, "daily point")),
        Value::Object(per_platform) => {
            let mut points = Vec::new();
            for (platform, series) in payload_entries(per_platform) {
                let Value::Array(items) = series else {
                    return Err(SourceError::malformed(format!("daily series '{platform}' is not an array")));
                };
                points.extend(decode_objects::<RawDailyPoint>(items, "daily point").into_iter().map(|mut point| {
                    point.platform.get_or_insert_with(|| platform.as_str().into());
                    point
                }));
            }
            Ok(points)
        }
        _ => Err(SourceError::malformed("daily payload is neither an object nor an array")),
    }
}

fn payload_entries(map: &Map<String, Value>) -> impl Iterator<Item = (&String, &Value)> {
    map.iter().filter(|(key, _)| !ENVELOPE_KEYS.contains(&key.as_str()))
}

/// Decodes each object element; anything else is skipped.
fn decode_objects<T: DeserializeOwned>(items: &[Value], kind: &str) -> Vec<T> {
    items
        .iter()
        .filter(|item| item.is_object())
        .filter_map(|item| match serde_json::from_value::<T>(item.clone()) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!("skipping unreadable {kind}: {err}");
                None
            }
        })
        .collect()
}
