use crate::coerce::RawField;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One campaign as reported by an ad platform. Every field is optional on the
/// wire; the aggregator decides what a missing value means.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct RawCampaignRecord {
    pub name: Option<RawField>,
    pub platform: Option<RawField>,
    pub cost: Option<RawField>,
    pub cost_micros: Option<RawField>,
    pub clicks: Option<RawField>,
    pub impressions: Option<RawField>,
    pub conversions: Option<RawField>,
    pub actions: Option<Value>,
    pub ctr: Option<RawField>,
    pub avg_cpc: Option<RawField>,
    /// Google's `averageCpc`, in millionths.
    pub avg_cpc_micros: Option<RawField>,
    pub status: Option<RawField>,
}

impl From<Map<String, Value>> for RawCampaignRecord {
    fn from(map: Map<String, Value>) -> Self {
        let fields = Fields(map);
        Self {
            name: fields.raw(&["name"]),
            platform: fields.raw(&["platform"]),
            cost: fields.raw(&["cost", "spend", "investment"]),
            cost_micros: fields.raw(&["cost_micros", "costMicros"]),
            clicks: fields.raw(&["clicks"]),
            impressions: fields.raw(&["impressions"]),
            conversions: fields.raw(&["conversions"]),
            actions: fields.value(&["actions"]).cloned(),
            ctr: fields.raw(&["ctr"]),
            avg_cpc: fields.raw(&["avg_cpc", "cpc"]),
            avg_cpc_micros: fields.raw(&["avg_cpc_micros", "averageCpc"]),
            status: fields.raw(&["status"]),
        }
    }
}

/// Pre-aggregated summary some upstreams send next to the campaign list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct PartialTotals {
    pub investment: Option<RawField>,
    pub clicks: Option<RawField>,
    pub impressions: Option<RawField>,
    pub conversions: Option<RawField>,
    pub leads: Option<RawField>,
    pub ctr: Option<RawField>,
    pub avg_cpc: Option<RawField>,
}

impl From<Map<String, Value>> for PartialTotals {
    fn from(map: Map<String, Value>) -> Self {
        let fields = Fields(map);
        Self {
            investment: fields.raw(&["investment", "cost", "spend", "total_spend"]),
            clicks: fields.raw(&["clicks"]),
            impressions: fields.raw(&["impressions"]),
            conversions: fields.raw(&["conversions"]),
            leads: fields.raw(&["leads", "total_leads"]),
            ctr: fields.raw(&["ctr"]),
            avg_cpc: fields.raw(&["avg_cpc", "cpc"]),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct RawOriginCount {
    pub origin: Option<RawField>,
    pub count: Option<RawField>,
}

impl From<Map<String, Value>> for RawOriginCount {
    fn from(map: Map<String, Value>) -> Self {
        let fields = Fields(map);
        Self {
            origin: fields.raw(&["origin", "label", "source"]),
            count: fields.raw(&["count", "leads"]),
        }
    }
}

/// One day of activity, optionally for a single platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct RawDailyPoint {
    pub date: Option<RawField>,
    pub platform: Option<RawField>,
    pub leads: Option<RawField>,
    pub clicks: Option<RawField>,
    pub investment: Option<RawField>,
}

impl From<Map<String, Value>> for RawDailyPoint {
    fn from(map: Map<String, Value>) -> Self {
        let fields = Fields(map);
        Self {
            date: fields.raw(&["date", "day"]),
            platform: fields.raw(&["platform"]),
            leads: fields.raw(&["leads", "conversions", "count"]),
            clicks: fields.raw(&["clicks"]),
            investment: fields.raw(&["investment", "spend", "cost"]),
        }
    }
}

/// Upstream object whose keys are looked up by priority: the first listed
/// key holding a non-null value wins, so a record may carry a field and its
/// aliases side by side.
struct Fields(Map<String, Value>);

impl Fields {
    fn value(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .find_map(|key| self.0.get(*key).filter(|value| !value.is_null()))
    }

    fn raw(&self, keys: &[&str]) -> Option<RawField> {
        self.value(keys).cloned().map(RawField::from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Campaigns,
    Origins,
    Daily,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Campaigns, Section::Origins, Section::Daily];

    pub fn as_str(self) -> &'static str {
        match self {
            Section::Campaigns => "campaigns",
            Section::Origins => "origins",
            Section::Daily => "daily",
        }
    }
}

/// Everything the aggregator consumes for one refresh.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceData {
    #[serde(default)]
    pub campaigns: Vec<RawCampaignRecord>,
    #[serde(default)]
    pub totals: Option<PartialTotals>,
    #[serde(default)]
    pub origins: Vec<RawOriginCount>,
    #[serde(default)]
    pub daily: Vec<RawDailyPoint>,
    #[serde(default)]
    pub fallback_sections: Vec<Section>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Platform {
    Google,
    Meta,
    Other,
}

impl Platform {
    pub fn classify(label: Option<&str>) -> Self {
        let Some(label) = label else {
            return Platform::Other;
        };
        let label = label.to_ascii_lowercase();
        if label.contains("google") {
            Platform::Google
        } else if label.contains("meta") || label.contains("facebook") || label.contains("instagram") {
            Platform::Meta
        } else {
            Platform::Other
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Platform::Google => "Google Ads",
            Platform::Meta => "Meta Ads",
            Platform::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Active,
    Paused,
    Ended,
    Unknown,
}

impl CampaignStatus {
    pub fn classify(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return CampaignStatus::Unknown;
        };
        match raw.trim().to_ascii_uppercase().as_str() {
            "ENABLED" | "ACTIVE" => CampaignStatus::Active,
            "PAUSED" | "DISABLED" | "INACTIVE" => CampaignStatus::Paused,
            "REMOVED" | "ARCHIVED" | "DELETED" => CampaignStatus::Ended,
            _ => CampaignStatus::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CampaignStatus::Active => "Active",
            CampaignStatus::Paused => "Paused",
            CampaignStatus::Ended => "Ended",
            CampaignStatus::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Live,
    Partial,
    Fallback,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateTotals {
    pub total_investment: f64,
    pub total_clicks: u64,
    pub total_impressions: u64,
    pub total_conversions: f64,
    pub total_leads: u64,
    pub average_ctr: f64,
    pub average_cpc: f64,
    pub cost_per_lead: f64,
    pub conversion_rate: f64,
    pub active_campaigns: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformSlice {
    pub platform: Platform,
    pub label: &'static str,
    pub campaigns: usize,
    pub investment: f64,
    pub clicks: u64,
    pub impressions: u64,
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OriginSlice {
    pub origin: String,
    pub leads: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPoint {
    pub date: String,
    pub lead_count: u64,
    pub click_count: u64,
    pub investment: f64,
    /// One entry per platform seen in the window, in first-seen order, so
    /// every day lists the same platforms.
    pub platforms: Vec<DailyPlatformPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPlatformPoint {
    pub platform: Platform,
    pub label: &'static str,
    pub lead_count: u64,
    pub click_count: u64,
    pub investment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignRow {
    pub name: String,
    pub platform: Platform,
    pub status: CampaignStatus,
    pub investment: f64,
    pub clicks: u64,
    pub impressions: u64,
    pub conversions: f64,
    pub ctr: f64,
    pub cpc: f64,
    pub conversion_rate: f64,
    pub cost_per_conversion: f64,
}

/// Presentation-ready snapshot of one refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    pub reference_date: String,
    pub data_source: DataSource,
    pub fallback_sections: Vec<Section>,
    pub totals: AggregateTotals,
    pub platforms: Vec<PlatformSlice>,
    pub origins: Vec<OriginSlice>,
    pub daily: Vec<DailyPoint>,
    pub campaigns: Vec<CampaignRow>,
}

impl ViewModel {
    pub fn is_degraded(&self) -> bool {
        self.data_source != DataSource::Live
    }
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub status: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_has_a_default() {
        assert_eq!(CampaignStatus::classify(Some("ENABLED")), CampaignStatus::Active);
        assert_eq!(CampaignStatus::classify(Some("active")), CampaignStatus::Active);
        assert_eq!(CampaignStatus::classify(Some("PAUSED")), CampaignStatus::Paused);
        assert_eq!(CampaignStatus::classify(Some("REMOVED")), CampaignStatus::Ended);
        assert_eq!(CampaignStatus::classify(Some("LEARNING_LIMITED")), CampaignStatus::Unknown);
        assert_eq!(CampaignStatus::classify(None), CampaignStatus::Unknown);
    }

    #[test]
    fn platform_labels_from_upstream() {
        assert_eq!(Platform::classify(Some("Google Ads")), Platform::Google);
        assert_eq!(Platform::classify(Some("facebook")), Platform::Meta);
        assert_eq!(Platform::classify(Some("Meta Ads")), Platform::Meta);
        assert_eq!(Platform::classify(Some("tiktok")), Platform::Other);
        assert_eq!(Platform::classify(None), Platform::Other);
    }

    #[test]
    fn campaign_record_accepts_platform_aliases() {
        let record: RawCampaignRecord = serde_json::from_value(serde_json::json!({
            "name": "Search",
            "spend": "12.50",
            "costMicros": 12500000,
            "averageCpc": 500000,
            "status": null
        }))
        .unwrap();

        assert_eq!(record.cost, Some(RawField::Text("12.50".into())));
        assert_eq!(record.cost_micros, Some(RawField::Number(12_500_000.0)));
        assert_eq!(record.avg_cpc_micros, Some(RawField::Number(500_000.0)));
        assert!(record.avg_cpc.is_none());
        assert!(record.status.is_none());
    }

    #[test]
    fn canonical_key_and_alias_together_keep_the_record() {
        let records: Vec<RawCampaignRecord> = serde_json::from_value(serde_json::json!([
            {"name": "A", "cost": 10, "spend": 99},
            {"name": "B", "avg_cpc": 1.2, "cpc": 7, "cost": 5},
            {"name": "C", "cost": null, "spend": "3.5"}
        ]))
        .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].cost, Some(RawField::Number(10.0)));
        assert_eq!(records[1].avg_cpc, Some(RawField::Number(1.2)));
        assert_eq!(records[2].cost, Some(RawField::Text("3.5".into())));

        let totals: PartialTotals =
            serde_json::from_value(serde_json::json!({"leads": 16, "total_leads": 4, "cost": 1, "spend": 2})).unwrap();
        assert_eq!(totals.leads, Some(RawField::Number(16.0)));
        assert_eq!(totals.investment, Some(RawField::Number(1.0)));
    }

    #[test]
    fn daily_point_reads_spend_and_platform() {
        let point: RawDailyPoint = serde_json::from_value(serde_json::json!({
            "day": "2026-01-05",
            "platform": "google",
            "conversions": 2,
            "count": 9,
            "spend": "12.40"
        }))
        .unwrap();

        assert_eq!(point.date, Some(RawField::Text("2026-01-05".into())));
        assert_eq!(point.leads, Some(RawField::Number(2.0)));
        assert_eq!(point.investment, Some(RawField::Text("12.40".into())));
        assert_eq!(point.platform, Some(RawField::Text("google".into())));
    }
}
