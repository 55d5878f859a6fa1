use crate::coerce::RawField;
use crate::models::{PartialTotals, RawCampaignRecord, RawDailyPoint, RawOriginCount, Section, SourceData};
use chrono::{Duration, NaiveDate};
use std::path::Path;
use tokio::fs;
use tracing::error;

struct PlatformWeek {
    platform: &'static str,
    leads: [f64; 7],
    clicks: [f64; 7],
    spend: [f64; 7],
}

/// Oldest day first. Each platform's week adds up to its campaign totals.
const DAILY: [PlatformWeek; 2] = [
    PlatformWeek {
        platform: "google",
        leads: [2.0, 2.0, 1.0, 2.0, 1.0, 2.0, 1.0],
        clicks: [69.0, 80.0, 63.0, 87.0, 76.0, 83.0, 74.0],
        spend: [70.50, 81.20, 64.80, 88.90, 76.40, 84.16, 78.50],
    },
    PlatformWeek {
        platform: "facebook",
        leads: [0.0, 1.0, 0.0, 2.0, 1.0, 1.0, 0.0],
        clicks: [1.0, 2.0, 2.0, 3.0, 2.0, 2.0, 1.0],
        spend: [1.20, 2.40, 2.10, 3.60, 2.38, 2.90, 1.50],
    },
];

/// Example data shown whenever the live source cannot be used. Daily points
/// cover the seven days ending at `today`.
pub fn fallback_dataset(today: NaiveDate) -> SourceData {
    let campaigns = vec![
        campaign("Leads - Search Brand", "Google Ads", "ENABLED", 544.46, 532.0, 16000.0, 11.0),
        campaign("Lead Form - Instagram", "Meta Ads", "PAUSED", 16.08, 13.0, 700.0, 3.0),
    ];

    let origins = [("Google Ads", 11.0), ("Facebook Ads", 3.0), ("WhatsApp", 2.0)]
        .into_iter()
        .map(|(origin, count)| RawOriginCount {
            origin: text(origin),
            count: number(count),
        })
        .collect();

    let daily = DAILY
        .iter()
        .flat_map(|week| {
            (0..week.leads.len()).map(move |index| {
                let offset = (week.leads.len() - 1 - index) as i64;
                RawDailyPoint {
                    date: text(&(today - Duration::days(offset)).to_string()),
                    platform: text(week.platform),
                    leads: number(week.leads[index]),
                    clicks: number(week.clicks[index]),
                    investment: number(week.spend[index]),
                }
            })
        })
        .collect();

    SourceData {
        campaigns,
        totals: Some(PartialTotals {
            leads: number(16.0),
            ..PartialTotals::default()
        }),
        origins,
        daily,
        fallback_sections: Section::ALL.to_vec(),
    }
}

/// Reads a replacement fixture from disk. Any failure falls back to the
/// built-in dataset.
pub async fn load_fixture(path: Option<&Path>, today: NaiveDate) -> SourceData {
    let Some(path) = path else {
        return fallback_dataset(today);
    };

    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice::<SourceData>(&bytes) {
            Ok(mut data) => {
                data.fallback_sections = Section::ALL.to_vec();
                data
            }
            Err(err) => {
                error!("failed to parse fallback data file {}: {err}", path.display());
                fallback_dataset(today)
            }
        },
        Err(err) => {
            error!("failed to read fallback data file {}: {err}", path.display());
            fallback_dataset(today)
        }
    }
}

fn campaign(
    name: &str,
    platform: &str,
    status: &str,
    cost: f64,
    clicks: f64,
    impressions: f64,
    conversions: f64,
) -> RawCampaignRecord {
    RawCampaignRecord {
        name: text(name),
        platform: text(platform),
        status: text(status),
        cost: number(cost),
        clicks: number(clicks),
        impressions: number(impressions),
        conversions: number(conversions),
        ..RawCampaignRecord::default()
    }
}

fn text(value: &str) -> Option<RawField> {
    Some(RawField::Text(value.to_string()))
}

fn number(value: f64) -> Option<RawField> {
    Some(RawField::Number(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{AggregateOptions, aggregate};
    use crate::models::DataSource;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    #[test]
    fn fixture_aggregates_to_known_totals() {
        let view = aggregate(today(), &fallback_dataset(today()), &AggregateOptions::default());

        assert_eq!(view.data_source, DataSource::Fallback);
        assert!((view.totals.total_investment - 560.54).abs() < 1e-9);
        assert_eq!(view.totals.total_clicks, 545);
        assert_eq!(view.totals.total_impressions, 16700);
        assert_eq!(view.totals.total_leads, 16);
        assert!((view.totals.cost_per_lead - 35.03).abs() < 0.005);
        assert_eq!(view.totals.active_campaigns, 1);
    }

    #[test]
    fn fixture_daily_points_fill_the_window() {
        let view = aggregate(today(), &fallback_dataset(today()), &AggregateOptions::default());

        assert_eq!(view.daily.len(), 7);
        assert_eq!(view.daily[6].date, "2026-03-10");
        let leads: u64 = view.daily.iter().map(|day| day.lead_count).sum();
        let clicks: u64 = view.daily.iter().map(|day| day.click_count).sum();
        assert_eq!(leads, 16);
        assert_eq!(clicks, 545);
        assert!(view.daily.iter().all(|day| day.lead_count > 0));

        let spend: f64 = view.daily.iter().map(|day| day.investment).sum();
        assert!((spend - view.totals.total_investment).abs() < 1e-6);
        assert!(view.daily.iter().all(|day| day.platforms.len() == 2));
        let google_leads: u64 = view.daily.iter().map(|day| day.platforms[0].lead_count).sum();
        assert_eq!(google_leads, 11);
    }

    #[tokio::test]
    async fn missing_override_file_uses_builtin_fixture() {
        let path = std::env::temp_dir().join("campaign_dashboard_missing_fixture.json");
        let data = load_fixture(Some(&path), today()).await;
        assert_eq!(data.campaigns.len(), 2);
        assert_eq!(data.fallback_sections, Section::ALL.to_vec());
    }

    #[tokio::test]
    async fn override_file_replaces_builtin_fixture() {
        let path = std::env::temp_dir().join(format!("campaign_dashboard_fixture_{}.json", std::process::id()));
        let payload = serde_json::json!({
            "campaigns": [{"name": "Override", "cost": 1}],
            "origins": [{"origin": "Referral", "count": 4}]
        });
        tokio::fs::write(&path, serde_json::to_vec(&payload).unwrap()).await.unwrap();

        let data = load_fixture(Some(&path), today()).await;
        let _ = tokio::fs::remove_file(&path).await;

        assert_eq!(data.campaigns.len(), 1);
        assert_eq!(data.origins.len(), 1);
        assert_eq!(data.fallback_sections, Section::ALL.to_vec());
    }
}
