use crate::coerce::{Amount, DecimalSeparator, NumberParser, RawField};
use crate::models::{
    AggregateTotals, CampaignRow, CampaignStatus, DailyPlatformPoint, DailyPoint, DataSource, OriginSlice, PartialTotals,
    Platform, PlatformSlice, RawCampaignRecord, RawDailyPoint, RawOriginCount, Section, SourceData,
    ViewModel,
};
use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

pub const DAILY_WINDOW_DAYS: i64 = 7;

const MICROS_PER_UNIT: f64 = 1_000_000.0;
const CONVERSION_ACTIONS: [&str; 3] = ["lead", "purchase", "complete_registration"];
const UNNAMED_CAMPAIGN: &str = "Unnamed campaign";
const UNKNOWN_ORIGIN: &str = "Unknown";

/// Whether rates precomputed upstream (CTR, CPC) are trusted or rebuilt from
/// raw counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RatePolicy {
    #[default]
    PreferUpstream,
    Recompute,
}

impl FromStr for RatePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "upstream" | "prefer_upstream" => Ok(Self::PreferUpstream),
            "recompute" | "local" => Ok(Self::Recompute),
            other => Err(format!("unknown rate policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateOptions {
    pub separator: DecimalSeparator,
    pub rate_policy: RatePolicy,
}

/// Builds the view for the 7 days ending at `today`. Never fails: missing or
/// unreadable fields degrade to zeros and empty collections.
pub fn aggregate(today: NaiveDate, data: &SourceData, options: &AggregateOptions) -> ViewModel {
    let parser = NumberParser::new(options.separator);

    let campaigns: Vec<CampaignMetrics> = data
        .campaigns
        .iter()
        .map(|record| CampaignMetrics::from_record(record, &parser))
        .collect();
    let origins = group_origins(&data.origins, &parser);
    let supplied = data.totals.clone().unwrap_or_default();

    let totals = build_totals(&campaigns, &origins, &supplied, &parser, options.rate_policy);
    let platforms = group_platforms(&campaigns);
    let daily = build_daily(today, &data.daily, &parser);
    let rows = campaigns
        .iter()
        .map(|campaign| campaign.to_row(options.rate_policy))
        .collect();

    let fallback_sections: Vec<Section> = Section::ALL
        .into_iter()
        .filter(|section| data.fallback_sections.contains(section))
        .collect();
    let data_source = match fallback_sections.len() {
        0 => DataSource::Live,
        n if n == Section::ALL.len() => DataSource::Fallback,
        _ => DataSource::Partial,
    };

    ViewModel {
        reference_date: today.to_string(),
        data_source,
        fallback_sections,
        totals,
        platforms,
        origins,
        daily,
        campaigns: rows,
    }
}

/// `part / whole * 100`, or 0 when `whole` is 0.
pub fn percentage(part: f64, whole: f64) -> f64 {
    ratio(part, whole) * 100.0
}

/// `numerator / denominator`, or 0 when the denominator is not positive.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        Amount::new(numerator / denominator).get()
    } else {
        0.0
    }
}

struct CampaignMetrics {
    name: String,
    platform: Platform,
    status: CampaignStatus,
    investment: Option<Amount>,
    clicks: Option<u64>,
    impressions: Option<u64>,
    conversions: Option<Amount>,
    upstream_ctr: Option<Amount>,
    upstream_cpc: Option<Amount>,
}

impl CampaignMetrics {
    fn from_record(record: &RawCampaignRecord, parser: &NumberParser) -> Self {
        // Raw Google Ads rows: cost in micros, CTR as a fraction.
        let google_shape = record.cost.is_none() && record.cost_micros.is_some();
        let investment = match (&record.cost, &record.cost_micros) {
            (Some(cost), _) => Some(parser.amount(Some(cost))),
            (None, Some(micros)) => Some(from_micros(parser.amount(Some(micros)))),
            (None, None) => None,
        };
        let upstream_ctr = parser
            .parse(record.ctr.as_ref())
            .map(|ctr| if google_shape { Amount::new(ctr.get() * 100.0) } else { ctr });
        let upstream_cpc = parser
            .parse(record.avg_cpc.as_ref())
            .or_else(|| parser.parse(record.avg_cpc_micros.as_ref()).map(from_micros));

        let conversions = match (&record.conversions, &record.actions) {
            (Some(conversions), _) => Some(parser.amount(Some(conversions))),
            (None, Some(serde_json::Value::Array(actions))) => Some(sum_conversion_actions(actions, parser)),
            _ => None,
        };

        Self {
            name: label_of(record.name.as_ref()).unwrap_or_else(|| UNNAMED_CAMPAIGN.to_string()),
            platform: Platform::classify(label_of(record.platform.as_ref()).as_deref()),
            status: CampaignStatus::classify(label_of(record.status.as_ref()).as_deref()),
            investment,
            clicks: record.clicks.as_ref().map(|field| parser.count(Some(field))),
            impressions: record.impressions.as_ref().map(|field| parser.count(Some(field))),
            conversions,
            upstream_ctr,
            upstream_cpc,
        }
    }

    fn investment(&self) -> f64 {
        self.investment.unwrap_or_default().get()
    }

    fn clicks(&self) -> u64 {
        self.clicks.unwrap_or_default()
    }

    fn impressions(&self) -> u64 {
        self.impressions.unwrap_or_default()
    }

    fn conversions(&self) -> f64 {
        self.conversions.unwrap_or_default().get()
    }

    fn to_row(&self, policy: RatePolicy) -> CampaignRow {
        let investment = self.investment();
        let clicks = self.clicks();
        let impressions = self.impressions();
        let conversions = self.conversions();

        let ctr = choose_rate(policy, self.upstream_ctr, || percentage(clicks as f64, impressions as f64));
        let cpc = choose_rate(policy, self.upstream_cpc, || ratio(investment, clicks as f64));

        CampaignRow {
            name: self.name.clone(),
            platform: self.platform,
            status: self.status,
            investment,
            clicks,
            impressions,
            conversions,
            ctr,
            cpc,
            conversion_rate: percentage(conversions, clicks as f64),
            cost_per_conversion: ratio(investment, conversions),
        }
    }
}

fn from_micros(micros: Amount) -> Amount {
    Amount::new(micros.get() / MICROS_PER_UNIT)
}

fn label_of(field: Option<&RawField>) -> Option<String> {
    field.and_then(RawField::label)
}

fn sum_conversion_actions(actions: &[serde_json::Value], parser: &NumberParser) -> Amount {
    actions
        .iter()
        .filter_map(|action| {
            let kind = action.get("action_type")?.as_str()?;
            if !CONVERSION_ACTIONS.contains(&kind) {
                return None;
            }
            let value = serde_json::from_value::<RawField>(action.get("value")?.clone()).ok()?;
            Some(parser.amount(Some(&value)))
        })
        .sum()
}

fn choose_rate(policy: RatePolicy, upstream: Option<Amount>, computed: impl FnOnce() -> f64) -> f64 {
    match (policy, upstream) {
        (RatePolicy::PreferUpstream, Some(rate)) => rate.get(),
        _ => computed(),
    }
}

fn build_totals(
    campaigns: &[CampaignMetrics],
    origins: &[OriginSlice],
    supplied: &PartialTotals,
    parser: &NumberParser,
    policy: RatePolicy,
) -> AggregateTotals {
    let total_investment = sum_or_supplied(
        campaigns.iter().map(|campaign| campaign.investment),
        supplied.investment.as_ref(),
        parser,
    )
    .get();
    let total_clicks = count_or_supplied(campaigns.iter().map(|campaign| campaign.clicks), supplied.clicks.as_ref(), parser);
    let total_impressions = count_or_supplied(
        campaigns.iter().map(|campaign| campaign.impressions),
        supplied.impressions.as_ref(),
        parser,
    );
    let total_conversions = sum_or_supplied(
        campaigns.iter().map(|campaign| campaign.conversions),
        supplied.conversions.as_ref(),
        parser,
    );

    let total_leads = match parser.parse(supplied.leads.as_ref()) {
        Some(leads) => leads.count(),
        None if !origins.is_empty() => sum_leads(origins),
        None => total_conversions.count(),
    };

    let average_ctr = choose_rate(policy, parser.parse(supplied.ctr.as_ref()), || {
        percentage(total_clicks as f64, total_impressions as f64)
    });
    let average_cpc = choose_rate(policy, parser.parse(supplied.avg_cpc.as_ref()), || {
        ratio(total_investment, total_clicks as f64)
    });

    AggregateTotals {
        total_investment,
        total_clicks,
        total_impressions,
        total_conversions: total_conversions.get(),
        total_leads,
        average_ctr,
        average_cpc,
        cost_per_lead: ratio(total_investment, total_leads as f64),
        conversion_rate: percentage(total_conversions.get(), total_clicks as f64),
        active_campaigns: campaigns
            .iter()
            .filter(|campaign| campaign.status == CampaignStatus::Active)
            .count(),
    }
}

/// Sum of the per-record values when any record carries one, otherwise the
/// supplied total.
fn sum_or_supplied(
    values: impl Iterator<Item = Option<Amount>>,
    supplied: Option<&RawField>,
    parser: &NumberParser,
) -> Amount {
    let mut seen = false;
    let mut total = Amount::ZERO;
    for value in values.flatten() {
        seen = true;
        total += value;
    }
    if seen { total } else { parser.amount(supplied) }
}

fn count_or_supplied(values: impl Iterator<Item = Option<u64>>, supplied: Option<&RawField>, parser: &NumberParser) -> u64 {
    let mut seen = false;
    let mut total = 0u64;
    for value in values.flatten() {
        seen = true;
        total = total.saturating_add(value);
    }
    if seen { total } else { parser.count(supplied) }
}

fn group_platforms(campaigns: &[CampaignMetrics]) -> Vec<PlatformSlice> {
    let mut slices: Vec<PlatformSlice> = Vec::new();
    for campaign in campaigns {
        let index = match slices.iter().position(|slice| slice.platform == campaign.platform) {
            Some(index) => index,
            None => {
                slices.push(PlatformSlice {
                    platform: campaign.platform,
                    label: campaign.platform.label(),
                    campaigns: 0,
                    investment: 0.0,
                    clicks: 0,
                    impressions: 0,
                    share: 0.0,
                });
                slices.len() - 1
            }
        };
        let slice = &mut slices[index];
        slice.campaigns += 1;
        slice.investment += campaign.investment();
        slice.clicks = slice.clicks.saturating_add(campaign.clicks());
        slice.impressions = slice.impressions.saturating_add(campaign.impressions());
    }

    let total: f64 = slices.iter().map(|slice| slice.investment).sum();
    for slice in &mut slices {
        slice.share = percentage(slice.investment, total);
    }
    slices
}

fn group_origins(raw: &[RawOriginCount], parser: &NumberParser) -> Vec<OriginSlice> {
    let mut slices: Vec<OriginSlice> = Vec::new();
    for entry in raw {
        let origin = label_of(entry.origin.as_ref()).unwrap_or_else(|| UNKNOWN_ORIGIN.to_string());
        let leads = parser.count(entry.count.as_ref());
        match slices.iter_mut().find(|slice| slice.origin == origin) {
            Some(slice) => slice.leads = slice.leads.saturating_add(leads),
            None => slices.push(OriginSlice {
                origin,
                leads,
                percentage: 0.0,
            }),
        }
    }

    let total = sum_leads(&slices);
    for slice in &mut slices {
        slice.percentage = percentage(slice.leads as f64, total as f64);
    }
    slices
}

fn sum_leads(origins: &[OriginSlice]) -> u64 {
    origins.iter().fold(0u64, |total, origin| total.saturating_add(origin.leads))
}

#[derive(Debug, Clone, Copy, Default)]
struct DayActivity {
    leads: u64,
    clicks: u64,
    investment: Amount,
}

impl DayActivity {
    fn add(&mut self, other: DayActivity) {
        self.leads = self.leads.saturating_add(other.leads);
        self.clicks = self.clicks.saturating_add(other.clicks);
        self.investment += other.investment;
    }
}

fn build_daily(today: NaiveDate, raw: &[RawDailyPoint], parser: &NumberParser) -> Vec<DailyPoint> {
    let first_day = today - Duration::days(DAILY_WINDOW_DAYS - 1);
    let mut by_date: BTreeMap<NaiveDate, DayActivity> = BTreeMap::new();
    let mut by_platform: HashMap<(NaiveDate, Platform), DayActivity> = HashMap::new();
    let mut platforms: Vec<Platform> = Vec::new();

    for point in raw {
        let Some(date) = label_of(point.date.as_ref()).and_then(|label| parse_day(&label)) else {
            continue;
        };
        if date < first_day || date > today {
            continue;
        }
        let activity = DayActivity {
            leads: parser.count(point.leads.as_ref()),
            clicks: parser.count(point.clicks.as_ref()),
            investment: parser.amount(point.investment.as_ref()),
        };
        by_date.entry(date).or_default().add(activity);

        if let Some(label) = label_of(point.platform.as_ref()) {
            let platform = Platform::classify(Some(&label));
            if !platforms.contains(&platform) {
                platforms.push(platform);
            }
            by_platform.entry((date, platform)).or_default().add(activity);
        }
    }

    (0..DAILY_WINDOW_DAYS)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let day = by_date.get(&date).copied().unwrap_or_default();
            let platforms = platforms
                .iter()
                .map(|&platform| {
                    let activity = by_platform.get(&(date, platform)).copied().unwrap_or_default();
                    DailyPlatformPoint {
                        platform,
                        label: platform.label(),
                        lead_count: activity.leads,
                        click_count: activity.clicks,
                        investment: activity.investment.get(),
                    }
                })
                .collect();
            DailyPoint {
                date: date.to_string(),
                lead_count: day.leads,
                click_count: day.clicks,
                investment: day.investment.get(),
                platforms,
            }
        })
        .collect()
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part.
fn parse_day(label: &str) -> Option<NaiveDate> {
    let day = label.get(..10).unwrap_or(label);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
