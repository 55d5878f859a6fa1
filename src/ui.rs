use crate::format::{format_currency, format_number, format_percentage, format_quantity};
use crate::models::{DailyPlatformPoint, DataSource, ViewModel};

pub fn render_dashboard(view: &ViewModel) -> String {
    let totals = &view.totals;

    let cards = [
        ("Investment", format_currency(totals.total_investment)),
        ("Leads", format_number(totals.total_leads)),
        ("CTR", format_percentage(totals.average_ctr)),
        ("Cost per lead", format_currency(totals.cost_per_lead)),
        ("Clicks", format_number(totals.total_clicks)),
        ("Impressions", format_number(totals.total_impressions)),
        ("Avg. CPC", format_currency(totals.average_cpc)),
        ("Conversion rate", format_percentage(totals.conversion_rate)),
    ]
    .iter()
    .map(|(label, value)| format!(r#"<div class="card"><span>{label}</span><strong>{value}</strong></div>"#))
    .collect::<String>();

    let origins = view
        .origins
        .iter()
        .map(|slice| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(&slice.origin),
                format_number(slice.leads),
                format_percentage(slice.percentage)
            )
        })
        .collect::<String>();

    let platforms = view
        .platforms
        .iter()
        .map(|slice| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                slice.label,
                slice.campaigns,
                format_currency(slice.investment),
                format_number(slice.clicks),
                format_percentage(slice.share)
            )
        })
        .collect::<String>();

    let daily = view
        .daily
        .iter()
        .map(|day| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                day.date,
                format_number(day.lead_count),
                format_number(day.click_count),
                format_currency(day.investment),
                daily_split(&day.platforms)
            )
        })
        .collect::<String>();

    let campaigns = view
        .campaigns
        .iter()
        .map(|row| {
            format!(
                r#"<tr><td>{}</td><td>{}</td><td><span class="status status-{}">{}</span></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
                escape_html(&row.name),
                row.platform.label(),
                row.status.label().to_ascii_lowercase(),
                row.status.label(),
                format_currency(row.investment),
                format_number(row.clicks),
                format_number(row.impressions),
                format_quantity(row.conversions),
                format_percentage(row.ctr),
                format_currency(row.cpc)
            )
        })
        .collect::<String>();

    fill_template(
        DASHBOARD_HTML,
        &[
            ("DATE", view.reference_date.clone()),
            ("BANNER", banner(view)),
            ("CARDS", cards),
            ("ORIGINS", or_empty(origins, 3)),
            ("PLATFORMS", or_empty(platforms, 5)),
            ("DAILY", daily),
            ("CAMPAIGNS", or_empty(campaigns, 9)),
        ],
    )
}

/// Replaces every `{{NAME}}` in one pass. Inserted text is never rescanned,
/// and unknown placeholders are left as they are.
fn fill_template(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let value = after.find("}}").and_then(|end| {
            let name = &after[..end];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (end, value))
        });
        match value {
            Some((end, value)) => {
                out.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn banner(view: &ViewModel) -> String {
    let detail = match view.data_source {
        DataSource::Live => return String::new(),
        DataSource::Fallback => "The live source is unavailable.".to_string(),
        DataSource::Partial => {
            let sections: Vec<&str> = view.fallback_sections.iter().map(|section| section.as_str()).collect();
            format!("Live data could not be loaded for: {}.", sections.join(", "))
        }
    };
    format!(r#"<div class="banner" role="status">Showing example data. {detail}</div>"#)
}

fn daily_split(platforms: &[DailyPlatformPoint]) -> String {
    platforms
        .iter()
        .map(|point| format!("{}: {}", point.label, format_number(point.lead_count)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn or_empty(rows: String, columns: usize) -> String {
    if rows.is_empty() {
        format!(r#"<tr><td colspan="{columns}" class="empty">No data</td></tr>"#)
    } else {
        rows
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Campaign Dashboard</title>
  <style>
    :root {
      --bg: #f4f6fb;
      --ink: #1f2633;
      --muted: #6b7385;
      --accent: #1877f2;
      --card: #ffffff;
      --warn: #fff4d6;
      --shadow: 0 12px 32px rgba(31, 38, 51, 0.08);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      background: var(--bg);
      color: var(--ink);
      font-family: "Inter", "Segoe UI", sans-serif;
      padding: 32px 18px 48px;
    }

    main {
      width: min(1100px, 100%);
      margin: 0 auto;
      display: grid;
      gap: 24px;
    }

    header {
      display: flex;
      justify-content: space-between;
      align-items: center;
      gap: 16px;
    }

    h1 {
      margin: 0;
      font-size: 1.6rem;
    }

    .date {
      color: var(--muted);
    }

    button {
      border: none;
      border-radius: 999px;
      padding: 10px 20px;
      background: var(--accent);
      color: #fff;
      font-weight: 600;
      cursor: pointer;
    }

    .banner {
      background: var(--warn);
      border-radius: 12px;
      padding: 12px 16px;
    }

    .cards {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
      gap: 16px;
    }

    .card, section {
      background: var(--card);
      border-radius: 16px;
      box-shadow: var(--shadow);
      padding: 18px;
    }

    .card span {
      display: block;
      color: var(--muted);
      font-size: 0.85rem;
    }

    .card strong {
      font-size: 1.5rem;
    }

    .grid {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(320px, 1fr));
      gap: 16px;
    }

    table {
      width: 100%;
      border-collapse: collapse;
      font-size: 0.9rem;
    }

    th, td {
      text-align: left;
      padding: 8px 6px;
      border-bottom: 1px solid #e7eaf0;
    }

    .empty {
      color: var(--muted);
      text-align: center;
    }

    .status {
      border-radius: 999px;
      padding: 2px 10px;
      font-size: 0.8rem;
      background: #eceff4;
    }

    .status-active {
      background: #dff5e3;
    }

    .status-paused {
      background: #fdeccc;
    }
  </style>
</head>
<body>
  <main>
    <header>
      <div>
        <h1>Campaign Dashboard</h1>
        <div class="date">Last 7 days ending {{DATE}}</div>
      </div>
      <form method="post" action="/refresh">
        <button type="submit">Refresh</button>
      </form>
    </header>
    {{BANNER}}
    <div class="cards">{{CARDS}}</div>
    <div class="grid">
      <section>
        <h2>Leads by origin</h2>
        <table>
          <thead><tr><th>Origin</th><th>Leads</th><th>Share</th></tr></thead>
          <tbody>{{ORIGINS}}</tbody>
        </table>
      </section>
      <section>
        <h2>Investment by platform</h2>
        <table>
          <thead><tr><th>Platform</th><th>Campaigns</th><th>Investment</th><th>Clicks</th><th>Share</th></tr></thead>
          <tbody>{{PLATFORMS}}</tbody>
        </table>
      </section>
    </div>
    <section>
      <h2>Daily activity</h2>
      <table>
        <thead><tr><th>Date</th><th>Leads</th><th>Clicks</th><th>Investment</th><th>Leads by platform</th></tr></thead>
        <tbody>{{DAILY}}</tbody>
      </table>
    </section>
    <section>
      <h2>Campaigns</h2>
      <table>
        <thead><tr><th>Name</th><th>Platform</th><th>Status</th><th>Investment</th><th>Clicks</th><th>Impressions</th><th>Conversions</th><th>CTR</th><th>CPC</th></tr></thead>
        <tbody>{{CAMPAIGNS}}</tbody>
      </table>
    </section>
  </main>
</body>
</html>
"#;
