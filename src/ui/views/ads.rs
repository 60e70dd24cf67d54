use super::table::{bars, table};
use crate::ui::renderfns::format_number;
use ratatui::text::Line;
use skyintel::normalize::AdsDataset;

pub fn ads_lines(data: &AdsDataset) -> Vec<Line<'static>> {
  let mut lines = table(
    "Campaigns",
    &[
      ("Campaign", 22),
      ("Spend", 10),
      ("Clicks", 8),
      ("Conv.", 7),
      ("CTR", 7),
      ("CPC", 7),
      ("ROAS", 6),
    ],
    data
      .campaign_performance
      .iter()
      .map(|c| {
        vec![
          c.campaign.clone(),
          format!("${}", format_number(c.spend)),
          format_number(c.clicks),
          format_number(c.conversions),
          format!("{:.2}%", c.ctr),
          format!("${:.2}", c.cpc),
          format!("{:.1}x", c.roas),
        ]
      })
      .collect(),
  );

  lines.extend(table(
    "Daily spend",
    &[("Date", 12), ("Spend", 10), ("Clicks", 8), ("Conv.", 7)],
    data
      .daily_spend
      .iter()
      .map(|d| {
        vec![
          d.date.clone(),
          format!("${}", format_number(d.spend)),
          format_number(d.clicks),
          format_number(d.conversions),
        ]
      })
      .collect(),
  ));

  lines.extend(table(
    "Keywords",
    &[
      ("Keyword", 24),
      ("Impr.", 9),
      ("Clicks", 8),
      ("CTR", 7),
      ("CPC", 7),
      ("QS", 4),
    ],
    data
      .keyword_performance
      .iter()
      .map(|k| {
        vec![
          k.keyword.clone(),
          format_number(k.impressions),
          format_number(k.clicks),
          format!("{:.2}%", k.ctr),
          format!("${:.2}", k.cpc),
          format_number(k.quality),
        ]
      })
      .collect(),
  ));

  lines.extend(bars(
    "Spend by device",
    data
      .device_performance
      .iter()
      .map(|d| (d.name.clone(), d.spend, d.color.clone()))
      .collect(),
    "",
  ));

  lines
}
