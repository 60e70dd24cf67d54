use super::table::{bars, table};
use crate::ui::renderfns::format_number;
use ratatui::text::Line;
use skyintel::normalize::AnalyticsDataset;

fn optional(value: Option<f64>) -> String {
  value.map(format_number).unwrap_or_else(|| "-".to_string())
}

pub fn analytics_lines(data: &AnalyticsDataset) -> Vec<Line<'static>> {
  let mut lines = table(
    "Traffic",
    &[
      ("Date", 12),
      ("Users", 9),
      ("Sessions", 9),
      ("Pageviews", 10),
    ],
    data
      .traffic_data
      .iter()
      .map(|t| {
        vec![
          t.date.clone(),
          optional(t.users),
          format_number(t.sessions),
          optional(t.pageviews),
        ]
      })
      .collect(),
  );

  lines.extend(bars(
    "Devices",
    data
      .device_data
      .iter()
      .map(|d| (d.name.clone(), d.value, d.color.clone()))
      .collect(),
    "%",
  ));

  lines.extend(table(
    "Top pages",
    &[("Page", 32), ("Views", 10), ("Bounce", 7)],
    data
      .top_pages
      .iter()
      .map(|p| {
        vec![
          p.page_path.clone(),
          format_number(p.screen_page_views),
          format!("{:.1}%", p.bounce_rate),
        ]
      })
      .collect(),
  ));

  lines.extend(table(
    "Conversion goals",
    &[("Goal", 24), ("Completions", 11), ("Rate", 7)],
    data
      .conversion_goals
      .iter()
      .map(|g| {
        vec![
          g.goal.clone(),
          format_number(g.completions),
          format!("{:.2}%", g.rate),
        ]
      })
      .collect(),
  ));

  lines
}
