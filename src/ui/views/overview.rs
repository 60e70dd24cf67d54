use ratatui::prelude::*;
use skyintel::normalize::{Kpi, OverviewDataset};

use super::table::table;

/// KPI table; the chart payloads are passed through untouched and only counted.
pub fn overview_lines(data: &OverviewDataset) -> Vec<Line<'static>> {
  let mut lines = kpi_lines(&data.kpis);

  if !data.charts.is_empty() {
    lines.push(Line::from(Span::styled(
      format!(
        "{} chart series available via `skyintel fetch overall`",
        data.charts.len()
      ),
      Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::default());
  }

  lines
}

fn kpi_lines(kpis: &[Kpi]) -> Vec<Line<'static>> {
  table(
    "Key metrics",
    &[("Metric", 28), ("Value", 14), ("Period", 14)],
    kpis
      .iter()
      .map(|k| {
        vec![
          k.title.clone(),
          k.value.clone(),
          k.period.clone().unwrap_or_default(),
        ]
      })
      .collect(),
  )
}
