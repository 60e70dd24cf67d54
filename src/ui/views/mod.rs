mod ads;
mod analytics;
mod overview;
mod social;
mod table;

use crate::ui::renderfns::status_color;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use skyintel::{CacheEntry, CanonicalDataset, QueryStatus, SourceId};

/// Draw the active source panel: status, error, dataset tables, and AI insight.
pub fn draw_source(
  frame: &mut Frame,
  area: Rect,
  source: SourceId,
  entry: &CacheEntry,
  scroll: u16,
) {
  let block = Block::default()
    .title(panel_title(source, entry))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(status_color(entry.status)));

  let paragraph = Paragraph::new(panel_lines(source, entry))
    .block(block)
    .wrap(Wrap { trim: false })
    .scroll((scroll, 0));

  frame.render_widget(paragraph, area);
}

fn panel_title(source: SourceId, entry: &CacheEntry) -> String {
  let status = match entry.status {
    QueryStatus::Idle => "idle",
    QueryStatus::Loading => "loading...",
    QueryStatus::Success => "ok",
    QueryStatus::Error => "error",
    QueryStatus::Revalidating => "refreshing...",
  };
  let fetched = entry
    .fetched_at
    .map(|t| format!(" · fetched {}", t.with_timezone(&chrono::Local).format("%H:%M:%S")))
    .unwrap_or_default();
  format!(" {} ({}){} ", source.label(), status, fetched)
}

fn panel_lines(source: SourceId, entry: &CacheEntry) -> Vec<Line<'static>> {
  let mut lines = Vec::new();

  if let Some(error) = &entry.error {
    lines.push(Line::from(Span::styled(
      error.message.clone(),
      Style::default().fg(Color::Red).bold(),
    )));
    if entry.data.is_some() {
      lines.push(Line::from(Span::styled(
        "showing the last successful result",
        Style::default().fg(Color::DarkGray),
      )));
    }
    lines.push(Line::default());
  }

  let Some(data) = &entry.data else {
    let hint = match entry.status {
      QueryStatus::Loading | QueryStatus::Revalidating => {
        format!("Loading {} data...", source.label())
      }
      QueryStatus::Error => "Press r to retry".to_string(),
      _ => "Press r to load".to_string(),
    };
    lines.push(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))));
    return lines;
  };

  lines.extend(dataset_lines(data));

  let insight = data.ai_insight();
  if !insight.trim().is_empty() {
    lines.push(Line::from(Span::styled(
      "AI insight",
      Style::default().fg(Color::Magenta).bold(),
    )));
    lines.push(Line::from(insight.to_string()));
  }

  lines
}

fn dataset_lines(data: &CanonicalDataset) -> Vec<Line<'static>> {
  match data {
    CanonicalDataset::Facebook(d) => social::facebook_lines(d),
    CanonicalDataset::Instagram(d) => social::instagram_lines(d),
    CanonicalDataset::Ads(d) => ads::ads_lines(d),
    CanonicalDataset::Analytics(d) => analytics::analytics_lines(d),
    CanonicalDataset::Overall(d) => overview::overview_lines(d),
  }
}
