//! Plain-text tables and share bars for the dashboard panels.

use crate::ui::renderfns::{hex_color, truncate};
use ratatui::prelude::*;

/// A column header and its width in characters
pub type Column = (&'static str, usize);

const BAR_WIDTH: usize = 30;

fn section_title(title: &str) -> Line<'static> {
  Line::from(Span::styled(
    title.to_string(),
    Style::default().fg(Color::Cyan).bold(),
  ))
}

fn pad(text: &str, width: usize, left: bool) -> String {
  let text = truncate(text, width);
  if left {
    format!("{:<width$}", text, width = width)
  } else {
    format!("{:>width$}", text, width = width)
  }
}

/// Titled table; the first column is left-aligned, the rest right-aligned.
pub fn table(title: &str, columns: &[Column], rows: Vec<Vec<String>>) -> Vec<Line<'static>> {
  let mut lines = vec![section_title(title)];

  if rows.is_empty() {
    lines.push(Line::from(Span::styled(
      "  no data for this range",
      Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::default());
    return lines;
  }

  let header: Vec<Span> = columns
    .iter()
    .enumerate()
    .map(|(i, (name, width))| {
      Span::styled(
        format!("  {}", pad(name, *width, i == 0)),
        Style::default().fg(Color::DarkGray).bold(),
      )
    })
    .collect();
  lines.push(Line::from(header));

  for row in rows {
    let cells: Vec<Span> = columns
      .iter()
      .enumerate()
      .map(|(i, (_, width))| {
        let value = row.get(i).map(String::as_str).unwrap_or("");
        Span::raw(format!("  {}", pad(value, *width, i == 0)))
      })
      .collect();
    lines.push(Line::from(cells));
  }

  lines.push(Line::default());
  lines
}

/// Titled list of horizontal bars scaled to the largest value, each drawn
/// in its series color.
pub fn bars(title: &str, items: Vec<(String, f64, String)>, suffix: &str) -> Vec<Line<'static>> {
  let mut lines = vec![section_title(title)];

  let max = items.iter().map(|(_, v, _)| *v).fold(0.0_f64, f64::max);
  if items.is_empty() || max <= 0.0 {
    lines.push(Line::from(Span::styled(
      "  no data for this range",
      Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::default());
    return lines;
  }

  for (label, value, color) in items {
    let filled = ((value.max(0.0) / max) * BAR_WIDTH as f64).round() as usize;
    let color = hex_color(&color).unwrap_or(Color::Blue);
    lines.push(Line::from(vec![
      Span::raw(format!("  {} ", pad(&label, 16, true))),
      Span::styled("█".repeat(filled), Style::default().fg(color)),
      Span::raw(format!(
        "{} {}{}",
        " ".repeat(BAR_WIDTH - filled.min(BAR_WIDTH)),
        crate::ui::renderfns::format_number(value),
        suffix
      )),
    ]));
  }

  lines.push(Line::default());
  lines
}
