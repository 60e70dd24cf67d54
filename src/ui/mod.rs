mod components;
mod renderfns;
mod views;

use crate::app::{App, Mode};
use ratatui::prelude::*;
use ratatui::widgets::{Paragraph, Tabs};
use skyintel::SourceId;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Length(1), // Source tabs
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Status bar
    ])
    .split(frame.area());

  renderfns::draw_header(frame, chunks[0], app.base_url(), app.range());
  draw_tabs(frame, chunks[1], app);

  let entry = app.current_entry();
  views::draw_source(frame, chunks[2], app.current_source(), &entry, app.scroll());

  draw_status_bar(frame, chunks[3], app);

  if app.mode() == Mode::Command {
    components::draw_command_overlay(
      frame,
      chunks[2],
      app.command_input(),
      &app.autocomplete_suggestions(),
      app.selected_suggestion(),
    );
  }
}

fn draw_tabs(frame: &mut Frame, area: Rect, app: &App) {
  let titles: Vec<String> = SourceId::ALL
    .iter()
    .enumerate()
    .map(|(i, source)| format!("{} {}", i + 1, source.label()))
    .collect();

  let tabs = Tabs::new(titles)
    .select(app.selected_tab())
    .style(Style::default().fg(Color::DarkGray))
    .highlight_style(Style::default().fg(Color::Cyan).bold())
    .divider("│");

  frame.render_widget(tabs, area);
}

fn draw_status_bar(frame: &mut Frame, area: Rect, app: &App) {
  let (content, style) = match (app.mode(), app.message()) {
    (Mode::Command, _) => (
      format!(":{}", app.command_input()),
      Style::default().fg(Color::Yellow),
    ),
    (Mode::Normal, Some(message)) => (message.to_string(), Style::default().fg(Color::Red)),
    (Mode::Normal, None) => (
      " 1-5/tab:source  j/k:scroll  r:refresh  :range <start> [end]  q:quit".to_string(),
      Style::default().fg(Color::DarkGray),
    ),
  };

  frame.render_widget(Paragraph::new(content).style(style), area);
}
