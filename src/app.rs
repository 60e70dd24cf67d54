use crate::commands::{self, Action, Command};
use crate::event::{Event, EventHandler};
use crate::ui;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use skyintel::{
  CacheEntry, Config, HttpTransport, OverviewAggregator, QueryClient, SourceId, SourceQuery,
};
use std::io::stdout;
use std::time::Duration;
use tracing::info;

/// Input mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  Normal,
  Command,
}

/// Date range applied to every tab
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateRange {
  pub start: Option<String>,
  pub end: Option<String>,
}

impl DateRange {
  pub fn label(&self) -> String {
    match (&self.start, &self.end) {
      (None, None) => "all time".to_string(),
      (Some(start), None) => format!("since {}", start),
      (None, Some(end)) => format!("until {}", end),
      (Some(start), Some(end)) => format!("{} .. {}", start, end),
    }
  }
}

/// Main application state
pub struct App {
  /// Controllers for the four single-source tabs, in `SourceId::ALL` order
  sources: Vec<SourceQuery<HttpTransport>>,
  overview: OverviewAggregator<HttpTransport>,

  /// Index into `SourceId::ALL`
  selected_tab: usize,
  range: DateRange,
  /// Vertical scroll of the active tab
  scroll: u16,

  mode: Mode,
  command_input: String,
  selected_suggestion: usize,
  /// Last command error, cleared on the next key press
  message: Option<String>,

  base_url: String,
  should_quit: bool,
}

impl App {
  pub fn new(config: &Config, range: DateRange) -> Result<Self> {
    let client = QueryClient::from_config(config)?;

    let sources = SourceId::ALL
      .iter()
      .filter(|s| **s != SourceId::Overall)
      .map(|s| client.source(*s))
      .collect();

    Ok(Self {
      sources,
      overview: client.overview(),
      selected_tab: 0,
      range,
      scroll: 0,
      mode: Mode::Normal,
      command_input: String::new(),
      selected_suggestion: 0,
      message: None,
      base_url: config.api.base_url.clone(),
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250));

    self.observe_current();

    let result = self.event_loop(&mut terminal, &mut events).await;

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop<B: Backend>(
    &mut self,
    terminal: &mut Terminal<B>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        // cache updates are read at draw time
        Some(Event::Tick) | Some(Event::Resize) => {}
        None => break,
      }
    }
    Ok(())
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    match self.mode {
      Mode::Normal => self.handle_normal_mode_key(key),
      Mode::Command => self.handle_command_mode_key(key),
    }
  }

  fn handle_normal_mode_key(&mut self, key: KeyEvent) {
    self.message = None;
    match key.code {
      KeyCode::Char('q') => self.should_quit = true,

      KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => self.cycle_tab(1),
      KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => self.cycle_tab(-1),
      KeyCode::Char(c @ '1'..='5') => {
        let index = c as usize - '1' as usize;
        self.select_source(SourceId::ALL[index]);
      }

      KeyCode::Down | KeyCode::Char('j') => self.scroll = self.scroll.saturating_add(1),
      KeyCode::Up | KeyCode::Char('k') => self.scroll = self.scroll.saturating_sub(1),
      KeyCode::Char('g') => self.scroll = 0,

      KeyCode::Char('r') => self.refresh(),

      KeyCode::Char(':') => {
        self.mode = Mode::Command;
        self.command_input.clear();
      }

      _ => {}
    }
  }

  fn handle_command_mode_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Normal;
        self.command_input.clear();
        self.selected_suggestion = 0;
      }
      KeyCode::Enter => {
        self.execute_command();
        self.mode = Mode::Normal;
        self.selected_suggestion = 0;
      }
      KeyCode::Tab | KeyCode::Down => {
        let suggestions = commands::get_suggestions(&self.command_input);
        if !suggestions.is_empty() {
          self.selected_suggestion = (self.selected_suggestion + 1) % suggestions.len();
        }
      }
      KeyCode::BackTab | KeyCode::Up => {
        let suggestions = commands::get_suggestions(&self.command_input);
        if !suggestions.is_empty() {
          self.selected_suggestion = if self.selected_suggestion == 0 {
            suggestions.len() - 1
          } else {
            self.selected_suggestion - 1
          };
        }
      }
      KeyCode::Backspace => {
        self.command_input.pop();
        self.selected_suggestion = 0;
      }
      KeyCode::Char(c) => {
        self.command_input.push(c);
        self.selected_suggestion = 0;
      }
      _ => {}
    }
  }

  fn execute_command(&mut self) {
    let input = self.command_input.trim().to_string();
    self.command_input.clear();
    if input.is_empty() {
      return;
    }

    // a bare word picks the highlighted suggestion; arguments are parsed as typed
    let line = if input.contains(' ') {
      input
    } else {
      match commands::get_suggestions(&input).get(self.selected_suggestion) {
        Some(cmd) => cmd.name.to_string(),
        None => input,
      }
    };

    match commands::parse(&line) {
      Ok(action) => self.apply(action),
      Err(message) => self.message = Some(message),
    }
  }

  fn apply(&mut self, action: Action) {
    match action {
      Action::Show(source) => self.select_source(source),
      Action::Range { start, end } => {
        self.range = DateRange { start, end };
        info!(range = %self.range.label(), "date range changed");
        self.scroll = 0;
        self.observe_current();
      }
      Action::Refresh => self.refresh(),
      Action::Quit => self.should_quit = true,
    }
  }

  fn cycle_tab(&mut self, delta: i32) {
    let len = SourceId::ALL.len() as i32;
    let index = (self.selected_tab as i32 + delta).rem_euclid(len) as usize;
    self.select_source(SourceId::ALL[index]);
  }

  fn select_source(&mut self, source: SourceId) {
    if let Some(index) = SourceId::ALL.iter().position(|s| *s == source) {
      if index != self.selected_tab {
        self.scroll = 0;
      }
      self.selected_tab = index;
      self.observe_current();
    }
  }

  /// Point the active tab's controller at the current range.
  fn observe_current(&mut self) {
    let DateRange { start, end } = self.range.clone();
    let source = self.current_source();
    if source == SourceId::Overall {
      self.overview.observe(start.as_deref(), end.as_deref());
    } else if let Some(query) = self.sources.iter_mut().find(|q| q.source() == source) {
      query.observe(start.as_deref(), end.as_deref());
    }
  }

  fn refresh(&mut self) {
    let source = self.current_source();
    info!(%source, "manual refresh");
    if source == SourceId::Overall {
      self.overview.refresh();
    } else if let Some(query) = self.sources.iter().find(|q| q.source() == source) {
      query.refresh();
    }
  }

  // Accessors for UI rendering
  pub fn current_source(&self) -> SourceId {
    SourceId::ALL[self.selected_tab]
  }

  pub fn selected_tab(&self) -> usize {
    self.selected_tab
  }

  /// Latest entry of the active tab; idle before its first observe.
  pub fn current_entry(&self) -> CacheEntry {
    let source = self.current_source();
    let entry = if source == SourceId::Overall {
      self.overview.current()
    } else {
      self
        .sources
        .iter()
        .find(|q| q.source() == source)
        .and_then(|q| q.current())
    };
    entry.unwrap_or_default()
  }

  pub fn range(&self) -> &DateRange {
    &self.range
  }

  pub fn scroll(&self) -> u16 {
    self.scroll
  }

  pub fn mode(&self) -> Mode {
    self.mode
  }

  pub fn command_input(&self) -> &str {
    &self.command_input
  }

  pub fn message(&self) -> Option<&str> {
    self.message.as_deref()
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  pub fn autocomplete_suggestions(&self) -> Vec<&'static Command> {
    commands::get_suggestions(&self.command_input)
  }

  pub fn selected_suggestion(&self) -> usize {
    self.selected_suggestion
  }
}
