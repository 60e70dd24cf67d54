//! Dashboard commands, parsing, and autocomplete

use chrono::NaiveDate;
use skyintel::SourceId;

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "facebook",
    aliases: &["f", "fb"],
    description: "Facebook engagement",
  },
  Command {
    name: "instagram",
    aliases: &["i", "ig", "insta"],
    description: "Instagram growth",
  },
  Command {
    name: "ads",
    aliases: &["a", "campaigns"],
    description: "Ad campaign performance",
  },
  Command {
    name: "analytics",
    aliases: &["g", "ga", "traffic"],
    description: "Google Analytics traffic",
  },
  Command {
    name: "overview",
    aliases: &["o", "overall", "kpis"],
    description: "Cross-channel KPIs",
  },
  Command {
    name: "range",
    aliases: &["d", "dates"],
    description: "range <start> [end] | range clear",
  },
  Command {
    name: "refresh",
    aliases: &["r", "reload"],
    description: "Refetch the current tab",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit skyintel",
  },
];

/// What a command line asks the dashboard to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
  Show(SourceId),
  /// Set the date range; `None` clears a bound
  Range {
    start: Option<String>,
    end: Option<String>,
  },
  Refresh,
  Quit,
}

/// Parse a full command line such as `range 2024-01-01 2024-01-31`.
///
/// The command word may be a name, an alias, or an unambiguous prefix.
pub fn parse(input: &str) -> Result<Action, String> {
  let mut words = input.split_whitespace();
  let Some(word) = words.next() else {
    return Err("empty command".to_string());
  };
  let args: Vec<&str> = words.collect();

  let Some(cmd) = get_suggestions(word).into_iter().next() else {
    return Err(format!("unknown command: {}", word));
  };

  let action = match cmd.name {
    "facebook" => Action::Show(SourceId::Facebook),
    "instagram" => Action::Show(SourceId::Instagram),
    "ads" => Action::Show(SourceId::Ads),
    "analytics" => Action::Show(SourceId::Analytics),
    "overview" => Action::Show(SourceId::Overall),
    "range" => parse_range(&args)?,
    "refresh" => Action::Refresh,
    "quit" => Action::Quit,
    _ => return Err(format!("unknown command: {}", word)),
  };
  Ok(action)
}

fn parse_range(args: &[&str]) -> Result<Action, String> {
  match args {
    [] | ["clear"] | ["all"] => Ok(Action::Range {
      start: None,
      end: None,
    }),
    [start] => Ok(Action::Range {
      start: Some(parse_date(start)?.to_string()),
      end: None,
    }),
    [start, end] => {
      let start = parse_date(start)?;
      let end = parse_date(end)?;
      if end < start {
        return Err(format!("range ends before it starts: {} > {}", start, end));
      }
      Ok(Action::Range {
        start: Some(start.to_string()),
        end: Some(end.to_string()),
      })
    }
    _ => Err("usage: range <start> [end] | range clear".to_string()),
  }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|_| format!("invalid date {:?}, expected YYYY-MM-DD", s))
}

/// Get autocomplete suggestions for the command word of `input`
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input
    .split_whitespace()
    .next()
    .unwrap_or("")
    .to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| match_priority(cmd, &input_lower).map(|p| (cmd, p)))
    .collect();

  // stable sort keeps table order within a priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

fn match_priority(cmd: &Command, input: &str) -> Option<u32> {
  if cmd.name == input {
    Some(0)
  } else if cmd.aliases.contains(&input) {
    Some(1)
  } else if cmd.name.starts_with(input) {
    Some(2)
  } else if cmd.aliases.iter().any(|a| a.starts_with(input)) {
    Some(3)
  } else if cmd.name.contains(input) {
    Some(4)
  } else if cmd.aliases.iter().any(|a| a.contains(input)) {
    Some(5)
  } else {
    None
  }
}
