use ratatui::prelude::Color;
use skyintel::QueryStatus;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Format a metric with thousands separators, keeping two decimals for fractions
pub fn format_number(value: f64) -> String {
  if !value.is_finite() {
    return "-".to_string();
  }
  if value.fract() != 0.0 && value.abs() < 1000.0 {
    return format!("{:.2}", value);
  }

  let rounded = value.round() as i64;
  let digits = rounded.unsigned_abs().to_string();
  let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, ch) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(ch);
  }
  if rounded < 0 {
    grouped.insert(0, '-');
  }
  grouped
}

/// Parse a `#RRGGBB` series color
pub fn hex_color(hex: &str) -> Option<Color> {
  let hex = hex.strip_prefix('#')?;
  if hex.len() != 6 {
    return None;
  }
  let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
  Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

/// Display color for a query status
pub fn status_color(status: QueryStatus) -> Color {
  match status {
    QueryStatus::Success => Color::Green,
    QueryStatus::Loading | QueryStatus::Revalidating => Color::Yellow,
    QueryStatus::Error => Color::Red,
    QueryStatus::Idle => Color::DarkGray,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("🚀 launch day recap", 6), "🚀 l...");
  }

  #[test]
  fn test_format_number() {
    assert_eq!(format_number(0.0), "0");
    assert_eq!(format_number(950.0), "950");
    assert_eq!(format_number(12500.0), "12,500");
    assert_eq!(format_number(1234567.0), "1,234,567");
    assert_eq!(format_number(-4200.0), "-4,200");
    assert_eq!(format_number(3.456), "3.46");
    assert_eq!(format_number(f64::NAN), "-");
  }

  #[test]
  fn test_hex_color() {
    assert_eq!(hex_color("#0088FE"), Some(Color::Rgb(0, 136, 254)));
    assert_eq!(hex_color("0088FE"), None);
    assert_eq!(hex_color("#fff"), None);
    assert_eq!(hex_color("#zzzzzz"), None);
  }

  #[test]
  fn test_status_color() {
    assert_eq!(status_color(QueryStatus::Success), Color::Green);
    assert_eq!(status_color(QueryStatus::Revalidating), Color::Yellow);
    assert_eq!(status_color(QueryStatus::Error), Color::Red);
  }
}
