//! Cache identity for a source request.

use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::source::SourceId;

/// Source plus optional date range.
///
/// Empty or blank dates are stored as `None`, so "no filter" has exactly one
/// representation and equivalent requests share a cache slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
  pub source: SourceId,
  pub start_date: Option<String>,
  pub end_date: Option<String>,
}

impl QueryKey {
  /// Build a key from a wire source name.
  ///
  /// Fails with `InvalidSource` for anything but the five known sources.
  pub fn new(source: &str, start_date: Option<&str>, end_date: Option<&str>) -> Result<Self> {
    let source: SourceId = source.parse()?;
    Ok(Self::for_source(source, start_date, end_date))
  }

  pub fn for_source(source: SourceId, start_date: Option<&str>, end_date: Option<&str>) -> Self {
    Self {
      source,
      start_date: normalize_date(start_date),
      end_date: normalize_date(end_date),
    }
  }

  /// Stable, fixed-length digest of the key, used to correlate log lines.
  pub fn cache_hash(&self) -> String {
    let input = format!(
      "{}:{}:{}",
      self.source,
      self.start_date.as_deref().unwrap_or(""),
      self.end_date.as_deref().unwrap_or("")
    );

    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
  }

  pub fn description(&self) -> String {
    match (&self.start_date, &self.end_date) {
      (None, None) => format!("{} (all time)", self.source),
      (Some(start), None) => format!("{} from {}", self.source, start),
      (None, Some(end)) => format!("{} until {}", self.source, end),
      (Some(start), Some(end)) => format!("{} {}..{}", self.source, start, end),
    }
  }
}

fn normalize_date(date: Option<&str>) -> Option<String> {
  date
    .map(str::trim)
    .filter(|d| !d.is_empty())
    .map(String::from)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::Error;
  use std::collections::HashSet;

  #[test]
  fn test_empty_date_equals_absent() {
    let a = QueryKey::new("ads", Some(""), None).unwrap();
    let b = QueryKey::new("ads", None, Some("  ")).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.cache_hash(), b.cache_hash());
  }

  #[test]
  fn test_keys_differ_by_each_field() {
    let base = QueryKey::new("analytics", Some("2024-02-01"), None).unwrap();
    let other_source = QueryKey::new("ads", Some("2024-02-01"), None).unwrap();
    let moved = QueryKey::new("analytics", None, Some("2024-02-01")).unwrap();

    let set: HashSet<_> = [base.clone(), other_source, moved, base].into_iter().collect();
    assert_eq!(set.len(), 3);
  }

  #[test]
  fn test_invalid_source() {
    let err = QueryKey::new("tiktok", None, None).unwrap_err();
    assert!(matches!(err, Error::InvalidSource(_)));
  }

  #[test]
  fn test_description() {
    let key = QueryKey::for_source(SourceId::Ads, Some("2024-01-01"), Some("2024-01-31"));
    assert_eq!(key.description(), "ads 2024-01-01..2024-01-31");
    assert_eq!(
      QueryKey::for_source(SourceId::Overall, None, None).description(),
      "overall (all time)"
    );
  }
}
