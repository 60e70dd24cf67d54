//! Cache entries and their loading lifecycle.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Error;
use crate::normalize::CanonicalDataset;
use crate::source::SourceId;

/// Lifecycle status of a cache entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
  /// No fetch requested yet, or invalidated
  #[default]
  Idle,
  /// First fetch in progress, no data to show
  Loading,
  /// Last fetch succeeded
  Success,
  /// Last fetch failed; previous data (if any) is still attached
  Error,
  /// Refreshing while previously fetched data is still shown
  Revalidating,
}

impl QueryStatus {
  pub fn is_fetching(self) -> bool {
    matches!(self, QueryStatus::Loading | QueryStatus::Revalidating)
  }

  /// Success or Error: the fetch this status belongs to is finished.
  pub fn is_settled(self) -> bool {
    matches!(self, QueryStatus::Success | QueryStatus::Error)
  }
}

/// Which kind of failure produced an [`ErrorInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  InvalidSource,
  Transport,
  HttpStatus,
  Parse,
}

/// Human-readable failure attached to a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
  pub message: String,
  pub http_status: Option<u16>,
  pub kind: ErrorKind,
}

impl ErrorInfo {
  pub fn transport(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      http_status: None,
      kind: ErrorKind::Transport,
    }
  }

  pub fn parse(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
      http_status: None,
      kind: ErrorKind::Parse,
    }
  }

  /// Error for a non-2xx response, taking the message from the JSON body's
  /// `detail`, then `message`, then a generic per-source fallback.
  pub fn from_response(source: SourceId, status: u16, body: &[u8]) -> Self {
    let message = serde_json::from_slice::<serde_json::Value>(body)
      .ok()
      .and_then(|value| {
        ["detail", "message"].into_iter().find_map(|field| {
          value
            .get(field)
            .and_then(serde_json::Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .map(String::from)
        })
      })
      .unwrap_or_else(|| fallback_message(source));

    Self {
      message,
      http_status: Some(status),
      kind: ErrorKind::HttpStatus,
    }
  }
}

pub(crate) fn fallback_message(source: SourceId) -> String {
  format!("Failed to load {} data", source.label())
}

impl From<Error> for ErrorInfo {
  fn from(err: Error) -> Self {
    match err {
      Error::InvalidSource(s) => Self {
        message: format!("unknown data source: {}", s),
        http_status: None,
        kind: ErrorKind::InvalidSource,
      },
      Error::HttpStatus { status, message } => Self {
        message,
        http_status: Some(status),
        kind: ErrorKind::HttpStatus,
      },
      Error::Parse(message) => Self::parse(message),
      Error::Transport(message) | Error::Config(message) => Self::transport(message),
    }
  }
}

/// The single cached state for one query key.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheEntry {
  pub status: QueryStatus,
  pub data: Option<CanonicalDataset>,
  pub error: Option<ErrorInfo>,
  pub fetched_at: Option<DateTime<Utc>>,
  /// Generation of the most recently started fetch for this key.
  pub generation: u64,
}

impl CacheEntry {
  pub fn is_loading(&self) -> bool {
    self.status == QueryStatus::Loading
  }

  pub fn is_success(&self) -> bool {
    self.status == QueryStatus::Success
  }

  pub fn is_error(&self) -> bool {
    self.status == QueryStatus::Error
  }

  pub fn data(&self) -> Option<&CanonicalDataset> {
    self.data.as_ref()
  }

  pub fn error_message(&self) -> Option<&str> {
    self.error.as_ref().map(|e| e.message.as_str())
  }

  /// True when fetched longer ago than `stale_time`. Never-fetched entries are stale.
  pub fn is_stale(&self, stale_time: std::time::Duration) -> bool {
    match self.fetched_at {
      Some(fetched_at) => (Utc::now() - fetched_at)
        .to_std()
        .map(|age| age > stale_time)
        .unwrap_or(false),
      None => true,
    }
  }
}
