//! Data sources and the endpoint registry that maps them to backend URLs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::query::QueryKey;

/// One of the five analytics backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
  Facebook,
  Instagram,
  Ads,
  Analytics,
  Overall,
}

impl SourceId {
  pub const ALL: [SourceId; 5] = [
    SourceId::Facebook,
    SourceId::Instagram,
    SourceId::Ads,
    SourceId::Analytics,
    SourceId::Overall,
  ];

  /// Wire identifier, as accepted by `FromStr`.
  pub fn as_str(self) -> &'static str {
    match self {
      SourceId::Facebook => "facebook",
      SourceId::Instagram => "instagram",
      SourceId::Ads => "ads",
      SourceId::Analytics => "analytics",
      SourceId::Overall => "overall",
    }
  }

  /// Endpoint path relative to the API base URL.
  pub fn path(self) -> &'static str {
    match self {
      SourceId::Facebook => "/facebook/overview",
      SourceId::Instagram => "/instagram/overview",
      SourceId::Ads => "/ads/overview",
      SourceId::Analytics => "/ga/overview",
      SourceId::Overall => "/api/overview/all",
    }
  }

  /// Human-readable name used in titles and fallback error messages.
  pub fn label(self) -> &'static str {
    match self {
      SourceId::Facebook => "Facebook",
      SourceId::Instagram => "Instagram",
      SourceId::Ads => "Ads",
      SourceId::Analytics => "Google Analytics",
      SourceId::Overall => "overall overview",
    }
  }
}

impl fmt::Display for SourceId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for SourceId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    SourceId::ALL
      .into_iter()
      .find(|source| source.as_str() == s)
      .ok_or_else(|| Error::InvalidSource(s.to_string()))
  }
}

/// Maps query keys to request URLs under an injected base URL.
#[derive(Debug, Clone)]
pub struct EndpointRegistry {
  base_url: Url,
}

impl EndpointRegistry {
  /// Create a registry rooted at `base_url`.
  ///
  /// A path prefix on the base (e.g. `https://host/backend`) is kept in front
  /// of every endpoint path.
  pub fn new(base_url: &str) -> Result<Self> {
    let base_url = Url::parse(base_url)
      .map_err(|e| Error::Config(format!("invalid API base URL {:?}: {}", base_url, e)))?;

    if base_url.cannot_be_a_base() {
      return Err(Error::Config(format!(
        "API base URL {} cannot carry a path",
        base_url
      )));
    }

    Ok(Self { base_url })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// Build the request URL for a key, with `startDate`/`endDate` only when set.
  pub fn url_for(&self, key: &QueryKey) -> Url {
    let mut url = self.base_url.clone();
    url.set_query(None);
    url.set_fragment(None);

    // new() rejected cannot-be-a-base URLs, so this always succeeds
    if let Ok(mut segments) = url.path_segments_mut() {
      segments.pop_if_empty();
      segments.extend(key.source.path().split('/').filter(|s| !s.is_empty()));
    }

    if key.start_date.is_some() || key.end_date.is_some() {
      let mut pairs = url.query_pairs_mut();
      if let Some(start) = &key.start_date {
        pairs.append_pair("startDate", start);
      }
      if let Some(end) = &key.end_date {
        pairs.append_pair("endDate", end);
      }
    }

    url
  }
}
