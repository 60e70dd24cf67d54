//! Canonical per-source dataset shapes.
//!
//! These are what presentation code consumes. Every collection is an ordered
//! `Vec` that is empty when the backend omitted it.

use serde::Serialize;

use crate::source::SourceId;

/// Normalized data for one source. Shapes are not interchangeable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum CanonicalDataset {
  Facebook(FacebookDataset),
  Instagram(InstagramDataset),
  Ads(AdsDataset),
  Analytics(AnalyticsDataset),
  Overall(OverviewDataset),
}

impl CanonicalDataset {
  pub fn source(&self) -> SourceId {
    match self {
      CanonicalDataset::Facebook(_) => SourceId::Facebook,
      CanonicalDataset::Instagram(_) => SourceId::Instagram,
      CanonicalDataset::Ads(_) => SourceId::Ads,
      CanonicalDataset::Analytics(_) => SourceId::Analytics,
      CanonicalDataset::Overall(_) => SourceId::Overall,
    }
  }

  pub fn ai_insight(&self) -> &str {
    match self {
      CanonicalDataset::Facebook(d) => &d.ai_insight,
      CanonicalDataset::Instagram(d) => &d.ai_insight,
      CanonicalDataset::Ads(d) => &d.ai_insight,
      CanonicalDataset::Analytics(d) => &d.ai_insight,
      CanonicalDataset::Overall(d) => &d.ai_insight,
    }
  }

  pub fn as_facebook(&self) -> Option<&FacebookDataset> {
    match self {
      CanonicalDataset::Facebook(d) => Some(d),
      _ => None,
    }
  }

  pub fn as_instagram(&self) -> Option<&InstagramDataset> {
    match self {
      CanonicalDataset::Instagram(d) => Some(d),
      _ => None,
    }
  }

  pub fn as_ads(&self) -> Option<&AdsDataset> {
    match self {
      CanonicalDataset::Ads(d) => Some(d),
      _ => None,
    }
  }

  pub fn as_analytics(&self) -> Option<&AnalyticsDataset> {
    match self {
      CanonicalDataset::Analytics(d) => Some(d),
      _ => None,
    }
  }

  pub fn as_overview(&self) -> Option<&OverviewDataset> {
    match self {
      CanonicalDataset::Overall(d) => Some(d),
      _ => None,
    }
  }
}

// ============================================================================
// Facebook
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacebookDataset {
  pub engagement_data: Vec<EngagementPoint>,
  pub audience_insights: Vec<AudienceSlice>,
  pub top_posts: Vec<TopPost>,
  pub content_types: Vec<ContentTypeStat>,
  pub ai_insight: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngagementPoint {
  pub date: String,
  pub reach: f64,
  pub likes: f64,
  pub comments: f64,
  pub shares: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AudienceSlice {
  pub age: String,
  pub percentage: f64,
  pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPost {
  #[serde(rename = "type")]
  pub post_type: String,
  pub content: String,
  pub reach: f64,
  pub engagement: f64,
  pub engagement_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContentTypeStat {
  pub name: String,
  pub posts: f64,
  pub engagement: f64,
  pub color: String,
}

// ============================================================================
// Instagram
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstagramDataset {
  pub growth_data: Vec<GrowthPoint>,
  pub content_performance: Vec<ContentPerformance>,
  pub hashtag_performance: Vec<HashtagPerformance>,
  pub audience_activity: Vec<ActivityPoint>,
  pub story_metrics: Vec<NamedValue>,
  pub ai_insight: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GrowthPoint {
  pub week: String,
  pub followers: f64,
  pub posts: f64,
  pub engagement: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPerformance {
  #[serde(rename = "type")]
  pub content_type: String,
  pub posts: f64,
  pub avg_likes: f64,
  pub avg_comments: f64,
  pub avg_views: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HashtagPerformance {
  pub hashtag: String,
  pub reach: f64,
  pub impressions: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivityPoint {
  pub hour: String,
  pub activity: f64,
}

/// A labelled share of a whole, drawn as a pie slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NamedValue {
  pub name: String,
  pub value: f64,
  pub color: String,
}

// ============================================================================
// Ads
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdsDataset {
  pub campaign_performance: Vec<CampaignPerformance>,
  pub daily_spend: Vec<DailySpend>,
  pub keyword_performance: Vec<KeywordPerformance>,
  pub device_performance: Vec<DevicePerformance>,
  pub ai_insight: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CampaignPerformance {
  pub campaign: String,
  pub spend: f64,
  pub clicks: f64,
  pub conversions: f64,
  pub ctr: f64,
  pub cpc: f64,
  pub roas: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailySpend {
  pub date: String,
  pub spend: f64,
  pub clicks: f64,
  pub conversions: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeywordPerformance {
  pub keyword: String,
  pub impressions: f64,
  pub clicks: f64,
  pub ctr: f64,
  pub cpc: f64,
  pub quality: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DevicePerformance {
  pub name: String,
  pub spend: f64,
  pub conversions: f64,
  pub color: String,
}

// ============================================================================
// Google Analytics
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsDataset {
  pub traffic_data: Vec<TrafficPoint>,
  pub device_data: Vec<NamedValue>,
  pub top_pages: Vec<TopPage>,
  pub conversion_goals: Vec<ConversionGoal>,
  pub ai_insight: String,
}

/// `users` and `pageviews` are not always reported, so they stay optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrafficPoint {
  pub date: String,
  pub users: Option<f64>,
  pub sessions: f64,
  pub pageviews: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPage {
  pub page_path: String,
  pub screen_page_views: f64,
  pub bounce_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversionGoal {
  pub goal: String,
  pub completions: f64,
  pub rate: f64,
}

// ============================================================================
// Overall overview
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewDataset {
  pub kpis: Vec<Kpi>,
  /// Opaque chart descriptors, passed through untouched.
  pub charts: Vec<serde_json::Value>,
  pub ai_insight: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Kpi {
  pub title: String,
  /// Display value; numeric backend values are rendered as text.
  pub value: String,
  pub period: Option<String>,
}
