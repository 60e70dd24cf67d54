//! Maps raw backend payloads into each source's canonical dataset.
//!
//! Normalization is total: any JSON value produces a dataset. Unknown fields
//! are ignored, absent collections become empty, absent required numbers
//! become `0.0`, and absent colors are taken from [`FALLBACK_PALETTE`].
//! Structural rejection (invalid or non-object JSON) happens before this
//! module is reached.

mod schema;

pub use schema::*;

use serde_json::Value;

use crate::source::SourceId;

/// Colors assigned by index when the backend sends none.
pub const FALLBACK_PALETTE: [&str; 4] = ["#0088FE", "#00C49F", "#FFBB28", "#FF8042"];

/// Normalize a raw payload for `source`.
pub fn normalize(source: SourceId, raw: &Value) -> CanonicalDataset {
  match source {
    SourceId::Facebook => CanonicalDataset::Facebook(facebook(raw)),
    SourceId::Instagram => CanonicalDataset::Instagram(instagram(raw)),
    SourceId::Ads => CanonicalDataset::Ads(ads(raw)),
    SourceId::Analytics => CanonicalDataset::Analytics(analytics(raw)),
    SourceId::Overall => CanonicalDataset::Overall(overview(raw)),
  }
}

pub fn facebook(raw: &Value) -> FacebookDataset {
  let chart = envelope(raw, "chartData");

  FacebookDataset {
    engagement_data: items(chart, "engagementData", |_, item| EngagementPoint {
      date: text(item, &["date"]),
      reach: number(item, &["reach"]),
      likes: number(item, &["likes"]),
      comments: number(item, &["comments"]),
      shares: number(item, &["shares"]),
    }),
    audience_insights: items(chart, "audienceInsights", |i, item| AudienceSlice {
      age: text(item, &["age"]),
      percentage: number(item, &["percentage"]),
      color: color(item, i),
    }),
    top_posts: items(chart, "topPosts", |_, item| TopPost {
      post_type: text(item, &["type"]),
      content: text(item, &["content"]),
      reach: number(item, &["reach"]),
      engagement: number(item, &["engagement"]),
      engagement_rate: number(item, &["engagementRate"]),
    }),
    content_types: items(chart, "contentTypes", |i, item| ContentTypeStat {
      name: text(item, &["name"]),
      posts: number(item, &["posts"]),
      engagement: number(item, &["engagement"]),
      color: color(item, i),
    }),
    ai_insight: ai_insight(raw),
  }
}

pub fn instagram(raw: &Value) -> InstagramDataset {
  let chart = envelope(raw, "chartData");

  InstagramDataset {
    growth_data: items(chart, "growthData", |_, item| GrowthPoint {
      week: text(item, &["week"]),
      followers: number(item, &["followers"]),
      posts: number(item, &["posts"]),
      engagement: number(item, &["engagement"]),
    }),
    content_performance: items(chart, "contentPerformance", |_, item| ContentPerformance {
      content_type: text(item, &["type"]),
      posts: number(item, &["posts"]),
      avg_likes: number(item, &["avgLikes"]),
      avg_comments: number(item, &["avgComments"]),
      avg_views: number(item, &["avgViews"]),
    }),
    hashtag_performance: items(chart, "hashtagPerformance", |_, item| HashtagPerformance {
      hashtag: text(item, &["hashtag"]),
      reach: number(item, &["reach"]),
      impressions: number(item, &["impressions"]),
    }),
    audience_activity: items(chart, "audienceActivity", |_, item| ActivityPoint {
      hour: text(item, &["hour"]),
      activity: number(item, &["activity"]),
    }),
    story_metrics: items(chart, "storyMetrics", named_value),
    ai_insight: ai_insight(raw),
  }
}

pub fn ads(raw: &Value) -> AdsDataset {
  let chart = envelope(raw, "chartData");

  AdsDataset {
    campaign_performance: items(chart, "campaignPerformance", |_, item| CampaignPerformance {
      campaign: text(item, &["campaign"]),
      spend: number(item, &["spend"]),
      clicks: number(item, &["clicks"]),
      conversions: number(item, &["conversions"]),
      ctr: number(item, &["ctr"]),
      cpc: number(item, &["cpc"]),
      roas: number(item, &["roas"]),
    }),
    daily_spend: items(chart, "dailySpend", |_, item| DailySpend {
      date: text(item, &["date"]),
      spend: number(item, &["spend"]),
      clicks: number(item, &["clicks"]),
      conversions: number(item, &["conversions"]),
    }),
    keyword_performance: items(chart, "keywordPerformance", |_, item| KeywordPerformance {
      keyword: text(item, &["keyword"]),
      impressions: number(item, &["impressions"]),
      clicks: number(item, &["clicks"]),
      ctr: number(item, &["ctr"]),
      cpc: number(item, &["cpc"]),
      quality: number(item, &["quality"]),
    }),
    device_performance: items(chart, "devicePerformance", |i, item| DevicePerformance {
      name: text(item, &["name"]),
      spend: number(item, &["spend"]),
      conversions: number(item, &["conversions"]),
      color: color(item, i),
    }),
    ai_insight: ai_insight(raw),
  }
}

pub fn analytics(raw: &Value) -> AnalyticsDataset {
  let chart = envelope(raw, "chartData");

  AnalyticsDataset {
    // older backends label the traffic axis `month`
    traffic_data: items(chart, "trafficData", |_, item| TrafficPoint {
      date: text(item, &["date", "month"]),
      users: optional_number(item, &["users"]),
      sessions: number(item, &["sessions"]),
      pageviews: optional_number(item, &["pageviews"]),
    }),
    device_data: items(chart, "deviceData", named_value),
    top_pages: items(chart, "topPages", |_, item| TopPage {
      page_path: text(item, &["pagePath", "page"]),
      screen_page_views: number(item, &["screenPageViews", "views"]),
      bounce_rate: number(item, &["bounceRate"]),
    }),
    conversion_goals: items(chart, "conversionGoals", |_, item| ConversionGoal {
      goal: text(item, &["goal"]),
      completions: number(item, &["completions"]),
      rate: number(item, &["rate"]),
    }),
    ai_insight: ai_insight(raw),
  }
}

pub fn overview(raw: &Value) -> OverviewDataset {
  let data = envelope(raw, "overviewData");

  OverviewDataset {
    kpis: items(data, "kpis", |_, item| Kpi {
      title: text(item, &["title"]),
      value: text(item, &["value"]),
      period: optional_text(item, &["period"]),
    }),
    charts: data
      .get("charts")
      .and_then(Value::as_array)
      .cloned()
      .unwrap_or_default(),
    ai_insight: ai_insight(raw),
  }
}

// ============================================================================
// Field accessors
// ============================================================================

/// The object under `field`, or the payload itself when it is not enveloped.
fn envelope<'a>(raw: &'a Value, field: &str) -> &'a Value {
  raw.get(field).filter(|v| v.is_object()).unwrap_or(raw)
}

fn ai_insight(raw: &Value) -> String {
  text(raw, &["aiInsight"])
}

/// Map every element of the array at `field`; non-arrays yield an empty vec.
fn items<T>(parent: &Value, field: &str, map: impl Fn(usize, &Value) -> T) -> Vec<T> {
  parent
    .get(field)
    .and_then(Value::as_array)
    .map(|array| array.iter().enumerate().map(|(i, item)| map(i, item)).collect())
    .unwrap_or_default()
}

fn named_value(index: usize, item: &Value) -> NamedValue {
  NamedValue {
    name: text(item, &["name"]),
    value: number(item, &["value"]),
    color: color(item, index),
  }
}

fn first<'a>(item: &'a Value, fields: &[&str]) -> Option<&'a Value> {
  fields
    .iter()
    .find_map(|field| item.get(field).filter(|v| !v.is_null()))
}

fn optional_text(item: &Value, fields: &[&str]) -> Option<String> {
  first(item, fields).and_then(value_as_string)
}

fn text(item: &Value, fields: &[&str]) -> String {
  optional_text(item, fields).unwrap_or_default()
}

fn optional_number(item: &Value, fields: &[&str]) -> Option<f64> {
  first(item, fields).and_then(value_as_f64)
}

fn number(item: &Value, fields: &[&str]) -> f64 {
  optional_number(item, fields).unwrap_or(0.0)
}

fn color(item: &Value, index: usize) -> String {
  optional_text(item, &["color"])
    .filter(|c| !c.is_empty())
    .unwrap_or_else(|| FALLBACK_PALETTE[index % FALLBACK_PALETTE.len()].to_string())
}

fn value_as_string(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

fn value_as_f64(value: &Value) -> Option<f64> {
  value
    .as_f64()
    .or_else(|| value.as_str().and_then(|raw| raw.trim().parse::<f64>().ok()))
}
