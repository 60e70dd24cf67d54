//! Facebook and Instagram panels.

use super::table::{bars, table};
use crate::ui::renderfns::format_number;
use ratatui::text::Line;
use skyintel::normalize::{FacebookDataset, InstagramDataset};

pub fn facebook_lines(data: &FacebookDataset) -> Vec<Line<'static>> {
  let mut lines = table(
    "Engagement",
    &[
      ("Date", 12),
      ("Reach", 10),
      ("Likes", 8),
      ("Comments", 9),
      ("Shares", 8),
    ],
    data
      .engagement_data
      .iter()
      .map(|p| {
        vec![
          p.date.clone(),
          format_number(p.reach),
          format_number(p.likes),
          format_number(p.comments),
          format_number(p.shares),
        ]
      })
      .collect(),
  );

  lines.extend(bars(
    "Audience by age",
    data
      .audience_insights
      .iter()
      .map(|a| (a.age.clone(), a.percentage, a.color.clone()))
      .collect(),
    "%",
  ));

  lines.extend(table(
    "Top posts",
    &[
      ("Post", 36),
      ("Type", 8),
      ("Reach", 10),
      ("Engagement", 10),
      ("Rate", 7),
    ],
    data
      .top_posts
      .iter()
      .map(|p| {
        vec![
          p.content.clone(),
          p.post_type.clone(),
          format_number(p.reach),
          format_number(p.engagement),
          format!("{:.1}%", p.engagement_rate),
        ]
      })
      .collect(),
  ));

  lines.extend(table(
    "Content types",
    &[("Type", 14), ("Posts", 7), ("Engagement", 10)],
    data
      .content_types
      .iter()
      .map(|c| {
        vec![
          c.name.clone(),
          format_number(c.posts),
          format_number(c.engagement),
        ]
      })
      .collect(),
  ));

  lines
}

pub fn instagram_lines(data: &InstagramDataset) -> Vec<Line<'static>> {
  let mut lines = table(
    "Follower growth",
    &[
      ("Week", 10),
      ("Followers", 10),
      ("Posts", 7),
      ("Engagement", 10),
    ],
    data
      .growth_data
      .iter()
      .map(|g| {
        vec![
          g.week.clone(),
          format_number(g.followers),
          format_number(g.posts),
          format_number(g.engagement),
        ]
      })
      .collect(),
  );

  lines.extend(table(
    "Content performance",
    &[
      ("Type", 10),
      ("Posts", 7),
      ("Avg likes", 10),
      ("Avg comments", 12),
      ("Avg views", 10),
    ],
    data
      .content_performance
      .iter()
      .map(|c| {
        vec![
          c.content_type.clone(),
          format_number(c.posts),
          format_number(c.avg_likes),
          format_number(c.avg_comments),
          format_number(c.avg_views),
        ]
      })
      .collect(),
  ));

  lines.extend(table(
    "Hashtags",
    &[("Hashtag", 20), ("Reach", 10), ("Impressions", 11)],
    data
      .hashtag_performance
      .iter()
      .map(|h| {
        vec![
          h.hashtag.clone(),
          format_number(h.reach),
          format_number(h.impressions),
        ]
      })
      .collect(),
  ));

  lines.extend(table(
    "Audience activity",
    &[("Hour", 8), ("Activity", 9)],
    data
      .audience_activity
      .iter()
      .map(|a| vec![a.hour.clone(), format_number(a.activity)])
      .collect(),
  ));

  lines.extend(bars(
    "Story metrics",
    data
      .story_metrics
      .iter()
      .map(|s| (s.name.clone(), s.value, s.color.clone()))
      .collect(),
    "",
  ));

  lines
}
