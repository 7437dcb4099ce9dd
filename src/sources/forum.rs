use crate::orchestrator::FeedEntry;
use crate::sources::Activity;
use chrono::{DateTime, Utc};

/// Posts younger than this keep their full engagement score
const DEPRECIATE_AFTER_HOURS: f64 = 7.0;

/// Largest share of the engagement score removed by age
const MAX_DEPRECIATION: f64 = 0.9;

/// Hours after [`DEPRECIATE_AFTER_HOURS`] at which the maximum depreciation applies
const MAX_DEPRECIATION_AFTER_HOURS: f64 = 24.0;

/// A discussion post from a forum-like source
#[derive(Debug, Clone, PartialEq)]
pub struct ForumPost {
    pub id: String,
    pub title: String,
    pub description: String,
    pub discussion_url: String,
    pub target_url: String,
    pub target_url_domain: String,
    pub thumbnail_url: Option<String>,
    pub comment_count: u32,
    pub score: i64,
    pub engagement: f64,
    pub posted_at: DateTime<Utc>,
    pub tags: Vec<String>,
}

impl ForumPost {
    /// Link shown for the post: the target when it has one, else the discussion
    pub fn link(&self) -> &str {
        if self.target_url.is_empty() {
            &self.discussion_url
        } else {
            &self.target_url
        }
    }

    pub fn to_activity(&self) -> Activity {
        Activity {
            uid: self.id.clone(),
            title: self.title.clone(),
            body: self.description.clone(),
            url: self.link().to_string(),
            image_url: self.thumbnail_url.clone(),
            created_at: self.posted_at,
        }
    }
}

impl FeedEntry for ForumPost {
    fn identity(&self) -> &str {
        &self.id
    }

    fn published_at(&self) -> DateTime<Utc> {
        self.posted_at
    }
}

/// Scores every post by comments and score relative to the list average
///
/// Posts older than seven hours lose up to 90% of their score, reaching the
/// maximum 24 hours later.
pub fn calculate_engagement(posts: &mut [ForumPost], now: DateTime<Utc>) {
    if posts.is_empty() {
        return;
    }

    let count = posts.len() as f64;
    let average_comments = posts.iter().map(|p| f64::from(p.comment_count)).sum::<f64>() / count;
    let average_score = posts.iter().map(|p| p.score as f64).sum::<f64>() / count;

    for post in posts.iter_mut() {
        let comments = ratio(f64::from(post.comment_count), average_comments);
        let score = ratio(post.score as f64, average_score);
        post.engagement = (comments + score) / 2.0;

        let age_hours = (now - post.posted_at).num_seconds() as f64 / 3600.0;
        if age_hours < DEPRECIATE_AFTER_HOURS {
            continue;
        }

        let progress =
            ((age_hours - DEPRECIATE_AFTER_HOURS) / MAX_DEPRECIATION_AFTER_HOURS).min(1.0);
        post.engagement *= 1.0 - progress * MAX_DEPRECIATION;
    }
}

fn ratio(value: f64, average: f64) -> f64 {
    if average == 0.0 {
        0.0
    } else {
        value / average
    }
}

/// Stable sort, most engaging first
pub fn sort_by_engagement(posts: &mut [ForumPost]) {
    posts.sort_by(|a, b| b.engagement.total_cmp(&a.engagement));
}
