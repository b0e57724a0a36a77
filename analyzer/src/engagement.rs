//! Engagement score for a single post.
//!
//! Weights, strongest signal first:
//! - Reshare (3.0): carries the post outside the author's own audience
//! - Quote (2.5): distribution plus new commentary
//! - Reply (1.5): engagement, sometimes controversy
//! - Like (1.0): low-friction, high-volume baseline
//! - Impression (0.01): raw reach, scaled down so it never outweighs interactions

use shared_models::PostMetrics;

pub const RESHARE_WEIGHT: f64 = 3.0;
pub const QUOTE_WEIGHT: f64 = 2.5;
pub const LIKE_WEIGHT: f64 = 1.0;
pub const REPLY_WEIGHT: f64 = 1.5;
pub const IMPRESSION_WEIGHT: f64 = 0.01;

pub fn engagement_score(metrics: &PostMetrics) -> f64 {
    metrics.retweet_count as f64 * RESHARE_WEIGHT
        + metrics.quote_count as f64 * QUOTE_WEIGHT
        + metrics.like_count as f64 * LIKE_WEIGHT
        + metrics.reply_count as f64 * REPLY_WEIGHT
        + metrics.impression_count as f64 * IMPRESSION_WEIGHT
}
