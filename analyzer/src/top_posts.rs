use shared_models::{Post, ScoredPost};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::engagement::engagement_score;
use crate::platform::{Feed, PageRequest, SocialPlatform};

/// Scores posts and keeps the best `k`, reshares excluded.
///
/// Equal scores keep their input order.
pub fn select_top_posts(posts: Vec<Post>, k: usize) -> Vec<ScoredPost> {
    let mut scored: Vec<ScoredPost> = posts
        .into_iter()
        .filter(|p| !p.is_reshare())
        .map(|p| {
            let score = engagement_score(&p.metrics);
            ScoredPost::new(p, score)
        })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(k);
    scored
}

/// Fetches one page of a partner's recent posts and returns the top `k`.
///
/// Failures are logged and yield an empty list; the caller decides how to
/// report a partner without posts. `delay` runs after the fetch either way.
pub async fn fetch_top_posts<P: SocialPlatform + ?Sized>(
    platform: &P,
    user_id: &str,
    k: usize,
    fetch_limit: usize,
    delay: Duration,
) -> Vec<ScoredPost> {
    let request = PageRequest {
        max_results: fetch_limit,
        pagination_token: None,
        exclude_reshares: true,
    };

    let result = platform.fetch_page(Feed::Authored, user_id, request).await;

    if !delay.is_zero() {
        sleep(delay).await;
    }

    match result {
        Ok(page) => {
            let fetched = page.posts.len();
            let top = select_top_posts(page.posts, k);
            debug!(user_id, fetched, kept = top.len(), "Scored partner posts");
            top
        }
        Err(e) if e.is_degradable() => {
            warn!(user_id, error = %e, "Could not fetch partner posts");
            Vec::new()
        }
        Err(e) => {
            error!(user_id, error = %e, "Partner post fetch failed");
            Vec::new()
        }
    }
}
