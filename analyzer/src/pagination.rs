use shared_models::{error::Result, PostPage};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::platform::{Feed, PageRequest, SocialPlatform};

/// Finite sequence of pages for one feed.
///
/// Never yields more than `max_items` posts in total, sleeps `page_delay` after
/// every page, and ends as soon as the upstream stops returning a fresh
/// continuation token. A failed fetch is yielded once and ends the sequence.
pub struct Paginator<'a, P: SocialPlatform + ?Sized> {
    platform: &'a P,
    feed: Feed,
    user_id: String,
    page_size: usize,
    max_items: usize,
    page_delay: Duration,
    next_token: Option<String>,
    seen_tokens: HashSet<String>,
    scanned: usize,
    pages: usize,
    finished: bool,
}

impl<'a, P: SocialPlatform + ?Sized> Paginator<'a, P> {
    pub fn new(
        platform: &'a P,
        feed: Feed,
        user_id: &str,
        page_size: usize,
        max_items: usize,
        page_delay: Duration,
    ) -> Self {
        Self {
            platform,
            feed,
            user_id: user_id.to_string(),
            page_size,
            max_items,
            page_delay,
            next_token: None,
            seen_tokens: HashSet::new(),
            scanned: 0,
            pages: 0,
            finished: max_items == 0 || page_size == 0,
        }
    }

    pub async fn next_page(&mut self) -> Option<Result<PostPage>> {
        if self.finished || self.scanned >= self.max_items {
            return None;
        }

        let request = PageRequest {
            max_results: self.page_size,
            pagination_token: self.next_token.clone(),
            exclude_reshares: false,
        };

        let mut page = match self
            .platform
            .fetch_page(self.feed, &self.user_id, request)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                self.finished = true;
                return Some(Err(e));
            }
        };

        let remaining = self.max_items - self.scanned;
        page.posts.truncate(remaining);
        self.scanned += page.posts.len();
        self.pages += 1;

        match page.next_token.as_deref() {
            _ if page.posts.is_empty() => self.finished = true,
            Some(token) if self.seen_tokens.insert(token.to_string()) => {
                self.next_token = Some(token.to_string());
            }
            Some(token) => {
                warn!(
                    feed = %self.feed,
                    token,
                    "Upstream repeated a pagination token, stopping"
                );
                self.finished = true;
            }
            None => self.finished = true,
        }

        debug!(
            feed = %self.feed,
            page = self.pages,
            items = page.posts.len(),
            scanned = self.scanned,
            "Fetched page"
        );

        if !self.page_delay.is_zero() {
            sleep(self.page_delay).await;
        }

        Some(Ok(page))
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn scanned(&self) -> usize {
        self.scanned
    }
}
