//! Scripted platform used by unit tests.

use async_trait::async_trait;
use shared_models::{
    error::{ModelError, Result},
    Account, Post, PostMetrics, PostPage, PostReference, ReferenceKind,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::platform::{Feed, PageRequest, SocialPlatform};

type PageQueue = VecDeque<Result<PostPage>>;

#[derive(Default)]
pub struct ScriptedPlatform {
    accounts: Vec<Account>,
    pages: Mutex<HashMap<(Feed, Option<String>), PageQueue>>,
    requests: Mutex<Vec<(Feed, String, PageRequest)>>,
    likes: bool,
    lookup_down: bool,
}

impl ScriptedPlatform {
    pub fn with_account(mut self, id: &str, username: &str) -> Self {
        self.accounts.push(account(id, username));
        self
    }

    pub fn with_likes(mut self) -> Self {
        self.likes = true;
        self
    }

    /// Account lookups fail with a 503.
    pub fn with_lookup_down(mut self) -> Self {
        self.lookup_down = true;
        self
    }

    /// Pages served for `feed` regardless of the requested user.
    pub fn with_pages(self, feed: Feed, pages: Vec<Result<PostPage>>) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert((feed, None), pages.into());
        self
    }

    pub fn with_user_pages(self, feed: Feed, user_id: &str, pages: Vec<Result<PostPage>>) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert((feed, Some(user_id.to_string())), pages.into());
        self
    }

    pub fn requested_tokens(&self, feed: Feed) -> Vec<Option<String>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(f, _, _)| *f == feed)
            .map(|(_, _, r)| r.pagination_token.clone())
            .collect()
    }

    pub fn requests_for(&self, feed: Feed, user_id: &str) -> Vec<PageRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(f, u, _)| *f == feed && u == user_id)
            .map(|(_, _, r)| r.clone())
            .collect()
    }
}

#[async_trait]
impl SocialPlatform for ScriptedPlatform {
    async fn resolve_username(&self, username: &str) -> Result<Account> {
        self.accounts
            .iter()
            .find(|a| a.username == username)
            .cloned()
            .ok_or_else(|| ModelError::NotFound(format!("@{}", username)))
    }

    async fn lookup_accounts(&self, ids: &[String]) -> Result<Vec<Account>> {
        if self.lookup_down {
            return Err(ModelError::Api {
                status: 503,
                message: "over capacity".to_string(),
            });
        }
        Ok(ids
            .iter()
            .filter_map(|id| self.accounts.iter().find(|a| &a.id == id).cloned())
            .collect())
    }

    async fn fetch_page(&self, feed: Feed, user_id: &str, request: PageRequest) -> Result<PostPage> {
        self.requests
            .lock()
            .unwrap()
            .push((feed, user_id.to_string(), request));

        let mut pages = self.pages.lock().unwrap();
        let user_key = (feed, Some(user_id.to_string()));
        let key = if pages.contains_key(&user_key) {
            user_key
        } else {
            (feed, None)
        };
        pages
            .get_mut(&key)
            .and_then(|q| q.pop_front())
            .unwrap_or_else(|| Ok(PostPage::default()))
    }

    fn supports_likes(&self) -> bool {
        self.likes
    }
}

pub fn account(id: &str, username: &str) -> Account {
    Account {
        id: id.to_string(),
        username: username.to_string(),
        name: username.to_uppercase(),
        followers_count: Some(1_000),
        description: String::new(),
    }
}

pub fn post(id: &str, author_id: &str) -> Post {
    Post {
        id: id.to_string(),
        author_id: Some(author_id.to_string()),
        text: format!("post {}", id),
        created_at: None,
        lang: Some("en".to_string()),
        metrics: PostMetrics::default(),
        references: Vec::new(),
        in_reply_to_user_id: None,
    }
}

pub fn reply(id: &str, author_id: &str, to_user: Option<&str>) -> Post {
    Post {
        references: vec![PostReference {
            kind: ReferenceKind::RepliedTo,
            post_id: format!("parent-{}", id),
        }],
        in_reply_to_user_id: to_user.map(str::to_string),
        ..post(id, author_id)
    }
}

pub fn referencing(id: &str, author_id: &str, kind: ReferenceKind, target_post: &str) -> Post {
    Post {
        references: vec![PostReference {
            kind,
            post_id: target_post.to_string(),
        }],
        ..post(id, author_id)
    }
}

pub fn with_metrics(mut post: Post, likes: u64, reshares: u64) -> Post {
    post.metrics.like_count = likes;
    post.metrics.retweet_count = reshares;
    post
}
