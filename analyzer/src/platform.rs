use async_trait::async_trait;
use shared_models::{error::Result, Account, PostPage};
use std::fmt;

/// Post feeds the analyzer reads from the social platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    /// Posts authored by the account.
    Authored,
    /// Posts mentioning the account.
    Mentions,
    /// Posts the account has liked. Needs the elevated user-context credential.
    Liked,
}

impl Feed {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feed::Authored => "authored",
            Feed::Mentions => "mentions",
            Feed::Liked => "liked",
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub max_results: usize,
    pub pagination_token: Option<String>,
    pub exclude_reshares: bool,
}

impl PageRequest {
    pub fn first(max_results: usize) -> Self {
        Self {
            max_results,
            ..Default::default()
        }
    }
}

/// Narrow contract the core needs from the platform. Throttling lives behind it.
#[async_trait]
pub trait SocialPlatform: Send + Sync {
    async fn resolve_username(&self, username: &str) -> Result<Account>;

    /// Accounts for the given ids. Ids the platform no longer knows are absent.
    async fn lookup_accounts(&self, ids: &[String]) -> Result<Vec<Account>>;

    async fn fetch_page(&self, feed: Feed, user_id: &str, request: PageRequest) -> Result<PostPage>;

    /// Whether the credential for `Feed::Liked` is available.
    fn supports_likes(&self) -> bool;
}
