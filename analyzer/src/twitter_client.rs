use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use shared_models::{
    error::{ModelError, Result},
    Account, Post, PostMetrics, PostPage, PostReference, ReferenceKind,
};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::Config;
use crate::platform::{Feed, PageRequest, SocialPlatform};

const USER_FIELDS: &str = "public_metrics,description";
const TWEET_FIELDS: &str =
    "created_at,public_metrics,referenced_tweets,author_id,in_reply_to_user_id,lang";
const EXPANSIONS: &str = "author_id,referenced_tweets.id,in_reply_to_user_id";
const LOOKUP_BATCH: usize = 100;
const RATE_LIMIT_RESET_HEADER: &str = "x-rate-limit-reset";
const FALLBACK_THROTTLE: Duration = Duration::from_secs(60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// Wire records, converted to domain records before leaving this module.

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    includes: Includes,
    #[serde(default)]
    meta: Meta,
}

#[derive(Debug, Default, Deserialize)]
struct Includes {
    #[serde(default)]
    tweets: Vec<RawTweet>,
}

#[derive(Debug, Default, Deserialize)]
struct Meta {
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    id: String,
    username: String,
    #[serde(default)]
    name: String,
    public_metrics: Option<RawUserMetrics>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUserMetrics {
    followers_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawTweet {
    id: String,
    #[serde(default)]
    text: String,
    author_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    lang: Option<String>,
    public_metrics: Option<PostMetrics>,
    #[serde(default)]
    referenced_tweets: Vec<RawReference>,
    in_reply_to_user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawReference {
    #[serde(rename = "type")]
    kind: String,
    id: String,
}

impl From<RawUser> for Account {
    fn from(raw: RawUser) -> Self {
        Account {
            id: raw.id,
            username: raw.username,
            name: raw.name,
            followers_count: raw.public_metrics.and_then(|m| m.followers_count),
            description: raw.description.unwrap_or_default(),
        }
    }
}

impl From<RawTweet> for Post {
    fn from(raw: RawTweet) -> Self {
        let references = raw
            .referenced_tweets
            .into_iter()
            .filter_map(|r| {
                let kind = match r.kind.as_str() {
                    "replied_to" => ReferenceKind::RepliedTo,
                    "quoted" => ReferenceKind::Quoted,
                    "retweeted" => ReferenceKind::Reshared,
                    _ => return None,
                };
                Some(PostReference { kind, post_id: r.id })
            })
            .collect();

        Post {
            id: raw.id,
            author_id: raw.author_id,
            text: raw.text,
            created_at: raw.created_at,
            lang: raw.lang,
            metrics: raw.public_metrics.unwrap_or_default(),
            references,
            in_reply_to_user_id: raw.in_reply_to_user_id,
        }
    }
}

impl From<Envelope<Vec<RawTweet>>> for PostPage {
    fn from(envelope: Envelope<Vec<RawTweet>>) -> Self {
        let referenced_authors = envelope
            .includes
            .tweets
            .into_iter()
            .filter_map(|t| t.author_id.map(|author| (t.id, author)))
            .collect();

        PostPage {
            posts: envelope
                .data
                .unwrap_or_default()
                .into_iter()
                .map(Post::from)
                .collect(),
            referenced_authors,
            next_token: envelope.meta.next_token,
        }
    }
}

/// How long to wait after a 429, given the reset header (epoch seconds) and now.
pub fn throttle_delay(reset_epoch: Option<i64>, now_epoch: i64) -> Duration {
    match reset_epoch {
        Some(reset) => Duration::from_secs((reset - now_epoch).max(0) as u64 + 1),
        None => FALLBACK_THROTTLE,
    }
}

/// X API v2 client.
pub struct TwitterClient {
    client: Client,
    base_url: String,
    bearer_token: String,
    user_token: Option<String>,
    max_throttle_waits: u32,
}

impl TwitterClient {
    pub fn new(
        base_url: &str,
        bearer_token: &str,
        user_token: Option<String>,
        max_throttle_waits: u32,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ModelError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token: bearer_token.to_string(),
            user_token,
            max_throttle_waits,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.twitter_api_base,
            &config.twitter_bearer_token,
            config.twitter_user_access_token.clone(),
            config.max_throttle_waits,
        )
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        token: &str,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut waits = 0;

        loop {
            let response = self
                .client
                .get(&url)
                .bearer_auth(token)
                .query(query)
                .send()
                .await
                .map_err(|e| ModelError::Network(e.to_string()))?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                if waits >= self.max_throttle_waits {
                    return Err(ModelError::RateLimited(waits));
                }
                let reset = response
                    .headers()
                    .get(RATE_LIMIT_RESET_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<i64>().ok());
                let delay = throttle_delay(reset, Utc::now().timestamp());
                waits += 1;
                warn!(
                    path,
                    wait_secs = delay.as_secs(),
                    attempt = waits,
                    "Rate limited, waiting for window reset"
                );
                sleep(delay).await;
                continue;
            }

            let body = response
                .text()
                .await
                .map_err(|e| ModelError::Network(e.to_string()))?;

            if status.is_success() {
                debug!(path, bytes = body.len(), "X API response");
                return Ok(serde_json::from_str(&body)?);
            }

            return Err(match status {
                StatusCode::UNAUTHORIZED => ModelError::Unauthorized(body),
                StatusCode::FORBIDDEN => ModelError::Forbidden(body),
                StatusCode::NOT_FOUND => ModelError::NotFound(body),
                other => ModelError::Api {
                    status: other.as_u16(),
                    message: body,
                },
            });
        }
    }
}

#[async_trait]
impl SocialPlatform for TwitterClient {
    async fn resolve_username(&self, username: &str) -> Result<Account> {
        let envelope: Envelope<RawUser> = self
            .get_json(
                &format!("/2/users/by/username/{}", username),
                &[("user.fields", USER_FIELDS.to_string())],
                &self.bearer_token,
            )
            .await?;

        envelope
            .data
            .map(Account::from)
            .ok_or_else(|| ModelError::NotFound(format!("@{}", username)))
    }

    async fn lookup_accounts(&self, ids: &[String]) -> Result<Vec<Account>> {
        let mut accounts = Vec::with_capacity(ids.len());
        for batch in ids.chunks(LOOKUP_BATCH) {
            let envelope: Envelope<Vec<RawUser>> = self
                .get_json(
                    "/2/users",
                    &[
                        ("ids", batch.join(",")),
                        ("user.fields", USER_FIELDS.to_string()),
                    ],
                    &self.bearer_token,
                )
                .await?;
            accounts.extend(envelope.data.unwrap_or_default().into_iter().map(Account::from));
        }
        Ok(accounts)
    }

    async fn fetch_page(&self, feed: Feed, user_id: &str, request: PageRequest) -> Result<PostPage> {
        let (path, min_results, token) = match feed {
            Feed::Authored => ("tweets", 5, self.bearer_token.as_str()),
            Feed::Mentions => ("mentions", 5, self.bearer_token.as_str()),
            Feed::Liked => (
                "liked_tweets",
                10,
                self.user_token.as_deref().ok_or_else(|| {
                    ModelError::Unauthorized("user-context credential not configured".into())
                })?,
            ),
        };

        let mut query = vec![
            (
                "max_results",
                request.max_results.clamp(min_results, 100).to_string(),
            ),
            ("tweet.fields", TWEET_FIELDS.to_string()),
            ("expansions", EXPANSIONS.to_string()),
        ];
        if let Some(token) = request.pagination_token {
            query.push(("pagination_token", token));
        }
        if request.exclude_reshares {
            query.push(("exclude", "retweets".to_string()));
        }

        let envelope: Envelope<Vec<RawTweet>> = self
            .get_json(&format!("/2/users/{}/{}", user_id, path), &query, token)
            .await?;
        Ok(envelope.into())
    }

    fn supports_likes(&self) -> bool {
        self.user_token.is_some()
    }
}
