use serde::Deserialize;
use shared_models::error::{ModelError, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::interactions::GraphSettings;

mod defaults {
    pub const TOP_N_USERS: usize = 20;
    pub const TOP_N_TWEETS: usize = 3;
    pub const CACHE_TTL_HOURS: f64 = 24.0;
    pub const MAX_OWN_TWEETS: usize = 800;
    pub const MAX_MENTIONS: usize = 800;
    pub const MAX_LIKED: usize = 1000;
    pub const PAGE_SIZE: usize = 100;
    pub const PAGE_DELAY_MS: u64 = 500;
    pub const PARTNER_FETCH_LIMIT: usize = 100;
    pub const PARTNER_DELAY_MS: u64 = 1000;
    pub const MAX_THROTTLE_WAITS: u32 = 5;
    pub const CACHE_DIR: &str = ".cache";
    pub const OUTPUT_DIR: &str = "output";
    pub const TWITTER_API_BASE: &str = "https://api.twitter.com";
    pub const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
    pub const PARTNER_MODEL: &str = "claude-sonnet-4-5";
    pub const SYNTHESIS_MODEL: &str = "claude-opus-4-1";
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub twitter_bearer_token: String,
    /// User-context token for the liked-posts feed. Absent disables that signal.
    pub twitter_user_access_token: Option<String>,
    pub anthropic_api_key: String,
    pub target_username: String,
    pub top_n_users: usize,
    pub top_n_posts: usize,
    pub cache_ttl_hours: f64,
    pub max_own_posts: usize,
    pub max_mentions: usize,
    pub max_liked: usize,
    pub page_size: usize,
    pub page_delay_ms: u64,
    pub partner_fetch_limit: usize,
    pub partner_delay_ms: u64,
    pub max_throttle_waits: u32,
    pub cache_dir: PathBuf,
    pub output_dir: PathBuf,
    pub twitter_api_base: String,
    pub anthropic_api_base: String,
    pub partner_model: String,
    pub synthesis_model: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| {
                    ModelError::Config(format!(
                        "Required environment variable '{}' is not set. \
                         Copy .env.example to .env and fill in your credentials.",
                        key
                    ))
                })
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let string_or = |key: &str, default: &str| {
            optional(key).unwrap_or_else(|| default.to_string())
        };

        Ok(Config {
            twitter_bearer_token: required("TWITTER_BEARER_TOKEN")?,
            twitter_user_access_token: optional("TWITTER_USER_ACCESS_TOKEN"),
            anthropic_api_key: required("ANTHROPIC_API_KEY")?,
            target_username: normalize_handle(&required("TARGET_USERNAME")?),
            top_n_users: parse_or(&lookup, "TOP_N_USERS", defaults::TOP_N_USERS)?,
            top_n_posts: parse_or(&lookup, "TOP_N_TWEETS", defaults::TOP_N_TWEETS)?,
            cache_ttl_hours: parse_or(&lookup, "CACHE_TTL_HOURS", defaults::CACHE_TTL_HOURS)?,
            max_own_posts: parse_or(&lookup, "MAX_OWN_TWEETS", defaults::MAX_OWN_TWEETS)?,
            max_mentions: parse_or(&lookup, "MAX_MENTIONS", defaults::MAX_MENTIONS)?,
            max_liked: parse_or(&lookup, "MAX_LIKED", defaults::MAX_LIKED)?,
            page_size: parse_or(&lookup, "PAGE_SIZE", defaults::PAGE_SIZE)?,
            page_delay_ms: parse_or(&lookup, "PAGE_DELAY_MS", defaults::PAGE_DELAY_MS)?,
            partner_fetch_limit: parse_or(
                &lookup,
                "PARTNER_FETCH_LIMIT",
                defaults::PARTNER_FETCH_LIMIT,
            )?,
            partner_delay_ms: parse_or(&lookup, "PARTNER_DELAY_MS", defaults::PARTNER_DELAY_MS)?,
            max_throttle_waits: parse_or(
                &lookup,
                "MAX_THROTTLE_WAITS",
                defaults::MAX_THROTTLE_WAITS,
            )?,
            cache_dir: PathBuf::from(string_or("CACHE_DIR", defaults::CACHE_DIR)),
            output_dir: PathBuf::from(string_or("OUTPUT_DIR", defaults::OUTPUT_DIR)),
            twitter_api_base: string_or("TWITTER_API_BASE", defaults::TWITTER_API_BASE),
            anthropic_api_base: string_or("ANTHROPIC_API_BASE", defaults::ANTHROPIC_API_BASE),
            partner_model: string_or("PARTNER_MODEL", defaults::PARTNER_MODEL),
            synthesis_model: string_or("SYNTHESIS_MODEL", defaults::SYNTHESIS_MODEL),
        })
    }

    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn validate(self) -> Result<Self> {
        macro_rules! ensure {
            ($cond:expr, $msg:literal) => {
                if !$cond {
                    return Err(ModelError::Config($msg.into()));
                }
            };
        }

        ensure!(!self.twitter_bearer_token.is_empty(), "twitter_bearer_token missing");
        ensure!(!self.anthropic_api_key.is_empty(), "anthropic_api_key missing");
        ensure!(!self.target_username.is_empty(), "target_username missing");
        ensure!(self.top_n_users >= 1, "top_n_users must be >= 1");
        ensure!(self.top_n_posts >= 1, "top_n_posts must be >= 1");
        ensure!(
            self.page_size >= 1 && self.page_size <= 100,
            "page_size must be in 1..=100"
        );
        ensure!(
            self.partner_fetch_limit >= 5 && self.partner_fetch_limit <= 100,
            "partner_fetch_limit must be in 5..=100"
        );
        ensure!(
            self.cache_ttl_hours > 0.0 && self.cache_ttl_hours.is_finite(),
            "cache_ttl_hours must be > 0"
        );

        Ok(self)
    }

    pub fn likes_enabled(&self) -> bool {
        self.twitter_user_access_token.is_some()
    }

    pub fn graph_settings(&self) -> GraphSettings {
        GraphSettings {
            page_size: self.page_size,
            page_delay: Duration::from_millis(self.page_delay_ms),
            max_own_posts: self.max_own_posts,
            max_mentions: self.max_mentions,
            max_liked: self.max_liked,
        }
    }

    pub fn partner_delay(&self) -> Duration {
        Duration::from_millis(self.partner_delay_ms)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            ModelError::Config(format!("Invalid value for {}: '{}'", key, raw))
        }),
        None => Ok(default),
    }
}

fn normalize_handle(handle: &str) -> String {
    handle.trim().trim_start_matches('@').to_string()
}
