use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub mod error;

const PERMALINK_BASE: &str = "https://twitter.com/i/web/status";

// Accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub name: String,
    pub followers_count: Option<u64>,
    #[serde(default)]
    pub description: String,
}

impl Account {
    /// Stand-in for an account whose profile could not be fetched.
    pub fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            username: id.to_string(),
            name: id.to_string(),
            followers_count: None,
            description: String::new(),
        }
    }
}

// Posts

/// Public counters attached to a post. Counters the platform omits are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostMetrics {
    pub retweet_count: u64,
    pub quote_count: u64,
    pub like_count: u64,
    pub reply_count: u64,
    pub impression_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    RepliedTo,
    Quoted,
    Reshared,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostReference {
    pub kind: ReferenceKind,
    pub post_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub author_id: Option<String>,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
    pub lang: Option<String>,
    #[serde(default)]
    pub metrics: PostMetrics,
    #[serde(default)]
    pub references: Vec<PostReference>,
    pub in_reply_to_user_id: Option<String>,
}

impl Post {
    /// The first reference decides how the post is classified.
    pub fn primary_reference(&self) -> Option<&PostReference> {
        self.references.first()
    }

    pub fn is_reshare(&self) -> bool {
        self.references
            .iter()
            .any(|r| r.kind == ReferenceKind::Reshared)
    }

    pub fn permalink(&self) -> String {
        permalink(&self.id)
    }
}

pub fn permalink(post_id: &str) -> String {
    format!("{}/{}", PERMALINK_BASE, post_id)
}

/// One page of a paginated post feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostPage {
    pub posts: Vec<Post>,
    /// Side-loaded referenced posts: post id -> author id.
    #[serde(default)]
    pub referenced_authors: HashMap<String, String>,
    pub next_token: Option<String>,
}

impl PostPage {
    pub fn referenced_author(&self, post_id: &str) -> Option<&str> {
        self.referenced_authors.get(post_id).map(String::as_str)
    }
}

// Interaction events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Original,
    Reply,
    Quote,
    Reshare,
    Mention,
    Like,
}

impl InteractionKind {
    pub fn weight(&self) -> u64 {
        match self {
            InteractionKind::Original => 0,
            InteractionKind::Reply => 4,
            InteractionKind::Quote => 3,
            InteractionKind::Reshare => 2,
            InteractionKind::Mention => 1,
            InteractionKind::Like => 1,
        }
    }

    /// Kinds that point at another post and therefore expect a counterpart.
    pub fn is_referencing(&self) -> bool {
        matches!(
            self,
            InteractionKind::Reply | InteractionKind::Quote | InteractionKind::Reshare
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Original => "original",
            InteractionKind::Reply => "reply",
            InteractionKind::Quote => "quote",
            InteractionKind::Reshare => "reshare",
            InteractionKind::Mention => "mention",
            InteractionKind::Like => "like",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionEvent {
    pub kind: InteractionKind,
    pub counterpart: Option<String>,
}

impl InteractionEvent {
    pub fn new(kind: InteractionKind, counterpart: Option<String>) -> Self {
        Self { kind, counterpart }
    }

    pub fn weight(&self) -> u64 {
        self.kind.weight()
    }
}

// Ranked output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPost {
    pub id: String,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
    pub lang: Option<String>,
    pub metrics: PostMetrics,
    pub score: f64,
    pub url: String,
}

impl ScoredPost {
    pub fn new(post: Post, score: f64) -> Self {
        let url = post.permalink();
        Self {
            id: post.id,
            text: post.text,
            created_at: post.created_at,
            lang: post.lang,
            metrics: post.metrics,
            score,
            url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPartner {
    /// 1-based position in the final partner list.
    pub rank: usize,
    pub account: Account,
    pub interaction_score: u64,
    pub top_posts: Vec<ScoredPost>,
}

impl RankedPartner {
    pub fn has_posts(&self) -> bool {
        !self.top_posts.is_empty()
    }
}

// AI analysis payloads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartnerAnalysis {
    pub user_handle: String,
    pub patterns: Vec<String>,
    pub tone: String,
    pub content_types: Vec<String>,
    pub hook_analysis: String,
    pub best_practices: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tactic {
    pub tactic: String,
    pub rationale: String,
    pub example: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkStrategy {
    pub common_patterns: Vec<String>,
    pub top_tactics: Vec<Tactic>,
    pub tone_spectrum: String,
    pub content_mix_recommendation: String,
    pub overall_summary: String,
}

/// Outcome of one summarizer call. Failures are carried as values, never raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Analysis<T> {
    Structured(T),
    Unparsed { raw_response: String },
    Failed { error: String },
}

impl<T> Analysis<T> {
    pub fn structured(&self) -> Option<&T> {
        match self {
            Analysis::Structured(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Analysis::Structured(_))
    }
}

/// Per-partner analysis tagged with the handle it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerReview {
    pub account_id: String,
    pub username: String,
    pub analysis: Analysis<PartnerAnalysis>,
}
