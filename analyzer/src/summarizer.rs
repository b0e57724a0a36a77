use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared_models::{
    error::{ModelError, Result},
    Account, Analysis, NetworkStrategy, PartnerAnalysis, PartnerReview, ScoredPost,
};
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::config::Config;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const PARTNER_MAX_TOKENS: u32 = 1024;
const SYNTHESIS_MAX_TOKENS: u32 = 2048;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const PARTNER_SYSTEM: &str = r#"You are a social media growth analyst specialising in Twitter/X engagement.
You will receive one account's profile and its highest-engagement posts.
Explain briefly why each post performed well and extract 3-5 tactics someone else could reuse.

Respond with JSON only, no markdown fences, using exactly these keys:
{
  "user_handle": "string",
  "patterns": ["engagement patterns observed"],
  "tone": "short description of the writing tone",
  "content_types": ["content types used, e.g. opinion, thread, question, story"],
  "hook_analysis": "how the first line earns attention",
  "best_practices": ["3-5 actionable practices drawn from these posts"]
}"#;

const SYNTHESIS_SYSTEM: &str = r#"You are a Twitter/X growth strategist.
You will receive engagement analyses for the accounts @{target} interacts with most.
Find the patterns shared across them, the content strategies that work best, and rank the 5 tactics @{target} should adopt first given what works in this network.

Respond with JSON only, no markdown fences, using exactly these keys:
{
  "common_patterns": ["patterns shared by several high-performing accounts"],
  "top_tactics": [
    {"tactic": "string", "rationale": "string", "example": "string"}
  ],
  "tone_spectrum": "range of tones that perform well in this network",
  "content_mix_recommendation": "recommended content mix for @{target}",
  "overall_summary": "2-3 paragraph narrative of the key learnings"
}"#;

/// Produces the qualitative parts of the report. Never fails; problems are
/// carried inside the returned `Analysis`.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn analyze_partner(&self, account: &Account, posts: &[ScoredPost]) -> Analysis<PartnerAnalysis>;

    async fn synthesize(&self, target: &str, reviews: &[PartnerReview]) -> Analysis<NetworkStrategy>;
}

/// Removes a surrounding markdown code fence (with or without a `json` tag).
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    match rest.find("```") {
        Some(end) => rest[..end].trim(),
        None => rest.trim(),
    }
}

/// Parses a model reply, keeping the raw text when it is not the expected JSON.
pub fn interpret<T: DeserializeOwned>(reply: &str) -> Analysis<T> {
    match serde_json::from_str(strip_code_fences(reply)) {
        Ok(value) => Analysis::Structured(value),
        Err(e) => {
            warn!(error = %e, "Model reply is not valid JSON, keeping raw text");
            Analysis::Unparsed {
                raw_response: reply.to_string(),
            }
        }
    }
}

pub fn partner_prompt(account: &Account, posts: &[ScoredPost]) -> String {
    let posts_block = posts
        .iter()
        .enumerate()
        .map(|(i, p)| {
            format!(
                "Post {} (engagement score {:.0}):\nText: {}\nLikes: {} | Reshares: {} | Replies: {} | Quotes: {}\nPosted: {}\nURL: {}",
                i + 1,
                p.score,
                p.text,
                p.metrics.like_count,
                p.metrics.retweet_count,
                p.metrics.reply_count,
                p.metrics.quote_count,
                p.created_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "unknown".to_string()),
                p.url,
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let followers = account
        .followers_count
        .map(|n| n.to_string())
        .unwrap_or_else(|| "N/A".to_string());

    format!(
        "User: @{} ({})\nFollowers: {}\n\nTop posts:\n{}\n\nAnalyse these posts. Return only valid JSON.",
        account.username, account.name, followers, posts_block
    )
}

pub fn synthesis_prompt(target: &str, reviews: &[PartnerReview]) -> Result<String> {
    let block = serde_json::to_string_pretty(reviews)?;
    Ok(format!(
        "Here are the analyses for @{}'s top interaction partners:\n\n{}\n\nSynthesise the cross-cutting insights. Return only valid JSON.",
        target, block
    ))
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

/// Anthropic Messages API client.
pub struct AnthropicClient {
    client: Client,
    base_url: String,
    api_key: String,
    partner_model: String,
    synthesis_model: String,
}

impl AnthropicClient {
    pub fn new(base_url: &str, api_key: &str, partner_model: &str, synthesis_model: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ModelError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            partner_model: partner_model.to_string(),
            synthesis_model: synthesis_model.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.anthropic_api_base,
            &config.anthropic_api_key,
            &config.partner_model,
            &config.synthesis_model,
        )
    }

    async fn complete(&self, model: &str, system: &str, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = MessagesRequest {
            model,
            max_tokens,
            system,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ModelError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: MessagesResponse = serde_json::from_str(&body)?;
        let text = parsed
            .content
            .into_iter()
            .next()
            .map(|block| block.text)
            .ok_or_else(|| ModelError::Api {
                status: status.as_u16(),
                message: "response carried no content".into(),
            })?;

        debug!(model, chars = text.len(), "Model reply received");
        Ok(text)
    }
}

#[async_trait]
impl Summarizer for AnthropicClient {
    async fn analyze_partner(&self, account: &Account, posts: &[ScoredPost]) -> Analysis<PartnerAnalysis> {
        let prompt = partner_prompt(account, posts);
        match self
            .complete(&self.partner_model, PARTNER_SYSTEM, &prompt, PARTNER_MAX_TOKENS)
            .await
        {
            Ok(reply) => interpret(&reply),
            Err(e) => {
                error!(user = %account.username, error = %e, "Partner analysis failed");
                Analysis::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn synthesize(&self, target: &str, reviews: &[PartnerReview]) -> Analysis<NetworkStrategy> {
        let system = SYNTHESIS_SYSTEM.replace("{target}", target);
        let result = match synthesis_prompt(target, reviews) {
            Ok(prompt) => {
                self.complete(&self.synthesis_model, &system, &prompt, SYNTHESIS_MAX_TOKENS)
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(reply) => interpret(&reply),
            Err(e) => {
                error!(target, error = %e, "Network synthesis failed");
                Analysis::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}
