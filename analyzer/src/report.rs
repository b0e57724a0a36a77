use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_models::{
    error::Result, Account, Analysis, NetworkStrategy, PartnerAnalysis, PartnerReview,
    RankedPartner, ScoredPost,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::interactions::{InteractionGraph, SignalOutcome, SignalStatus};

const FILE_TIMESTAMP: &str = "%Y%m%dT%H%M%SZ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerSection {
    pub rank: usize,
    pub account_id: String,
    pub username: String,
    pub name: String,
    pub interaction_score: u64,
    pub followers: Option<u64>,
    pub top_posts: Vec<ScoredPost>,
    /// `None` when the partner had no posts to analyse.
    pub analysis: Option<Analysis<PartnerAnalysis>>,
}

impl PartnerSection {
    pub fn has_posts(&self) -> bool {
        !self.top_posts.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementReport {
    pub generated_at: DateTime<Utc>,
    pub target_user: String,
    pub partners: Vec<PartnerSection>,
    pub network_strategy: Analysis<NetworkStrategy>,
    pub signals: Vec<SignalOutcome>,
    pub dropped_events: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub json: PathBuf,
    pub markdown: PathBuf,
}

impl EngagementReport {
    /// Joins ranked partners with their reviews by account id, keeping rank order.
    pub fn assemble(
        target: &Account,
        partners: Vec<RankedPartner>,
        mut reviews: Vec<PartnerReview>,
        network_strategy: Analysis<NetworkStrategy>,
        graph: &InteractionGraph,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let partners = partners
            .into_iter()
            .map(|partner| {
                let analysis = reviews
                    .iter()
                    .position(|r| r.account_id == partner.account.id)
                    .map(|i| reviews.swap_remove(i).analysis);
                PartnerSection {
                    rank: partner.rank,
                    account_id: partner.account.id,
                    username: partner.account.username,
                    name: partner.account.name,
                    interaction_score: partner.interaction_score,
                    followers: partner.account.followers_count,
                    top_posts: partner.top_posts,
                    analysis,
                }
            })
            .collect();

        Self {
            generated_at,
            target_user: format!("@{}", target.username),
            partners,
            network_strategy,
            signals: graph.signals.clone(),
            dropped_events: graph.dropped_events,
        }
    }

    /// Writes `report_<timestamp>.json` and `.md` into `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<ReportPaths> {
        fs::create_dir_all(dir)?;
        let stamp = self.generated_at.format(FILE_TIMESTAMP);
        let paths = ReportPaths {
            json: dir.join(format!("report_{}.json", stamp)),
            markdown: dir.join(format!("report_{}.md", stamp)),
        };

        fs::write(&paths.json, serde_json::to_string_pretty(self)?)?;
        fs::write(&paths.markdown, self.to_markdown())?;

        info!(
            json = %paths.json.display(),
            markdown = %paths.markdown.display(),
            "📄 Report written"
        );
        Ok(paths)
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        push_line(&mut out, &format!("# Twitter Engagement Analysis: {}", self.target_user));
        push_line(
            &mut out,
            &format!("_Generated {}_\n", self.generated_at.format(FILE_TIMESTAMP)),
        );
        out.push_str("---\n\n");

        render_strategy(&mut out, &self.network_strategy);
        out.push_str("---\n\n");

        push_line(
            &mut out,
            &format!("## Top {} Interaction Partners\n", self.partners.len()),
        );
        for partner in &self.partners {
            render_partner(&mut out, partner);
            out.push_str("---\n\n");
        }

        render_coverage(&mut out, &self.signals, self.dropped_events);
        out
    }
}

fn render_strategy(out: &mut String, strategy: &Analysis<NetworkStrategy>) {
    out.push_str("## Overall Strategy & Key Learnings\n\n");
    match strategy {
        Analysis::Structured(s) => {
            if !s.overall_summary.is_empty() {
                push_line(out, &format!("{}\n", s.overall_summary));
            }
            if !s.top_tactics.is_empty() {
                out.push_str("### Top Tactics to Adopt\n\n");
                for (i, t) in s.top_tactics.iter().enumerate() {
                    push_line(out, &format!("**{}. {}**", i + 1, t.tactic));
                    push_line(out, &format!("- Rationale: {}", t.rationale));
                    push_line(out, &format!("- Example: _{}_\n", t.example));
                }
            }
            if !s.common_patterns.is_empty() {
                out.push_str("### Common Patterns\n\n");
                push_bullets(out, &s.common_patterns);
            }
            if !s.tone_spectrum.is_empty() {
                push_line(out, &format!("**Tone spectrum:** {}\n", s.tone_spectrum));
            }
            if !s.content_mix_recommendation.is_empty() {
                push_line(
                    out,
                    &format!(
                        "**Content mix recommendation:** {}\n",
                        s.content_mix_recommendation
                    ),
                );
            }
        }
        other => render_fallback(out, other),
    }
}

fn render_partner(out: &mut String, partner: &PartnerSection) {
    let followers = partner
        .followers
        .map(with_thousands)
        .unwrap_or_else(|| "N/A".to_string());
    push_line(
        out,
        &format!("### {}. @{} ({})", partner.rank, partner.username, partner.name),
    );
    push_line(
        out,
        &format!(
            "_Interaction score: {} | Followers: {}_\n",
            partner.interaction_score, followers
        ),
    );

    if !partner.has_posts() {
        out.push_str("_No posts available._\n\n");
        return;
    }

    match &partner.analysis {
        Some(Analysis::Structured(a)) => {
            if !a.hook_analysis.is_empty() {
                push_line(out, &format!("**Hook style:** {}\n", a.hook_analysis));
            }
            if !a.tone.is_empty() {
                push_line(out, &format!("**Tone:** {}\n", a.tone));
            }
            if !a.content_types.is_empty() {
                push_line(
                    out,
                    &format!("**Content types:** {}\n", a.content_types.join(", ")),
                );
            }
            if !a.patterns.is_empty() {
                out.push_str("**Patterns:**\n");
                push_bullets(out, &a.patterns);
            }
            if !a.best_practices.is_empty() {
                out.push_str("**Best practices:**\n");
                push_bullets(out, &a.best_practices);
            }
        }
        Some(other) => render_fallback(out, other),
        None => {}
    }

    for (i, post) in partner.top_posts.iter().enumerate() {
        let m = &post.metrics;
        push_line(out, &format!("#### Post {} (score {:.0})", i + 1, post.score));
        push_line(out, &format!("> {}\n", post.text.replace('\n', " ")));
        push_line(
            out,
            &format!(
                "Likes: {} | Reshares: {} | Replies: {} | Quotes: {}",
                m.like_count, m.retweet_count, m.reply_count, m.quote_count
            ),
        );
        push_line(out, &format!("[View post]({})\n", post.url));
    }
}

fn render_fallback<T>(out: &mut String, analysis: &Analysis<T>) {
    match analysis {
        Analysis::Unparsed { raw_response } => {
            out.push_str("**Analysis (unparsed model output):**\n\n```\n");
            out.push_str(raw_response.trim());
            out.push_str("\n```\n\n");
        }
        Analysis::Failed { error } => {
            push_line(out, &format!("_Analysis unavailable: {}_\n", error));
        }
        Analysis::Structured(_) => {}
    }
}

fn render_coverage(out: &mut String, signals: &[SignalOutcome], dropped_events: usize) {
    out.push_str("## Data Coverage\n\n");
    for s in signals {
        let status = match &s.status {
            SignalStatus::Complete => "complete".to_string(),
            SignalStatus::Degraded { reason } => format!("degraded ({})", reason),
            SignalStatus::Skipped { reason } => format!("skipped ({})", reason),
        };
        push_line(
            out,
            &format!(
                "- {}: {}, {} items over {} pages, weight {}",
                s.signal, status, s.items_scanned, s.pages, s.contributed
            ),
        );
    }
    push_line(out, &format!("- Unattributed events: {}", dropped_events));
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

fn push_bullets(out: &mut String, items: &[String]) {
    for item in items {
        push_line(out, &format!("- {}", item));
    }
    out.push('\n');
}

pub fn with_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
