//! Weighted interaction graph for a tracked account.
//!
//! Signals, scanned one after another:
//! - Own timeline: replies (4), quotes (3) and reshares (2) authored by the account
//! - Mentions: posts mentioning the account (1 per post, to the author)
//! - Likes: posts the account liked (1 per post, to the author); needs the
//!   elevated credential and is skipped without it
//!
//! Each signal folds into its own map and is merged only if it completed, so a
//! degraded signal contributes nothing. The tracked account never appears in
//! the final map.

use serde::{Deserialize, Serialize};
use shared_models::{InteractionEvent, InteractionKind, Post, PostPage, ReferenceKind};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::pagination::Paginator;
use crate::platform::{Feed, SocialPlatform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    OwnTimeline,
    Mentions,
    Likes,
}

impl SignalKind {
    pub const ALL: [SignalKind; 3] = [
        SignalKind::OwnTimeline,
        SignalKind::Mentions,
        SignalKind::Likes,
    ];

    pub fn feed(&self) -> Feed {
        match self {
            SignalKind::OwnTimeline => Feed::Authored,
            SignalKind::Mentions => Feed::Mentions,
            SignalKind::Likes => Feed::Liked,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::OwnTimeline => "own_timeline",
            SignalKind::Mentions => "mentions",
            SignalKind::Likes => "likes",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphSettings {
    pub page_size: usize,
    pub page_delay: Duration,
    pub max_own_posts: usize,
    pub max_mentions: usize,
    pub max_liked: usize,
}

impl GraphSettings {
    pub fn cap(&self, signal: SignalKind) -> usize {
        match signal {
            SignalKind::OwnTimeline => self.max_own_posts,
            SignalKind::Mentions => self.max_mentions,
            SignalKind::Likes => self.max_liked,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SignalStatus {
    Complete,
    Degraded { reason: String },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalOutcome {
    pub signal: SignalKind,
    pub status: SignalStatus,
    pub pages: usize,
    pub items_scanned: usize,
    /// Total weight merged into the graph from this signal.
    pub contributed: u64,
}

impl SignalOutcome {
    pub fn is_complete(&self) -> bool {
        self.status == SignalStatus::Complete
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub account_id: String,
    pub score: u64,
}

/// Account id -> accumulated interaction score, remembering first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ScoreEntry>", into = "Vec<ScoreEntry>")]
pub struct ScoreMap {
    entries: Vec<ScoreEntry>,
    index: HashMap<String, usize>,
}

impl ScoreMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, account_id: &str, weight: u64) {
        match self.index.get(account_id) {
            Some(&i) => self.entries[i].score += weight,
            None => {
                self.index.insert(account_id.to_string(), self.entries.len());
                self.entries.push(ScoreEntry {
                    account_id: account_id.to_string(),
                    score: weight,
                });
            }
        }
    }

    pub fn get(&self, account_id: &str) -> Option<u64> {
        self.index.get(account_id).map(|&i| self.entries[i].score)
    }

    pub fn contains(&self, account_id: &str) -> bool {
        self.index.contains_key(account_id)
    }

    pub fn remove(&mut self, account_id: &str) -> Option<u64> {
        let i = self.index.remove(account_id)?;
        let removed = self.entries.remove(i);
        for entry in &self.entries[i..] {
            if let Some(slot) = self.index.get_mut(&entry.account_id) {
                *slot -= 1;
            }
        }
        Some(removed.score)
    }

    /// Adds every entry of `other`, in `other`'s insertion order.
    pub fn merge(&mut self, other: &ScoreMap) {
        for entry in &other.entries {
            self.add(&entry.account_id, entry.score);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|e| e.score).sum()
    }

    /// Entries in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|e| (e.account_id.as_str(), e.score))
    }
}

impl From<Vec<ScoreEntry>> for ScoreMap {
    fn from(entries: Vec<ScoreEntry>) -> Self {
        let mut map = ScoreMap::new();
        for entry in entries {
            map.add(&entry.account_id, entry.score);
        }
        map
    }
}

impl From<ScoreMap> for Vec<ScoreEntry> {
    fn from(map: ScoreMap) -> Self {
        map.entries
    }
}

impl<S: AsRef<str>> FromIterator<(S, u64)> for ScoreMap {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut map = ScoreMap::new();
        for (id, score) in iter {
            map.add(id.as_ref(), score);
        }
        map
    }
}

/// Classifies a post authored by the tracked account.
///
/// Replies credit the replied-to user directly. Quotes and reshares credit the
/// referenced post's author, looked up in the page's side-loaded posts; a
/// missing author leaves the counterpart empty.
pub fn classify_own_post(post: &Post, page: &PostPage) -> InteractionEvent {
    let Some(reference) = post.primary_reference() else {
        return InteractionEvent::new(InteractionKind::Original, None);
    };

    match reference.kind {
        ReferenceKind::RepliedTo => {
            InteractionEvent::new(InteractionKind::Reply, post.in_reply_to_user_id.clone())
        }
        ReferenceKind::Quoted => InteractionEvent::new(
            InteractionKind::Quote,
            page.referenced_author(&reference.post_id).map(str::to_string),
        ),
        ReferenceKind::Reshared => InteractionEvent::new(
            InteractionKind::Reshare,
            page.referenced_author(&reference.post_id).map(str::to_string),
        ),
    }
}

/// Interaction events carried by one page of a signal's feed.
pub fn page_events(signal: SignalKind, page: &PostPage) -> Vec<InteractionEvent> {
    page.posts
        .iter()
        .map(|post| match signal {
            SignalKind::OwnTimeline => classify_own_post(post, page),
            SignalKind::Mentions => {
                InteractionEvent::new(InteractionKind::Mention, post.author_id.clone())
            }
            SignalKind::Likes => {
                InteractionEvent::new(InteractionKind::Like, post.author_id.clone())
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FoldSummary {
    pub contributed: u64,
    /// Reply, quote and reshare events whose counterpart could not be resolved.
    pub dropped: usize,
}

/// Adds each event's weight to its counterpart.
pub fn fold_events<I>(scores: &mut ScoreMap, events: I) -> FoldSummary
where
    I: IntoIterator<Item = InteractionEvent>,
{
    let mut summary = FoldSummary::default();
    for event in events {
        let weight = event.weight();
        if weight == 0 {
            continue;
        }
        match event.counterpart {
            Some(ref account_id) => {
                scores.add(account_id, weight);
                summary.contributed += weight;
            }
            None if event.kind.is_referencing() => summary.dropped += 1,
            None => {}
        }
    }
    summary
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionGraph {
    pub tracked_id: String,
    pub scores: ScoreMap,
    pub signals: Vec<SignalOutcome>,
    pub dropped_events: usize,
}

impl InteractionGraph {
    /// No signal produced a partner. Callers surface this as "no data".
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn degraded_signals(&self) -> impl Iterator<Item = &SignalOutcome> {
        self.signals
            .iter()
            .filter(|s| matches!(s.status, SignalStatus::Degraded { .. }))
    }
}

struct SignalScan {
    scores: ScoreMap,
    outcome: SignalOutcome,
    dropped: usize,
}

pub async fn build_interaction_graph<P: SocialPlatform + ?Sized>(
    platform: &P,
    tracked_id: &str,
    settings: &GraphSettings,
) -> InteractionGraph {
    let mut scores = ScoreMap::new();
    let mut signals = Vec::with_capacity(SignalKind::ALL.len());
    let mut dropped_events = 0;

    for signal in SignalKind::ALL {
        if signal == SignalKind::Likes && !platform.supports_likes() {
            warn!(
                signal = %signal,
                "User-context credential not configured, skipping liked-posts signal"
            );
            signals.push(SignalOutcome {
                signal,
                status: SignalStatus::Skipped {
                    reason: "user-context credential not configured".to_string(),
                },
                pages: 0,
                items_scanned: 0,
                contributed: 0,
            });
            continue;
        }

        info!(signal = %signal, user_id = tracked_id, "Scanning signal");
        let scan = scan_signal(platform, tracked_id, signal, settings).await;
        if scan.outcome.is_complete() {
            scores.merge(&scan.scores);
            dropped_events += scan.dropped;
        }
        signals.push(scan.outcome);
    }

    if let Some(weight) = scores.remove(tracked_id) {
        debug!(weight, "Removed self-interactions");
    }

    if dropped_events > 0 {
        info!(
            dropped_events,
            "Events skipped because their counterpart could not be resolved"
        );
    }
    info!(
        partners = scores.len(),
        total_weight = scores.total(),
        "Interaction graph built"
    );

    InteractionGraph {
        tracked_id: tracked_id.to_string(),
        scores,
        signals,
        dropped_events,
    }
}

async fn scan_signal<P: SocialPlatform + ?Sized>(
    platform: &P,
    tracked_id: &str,
    signal: SignalKind,
    settings: &GraphSettings,
) -> SignalScan {
    let mut partial = ScoreMap::new();
    let mut contributed = 0;
    let mut dropped = 0;
    let mut paginator = Paginator::new(
        platform,
        signal.feed(),
        tracked_id,
        settings.page_size,
        settings.cap(signal),
        settings.page_delay,
    );

    while let Some(page) = paginator.next_page().await {
        match page {
            Ok(page) => {
                let summary = fold_events(&mut partial, page_events(signal, &page));
                contributed += summary.contributed;
                dropped += summary.dropped;
            }
            Err(e) => {
                if e.is_degradable() {
                    warn!(signal = %signal, error = %e, "Signal degraded, contributing nothing");
                } else {
                    error!(signal = %signal, error = %e, "Signal failed, contributing nothing");
                }
                return SignalScan {
                    scores: ScoreMap::new(),
                    outcome: SignalOutcome {
                        signal,
                        status: SignalStatus::Degraded {
                            reason: e.to_string(),
                        },
                        pages: paginator.pages(),
                        items_scanned: paginator.scanned(),
                        contributed: 0,
                    },
                    dropped: 0,
                };
            }
        }
    }

    info!(
        signal = %signal,
        pages = paginator.pages(),
        items = paginator.scanned(),
        contributed,
        "Signal complete"
    );

    SignalScan {
        scores: partial,
        outcome: SignalOutcome {
            signal,
            status: SignalStatus::Complete,
            pages: paginator.pages(),
            items_scanned: paginator.scanned(),
            contributed,
        },
        dropped,
    }
}
