use chrono::Utc;
use shared_models::{
    error::{ModelError, Result},
    Account, Analysis, NetworkStrategy, PartnerAnalysis, PartnerReview, RankedPartner, ScoredPost,
};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::cache::{self, namespace, DiskCache};
use crate::config::Config;
use crate::interactions::{build_interaction_graph, InteractionGraph};
use crate::platform::SocialPlatform;
use crate::ranking::select_top_partners;
use crate::report::{EngagementReport, ReportPaths};
use crate::summarizer::Summarizer;
use crate::top_posts::fetch_top_posts;

/// One analysis run for the configured target, from handle to report.
pub struct EngagementPipeline<P, S> {
    platform: P,
    summarizer: S,
    cache: DiskCache,
    config: Config,
}

impl<P: SocialPlatform, S: Summarizer> EngagementPipeline<P, S> {
    pub fn new(platform: P, summarizer: S, cache: DiskCache, config: Config) -> Self {
        Self {
            platform,
            summarizer,
            cache,
            config,
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn summarizer(&self) -> &S {
        &self.summarizer
    }

    /// Runs every step and writes the report files.
    pub async fn run(&self) -> Result<ReportPaths> {
        let report = self.analyze().await?;
        report.write_to(&self.config.output_dir)
    }

    /// Runs every step and returns the assembled report without writing it.
    pub async fn analyze(&self) -> Result<EngagementReport> {
        let target = self.resolve_target().await?;
        info!(user = %target.username, id = %target.id, "🎯 Target resolved");

        let graph = self.interaction_graph(&target).await?;

        let selection = select_top_partners(&graph.scores, self.config.top_n_users);
        let partners = self.resolve_partners(&selection.ids, &graph).await;

        let mut ranked = Vec::with_capacity(partners.len());
        for (i, (account, interaction_score)) in partners.into_iter().enumerate() {
            let top_posts = self.partner_top_posts(&account).await;
            ranked.push(RankedPartner {
                rank: i + 1,
                account,
                interaction_score,
                top_posts,
            });
        }

        let reviews = self.review_partners(&ranked).await;
        let strategy = self.network_strategy(&target, &reviews).await;

        Ok(EngagementReport::assemble(
            &target,
            ranked,
            reviews,
            strategy,
            &graph,
            Utc::now(),
        ))
    }

    async fn resolve_target(&self) -> Result<Account> {
        let handle = &self.config.target_username;
        if let Some(account) = self
            .cache
            .get::<Account>(namespace::USER_ID, handle, cache::USER_ID_TTL)
        {
            return Ok(account);
        }

        let account = self.platform.resolve_username(handle).await?;
        self.cache.set(namespace::USER_ID, handle, &account);
        Ok(account)
    }

    async fn interaction_graph(&self, target: &Account) -> Result<InteractionGraph> {
        let ttl = cache::hours(self.config.cache_ttl_hours);
        if let Some(graph) =
            self.cache
                .get::<InteractionGraph>(namespace::INTERACTION_SCORES, &target.id, ttl)
        {
            info!(partners = graph.scores.len(), "Interaction graph loaded from cache");
            return Ok(graph);
        }

        let graph =
            build_interaction_graph(&self.platform, &target.id, &self.config.graph_settings())
                .await;

        if graph.is_empty() {
            return Err(ModelError::NoInteractionData(target.username.clone()));
        }

        let degraded: Vec<&str> = graph.degraded_signals().map(|s| s.signal.as_str()).collect();
        if !degraded.is_empty() {
            warn!(signals = ?degraded, "Graph built from partial data, not caching it");
        } else {
            self.cache
                .set(namespace::INTERACTION_SCORES, &target.id, &graph);
        }
        Ok(graph)
    }

    /// Accounts for the selected ids in rank order, paired with their score.
    ///
    /// A failed lookup keeps every ranked id under a placeholder account.
    async fn resolve_partners(
        &self,
        ids: &[String],
        graph: &InteractionGraph,
    ) -> Vec<(Account, u64)> {
        if ids.is_empty() {
            return Vec::new();
        }
        let score = |id: &str| graph.scores.get(id).unwrap_or_default();

        let mut by_id: HashMap<String, Account> = match self.platform.lookup_accounts(ids).await {
            Ok(accounts) => accounts.into_iter().map(|a| (a.id.clone(), a)).collect(),
            Err(e) => {
                warn!(
                    partners = ids.len(),
                    error = %e,
                    "Partner lookup failed, reporting bare ids"
                );
                return ids
                    .iter()
                    .map(|id| (Account::placeholder(id), score(id)))
                    .collect();
            }
        };

        let mut partners = Vec::with_capacity(ids.len());
        for id in ids {
            match by_id.remove(id) {
                Some(account) => partners.push((account, score(id))),
                None => warn!(account_id = %id, "Partner no longer resolves, dropping"),
            }
        }
        partners
    }

    async fn partner_top_posts(&self, account: &Account) -> Vec<ScoredPost> {
        if let Some(posts) = self.cache.get::<Vec<ScoredPost>>(
            namespace::USER_TOP_POSTS,
            &account.id,
            cache::USER_TOP_POSTS_TTL,
        ) {
            return posts;
        }

        let posts = fetch_top_posts(
            &self.platform,
            &account.id,
            self.config.top_n_posts,
            self.config.partner_fetch_limit,
            self.config.partner_delay(),
        )
        .await;

        if !posts.is_empty() {
            self.cache
                .set(namespace::USER_TOP_POSTS, &account.id, &posts);
        }
        posts
    }

    async fn review_partners(&self, partners: &[RankedPartner]) -> Vec<PartnerReview> {
        let mut reviews = Vec::new();
        for partner in partners {
            let account = &partner.account;
            if !partner.has_posts() {
                info!(user = %account.username, "No posts available, skipping analysis");
                continue;
            }

            let analysis = match self.cache.get::<Analysis<PartnerAnalysis>>(
                namespace::PARTNER_ANALYSIS,
                &account.id,
                cache::PARTNER_ANALYSIS_TTL,
            ) {
                Some(cached) => cached,
                None => {
                    info!(rank = partner.rank, user = %account.username, "🤖 Analysing partner");
                    let analysis = self
                        .summarizer
                        .analyze_partner(account, &partner.top_posts)
                        .await;
                    if analysis.is_structured() {
                        self.cache
                            .set(namespace::PARTNER_ANALYSIS, &account.id, &analysis);
                    }
                    analysis
                }
            };

            reviews.push(PartnerReview {
                account_id: account.id.clone(),
                username: account.username.clone(),
                analysis,
            });
        }
        reviews
    }

    async fn network_strategy(
        &self,
        target: &Account,
        reviews: &[PartnerReview],
    ) -> Analysis<NetworkStrategy> {
        if reviews.is_empty() {
            warn!("No partner analyses to synthesise");
            return Analysis::Failed {
                error: "no partner analyses available".to_string(),
            };
        }

        if let Some(cached) = self.cache.get(
            namespace::NETWORK_STRATEGY,
            &target.id,
            cache::NETWORK_STRATEGY_TTL,
        ) {
            return cached;
        }

        info!(partners = reviews.len(), "🧠 Synthesising network strategy");
        let strategy = self.summarizer.synthesize(&target.username, reviews).await;
        if strategy.is_structured() {
            self.cache
                .set(namespace::NETWORK_STRATEGY, &target.id, &strategy);
        }
        strategy
    }
}
