use engagement_analyzer::cache::DiskCache;
use engagement_analyzer::interactions::{SignalKind, SignalStatus};
use engagement_analyzer::platform::Feed;
use engagement_analyzer::EngagementPipeline;
use harness::{
    config, init_test_tracing, original, quote_of, reply_to, reshare_of, CannedSummarizer, Failure,
    InMemoryPlatform,
};
use shared_models::error::ModelError;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tracing::info;

const ME: &str = "100";

/// alice 8 (two replies), bob 3 (quote), carol 3 (reshare + mention), dave 1 (mention).
fn network() -> InMemoryPlatform {
    InMemoryPlatform::default()
        .account(ME, "me", 500)
        .account("1", "alice", 12_400)
        .account("2", "bob", 980)
        .account("3", "carol", 1_000_000)
        .account("4", "dave", 15)
        .referenced("b-post", "2")
        .referenced("c-post", "3")
        .feed(
            Feed::Authored,
            ME,
            vec![
                reply_to("10", ME, "1"),
                quote_of("11", ME, "b-post"),
                reshare_of("12", ME, "c-post"),
                quote_of("13", ME, "orphan"),
                original("14", ME, 3, 0),
                reply_to("15", ME, "1"),
            ],
        )
        .feed(
            Feed::Mentions,
            ME,
            vec![original("20", "3", 0, 0), original("21", "4", 0, 0)],
        )
        .feed(
            Feed::Authored,
            "1",
            vec![
                original("30", "1", 10, 0),
                original("31", "1", 500, 20),
                original("32", "1", 40, 1),
                original("33", "1", 0, 0),
            ],
        )
        .failing(Feed::Authored, "2", Failure::Forbidden)
        .feed(
            Feed::Authored,
            "3",
            vec![reshare_of("40", "3", "elsewhere"), original("41", "3", 7, 0)],
        )
}

fn pipeline(
    root: &Path,
    platform: InMemoryPlatform,
    summarizer: CannedSummarizer,
    extra: &[(&str, &str)],
) -> EngagementPipeline<InMemoryPlatform, CannedSummarizer> {
    let config = config(root, "me", extra);
    let cache = DiskCache::new(&config.cache_dir).expect("cache dir");
    EngagementPipeline::new(platform, summarizer, cache, config)
}

fn usernames(report: &engagement_analyzer::report::EngagementReport) -> Vec<&str> {
    report.partners.iter().map(|p| p.username.as_str()).collect()
}

#[tokio::test]
async fn full_run_without_like_credential() {
    init_test_tracing();
    let tmp = TempDir::new().expect("temp dir");
    let pipeline = pipeline(tmp.path(), network(), CannedSummarizer::default(), &[]);

    let paths = pipeline.run().await.expect("run succeeds");

    let report: engagement_analyzer::report::EngagementReport =
        serde_json::from_str(&fs::read_to_string(&paths.json).unwrap()).unwrap();
    assert_eq!(report.target_user, "@me");
    assert_eq!(usernames(&report), vec!["alice", "bob", "carol", "dave"]);
    let scores: Vec<u64> = report.partners.iter().map(|p| p.interaction_score).collect();
    assert_eq!(scores, vec![8, 3, 3, 1]);
    assert_eq!(report.dropped_events, 1);

    let likes = report
        .signals
        .iter()
        .find(|s| s.signal == SignalKind::Likes)
        .unwrap();
    assert!(matches!(likes.status, SignalStatus::Skipped { .. }));

    let alice_posts: Vec<&str> = report.partners[0]
        .top_posts
        .iter()
        .map(|p| p.id.as_str())
        .collect();
    assert_eq!(alice_posts, vec!["31", "32", "30"]);

    let carol = &report.partners[2];
    assert_eq!(carol.top_posts.len(), 1);
    assert_eq!(carol.top_posts[0].id, "41");

    let markdown = fs::read_to_string(&paths.markdown).unwrap();
    let bob = &markdown[markdown.find("### 2. @bob").unwrap()..];
    assert!(bob.starts_with("### 2. @bob (bob display)\n_Interaction score: 3 | Followers: 980_"));
    assert!(bob.contains("_No posts available._"));
    assert!(markdown.contains("Followers: 1,000,000"));
    assert!(markdown.contains("**1. Reply early**"));
    info!(path = %paths.markdown.display(), "report checked");
}

#[tokio::test]
async fn only_partners_with_posts_are_analysed() {
    let tmp = TempDir::new().expect("temp dir");
    let pipeline = pipeline(tmp.path(), network(), CannedSummarizer::default(), &[]);

    let report = pipeline.analyze().await.unwrap();

    assert_eq!(analysed_flags(&report), vec![true, false, true, false]);
    assert!(report.partners[1].analysis.is_none());
    assert!(report.partners[3].analysis.is_none());
}

fn analysed_flags(report: &engagement_analyzer::report::EngagementReport) -> Vec<bool> {
    report.partners.iter().map(|p| p.analysis.is_some()).collect()
}

#[tokio::test]
async fn likes_count_when_credential_is_present() {
    let tmp = TempDir::new().expect("temp dir");
    let platform = network().with_likes().feed(
        Feed::Liked,
        ME,
        (0..5).map(|i| original(&format!("5{}", i), "4", 0, 0)).collect(),
    );
    let pipeline = pipeline(tmp.path(), platform, CannedSummarizer::default(), &[]);

    let report = pipeline.analyze().await.unwrap();

    assert_eq!(usernames(&report), vec!["alice", "dave", "bob", "carol"]);
    assert_eq!(report.partners[1].interaction_score, 6);
    assert!(report.signals.iter().all(|s| s.status == SignalStatus::Complete));
}

#[tokio::test]
async fn forbidden_mentions_degrade_to_own_timeline() {
    let tmp = TempDir::new().expect("temp dir");
    let platform = network().failing(Feed::Mentions, ME, Failure::Forbidden);
    let pipeline = pipeline(tmp.path(), platform, CannedSummarizer::default(), &[]);

    let report = pipeline.analyze().await.unwrap();

    assert_eq!(usernames(&report), vec!["alice", "bob", "carol"]);
    assert_eq!(report.partners[2].interaction_score, 2);
    let mentions = &report.signals[1];
    assert_eq!(mentions.signal, SignalKind::Mentions);
    assert!(matches!(mentions.status, SignalStatus::Degraded { .. }));
    assert_eq!(mentions.contributed, 0);
}

#[tokio::test]
async fn throttled_mentions_and_protected_partner_still_report() {
    let tmp = TempDir::new().expect("temp dir");
    let platform = network()
        .failing(Feed::Mentions, ME, Failure::Throttled)
        .failing(Feed::Authored, "3", Failure::Unauthorized);
    let pipeline = pipeline(tmp.path(), platform, CannedSummarizer::default(), &[]);

    let paths = pipeline.run().await.expect("run succeeds");

    let report: engagement_analyzer::report::EngagementReport =
        serde_json::from_str(&fs::read_to_string(&paths.json).unwrap()).unwrap();
    assert_eq!(usernames(&report), vec!["alice", "bob", "carol"]);
    assert!(report.partners[2].top_posts.is_empty());
    assert!(matches!(
        &report.signals[1].status,
        SignalStatus::Degraded { reason } if reason.contains("Rate limited")
    ));
    assert_eq!(*pipeline.summarizer().analysed.lock().unwrap(), vec!["alice"]);

    let markdown = fs::read_to_string(&paths.markdown).unwrap();
    assert!(markdown.contains("- mentions: degraded (Rate limited, gave up after 5 waits)"));
}

#[tokio::test]
async fn partner_posts_are_fetched_once_each_in_rank_order() {
    let tmp = TempDir::new().expect("temp dir");
    let pipeline = pipeline(tmp.path(), network(), CannedSummarizer::default(), &[]);

    pipeline.analyze().await.unwrap();

    assert_eq!(
        pipeline.platform().fetched_users(Feed::Authored),
        vec![ME, "1", "2", "3", "4"]
    );
    assert_eq!(pipeline.platform().fetched_users(Feed::Mentions), vec![ME]);
    assert!(pipeline.platform().fetched_users(Feed::Liked).is_empty());
    assert_eq!(
        *pipeline.summarizer().synthesized_from.lock().unwrap(),
        vec!["alice", "carol"]
    );
}

#[tokio::test]
async fn partner_quota_is_respected() {
    let tmp = TempDir::new().expect("temp dir");
    let pipeline = pipeline(
        tmp.path(),
        network(),
        CannedSummarizer::default(),
        &[("TOP_N_USERS", "2")],
    );
    let report = pipeline.analyze().await.unwrap();
    assert_eq!(usernames(&report), vec!["alice", "bob"]);
}

#[tokio::test]
async fn shortfall_reports_every_partner_found() {
    let tmp = TempDir::new().expect("temp dir");
    let pipeline = pipeline(
        tmp.path(),
        network(),
        CannedSummarizer::default(),
        &[("TOP_N_USERS", "50")],
    );
    let report = pipeline.analyze().await.unwrap();
    assert_eq!(report.partners.len(), 4);
    assert_eq!(report.partners.last().unwrap().rank, 4);
}

#[tokio::test]
async fn own_timeline_scan_stops_at_cap() {
    let tmp = TempDir::new().expect("temp dir");
    let platform = InMemoryPlatform::default()
        .account(ME, "me", 1)
        .account("1", "alice", 1)
        .feed(
            Feed::Authored,
            ME,
            (0..250).map(|i| reply_to(&i.to_string(), ME, "1")).collect(),
        );
    let pipeline = pipeline(
        tmp.path(),
        platform,
        CannedSummarizer::default(),
        &[("MAX_OWN_TWEETS", "120")],
    );

    let report = pipeline.analyze().await.unwrap();

    let own = &report.signals[0];
    assert_eq!(own.items_scanned, 120);
    assert_eq!(own.pages, 2);
    assert_eq!(report.partners[0].interaction_score, 480);
}

#[tokio::test]
async fn unparsed_analysis_is_kept_raw() {
    let tmp = TempDir::new().expect("temp dir");
    let pipeline = pipeline(
        tmp.path(),
        network(),
        CannedSummarizer::default().unparsed_for("alice"),
        &[],
    );

    let paths = pipeline.run().await.unwrap();

    let markdown = fs::read_to_string(paths.markdown).unwrap();
    assert!(markdown.contains("```\n@alice mostly posts memes.\n```"));
}

#[tokio::test]
async fn unknown_target_aborts_the_run() {
    let tmp = TempDir::new().expect("temp dir");
    let pipeline = pipeline(
        tmp.path(),
        InMemoryPlatform::default(),
        CannedSummarizer::default(),
        &[],
    );

    let err = pipeline.run().await.unwrap_err();

    assert!(matches!(err, ModelError::NotFound(_)));
    assert!(!tmp.path().join("output").exists());
}

#[tokio::test]
async fn no_interactions_is_reported_as_no_data() {
    let tmp = TempDir::new().expect("temp dir");
    let platform = InMemoryPlatform::default()
        .account(ME, "me", 1)
        .feed(Feed::Authored, ME, vec![original("1", ME, 10, 0)]);
    let pipeline = pipeline(tmp.path(), platform, CannedSummarizer::default(), &[]);

    let err = pipeline.run().await.unwrap_err();

    assert!(matches!(err, ModelError::NoInteractionData(ref handle) if handle == "me"));
    assert_eq!(err.to_string(), "No interaction data found for @me");
}
