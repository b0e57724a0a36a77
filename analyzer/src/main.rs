use anyhow::Context;
use clap::Parser;
use engagement_analyzer::{
    cache::DiskCache, config::Config, summarizer::AnthropicClient, twitter_client::TwitterClient,
    EngagementPipeline,
};
use std::env;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

/// Finds the accounts you interact with most and what makes their posts work.
#[derive(Parser, Debug)]
#[command(name = "engagement-analyzer", version, about)]
struct Args {
    /// Remove every cached entry before running
    #[arg(long)]
    clear_cache: bool,

    /// Handle to analyse, overrides TARGET_USERNAME
    #[arg(long, value_name = "HANDLE")]
    target: Option<String>,

    /// Number of interaction partners to report, overrides TOP_N_USERS
    #[arg(long, value_name = "N")]
    top_users: Option<usize>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // .env may set LOG_FORMAT, so load it before logging starts
    dotenvy::dotenv().ok();
    init_tracing();

    info!("🚀 Starting engagement analyzer");

    let config = load_config(&args).context("Failed to load configuration")?;
    info!(
        target = %config.target_username,
        top_users = config.top_n_users,
        likes = config.likes_enabled(),
        "Configuration loaded"
    );

    let cache = DiskCache::new(&config.cache_dir).context("Failed to open cache directory")?;
    if args.clear_cache {
        let removed = cache.clear_all().context("Failed to clear cache")?;
        info!(removed, "🧹 Cache cleared");
    }

    let twitter = TwitterClient::from_config(&config).context("Failed to build X API client")?;
    let claude =
        AnthropicClient::from_config(&config).context("Failed to build Anthropic client")?;

    let pipeline = EngagementPipeline::new(twitter, claude, cache, config);
    match pipeline.run().await {
        Ok(paths) => {
            info!(
                json = %paths.json.display(),
                markdown = %paths.markdown.display(),
                "✅ Analysis complete"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Analysis failed");
            Err(e).context("Engagement analysis failed")
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let json = env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

fn load_config(args: &Args) -> shared_models::error::Result<Config> {
    let mut config = Config::from_lookup(|key| match (key, &args.target) {
        ("TARGET_USERNAME", Some(target)) => Some(target.clone()),
        _ => env::var(key).ok(),
    })?;
    if let Some(n) = args.top_users {
        config.top_n_users = n;
    }
    config.validate()
}
