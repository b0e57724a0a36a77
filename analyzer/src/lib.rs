pub mod cache;
pub mod config;
pub mod engagement;
pub mod interactions;
pub mod pagination;
pub mod pipeline;
pub mod platform;
pub mod ranking;
pub mod report;
pub mod summarizer;
pub mod top_posts;
pub mod twitter_client;

#[cfg(test)]
pub(crate) mod testing;

pub use pipeline::EngagementPipeline;
