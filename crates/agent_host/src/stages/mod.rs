//! The four pipeline stages, in execution order.

pub mod planner;
pub mod platform_scraper;
pub mod query_enhancer;
pub mod summarizer;

pub use planner::Planner;
pub use platform_scraper::PlatformScraper;
pub use query_enhancer::QueryEnhancer;
pub use summarizer::Summarizer;
