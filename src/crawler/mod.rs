//! Crawler module for image link discovery
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching of seed pages
//! - HTML parsing and image source extraction
//! - Bounded fan-out over seed URLs with index-stable results

mod coordinator;
mod fetcher;
mod parser;

pub use crate::config::FailurePolicy;
pub use coordinator::{CrawlEntry, CrawlReport, Crawler};
pub use fetcher::{build_http_client, fetch_images, fetch_page, FetchedPage};
pub use parser::{extract_image_sources, resolve_image_sources};

use crate::config::Config;
use crate::context::Context;
use crate::ImgscrapeError;

/// Runs a complete crawl operation
///
/// This is the main entry point for a one-shot crawl. It will:
/// 1. Build the shared HTTP client
/// 2. Register the seed URLs (rejecting the batch on any malformed entry)
/// 3. Fetch every page and extract image sources, following the
///    configured failure policy
///
/// # Example
///
/// ```no_run
/// use imgscrape::config::Config;
/// use imgscrape::context::Context;
/// use imgscrape::crawler::crawl;
///
/// # async fn example() -> Result<(), imgscrape::ImgscrapeError> {
/// let report = crawl(&Config::default(), ["https://example.com/"], &Context::background()).await?;
/// for entry in report.iter() {
///     println!("{}: {:?}", entry.url, entry.outcome);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn crawl<I, S>(config: &Config, urls: I, ctx: &Context) -> Result<CrawlReport, ImgscrapeError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let client = build_http_client(&config.http)?;
    let mut crawler = Crawler::new(client, config.crawler.clone());
    crawler.register(urls)?;

    Ok(crawler.run_with_policy(ctx).await?)
}
