//! Crawler coordinator - fan-out/fan-in over the registered seed URLs
//!
//! This module contains the crawl orchestration logic:
//! - Registering seed URLs atomically per batch
//! - Spawning one worker task per URL behind a global concurrency limit
//! - Collecting results addressable by registration index
//! - Fail-fast or best-effort handling of worker failures

use crate::config::{CrawlerConfig, FailurePolicy};
use crate::context::{Context, ContextError};
use crate::crawler::fetcher::fetch_images;
use crate::url::parse_seed_url;
use crate::{CrawlError, FetchError, RegisterError};
use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::Client;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinError, JoinHandle};
use url::Url;

type WorkerResult = Result<Vec<String>, FetchError>;

/// Main crawler structure
///
/// Owns the seed URL set and the shared HTTP client. The seed set only grows
/// through [`Crawler::register`] and is never modified while a run is in flight.
#[derive(Debug, Clone)]
pub struct Crawler {
    client: Client,
    config: CrawlerConfig,
    urls: Vec<Url>,
}

/// Outcome of one seed URL in a best-effort run
#[derive(Debug)]
pub struct CrawlEntry {
    /// Registration index of the seed
    pub index: usize,
    /// The seed URL that was fetched
    pub url: Url,
    /// Image sources found on the page, or why the fetch failed
    pub outcome: Result<Vec<String>, FetchError>,
}

/// Per-URL outcomes of a crawl, addressable by registration index
#[derive(Debug, Default)]
pub struct CrawlReport {
    entries: Vec<CrawlEntry>,
}

impl CrawlReport {
    /// Number of seed URLs covered by the report
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no seed URLs were crawled
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Gets the outcome for the seed registered at `index`
    pub fn get(&self, index: usize) -> Option<&CrawlEntry> {
        self.entries.get(index)
    }

    /// Iterates outcomes in registration order
    pub fn iter(&self) -> impl Iterator<Item = &CrawlEntry> {
        self.entries.iter()
    }

    /// Iterates only the failed entries
    pub fn failures(&self) -> impl Iterator<Item = &CrawlEntry> {
        self.entries.iter().filter(|e| e.outcome.is_err())
    }

    /// Total number of image sources found across all successful pages
    pub fn image_count(&self) -> usize {
        self.entries
            .iter()
            .filter_map(|e| e.outcome.as_ref().ok())
            .map(Vec::len)
            .sum()
    }

    /// Why the run was cut short, if any worker was abandoned by its context
    pub fn cancellation(&self) -> Option<ContextError> {
        self.entries.iter().find_map(|e| match &e.outcome {
            Err(FetchError::Cancelled { reason, .. }) => Some(*reason),
            _ => None,
        })
    }

    fn from_images(urls: &[Url], images: Vec<Vec<String>>) -> Self {
        let entries = urls
            .iter()
            .cloned()
            .zip(images)
            .enumerate()
            .map(|(index, (url, found))| CrawlEntry {
                index,
                url,
                outcome: Ok(found),
            })
            .collect();

        Self { entries }
    }
}

impl IntoIterator for CrawlReport {
    type Item = CrawlEntry;
    type IntoIter = std::vec::IntoIter<CrawlEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Aborts spawned workers when a run returns or is dropped
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

impl Crawler {
    /// Creates a crawler with an empty seed set
    ///
    /// # Arguments
    ///
    /// * `client` - The shared HTTP client (connection pool)
    /// * `config` - Concurrency limit and failure policy
    pub fn new(client: Client, config: CrawlerConfig) -> Self {
        Self {
            client,
            config,
            urls: Vec::new(),
        }
    }

    /// Registers a batch of seed URLs
    ///
    /// Every entry must be an absolute http(s) URL. The batch is all or
    /// nothing: on the first bad entry nothing from this call is added and
    /// the error names the entry's index within the batch. Successive calls
    /// append to the existing set.
    ///
    /// # Example
    ///
    /// ```
    /// use imgscrape::config::CrawlerConfig;
    /// use imgscrape::crawler::Crawler;
    ///
    /// let mut crawler = Crawler::new(reqwest::Client::new(), CrawlerConfig::default());
    /// crawler.register(["https://example.com/"]).unwrap();
    ///
    /// let err = crawler.register(["https://example.org/", "not a url"]).unwrap_err();
    /// assert_eq!(err.index, 1);
    /// assert_eq!(crawler.len(), 1);
    /// ```
    pub fn register<I, S>(&mut self, urls: I) -> Result<(), RegisterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed = urls
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                let raw = raw.as_ref();
                parse_seed_url(raw).map_err(|cause| RegisterError {
                    index,
                    raw: raw.to_string(),
                    cause,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Registered {} seed URLs", parsed.len());
        self.urls.extend(parsed);
        Ok(())
    }

    /// The registered seed URLs in registration order
    pub fn urls(&self) -> &[Url] {
        &self.urls
    }

    /// Number of registered seed URLs
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Returns true if no seed URLs are registered
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// The configured failure policy
    pub fn failure_policy(&self) -> FailurePolicy {
        self.config.failure_policy
    }

    /// Crawls every registered URL, failing fast
    ///
    /// Returns one list of image sources per seed, indexed by registration
    /// order. The first worker failure cancels the run scope, aborts the
    /// remaining workers and is returned with its seed index; results that
    /// had already completed are discarded. Cancelling `ctx` (or reaching its
    /// deadline) returns [`CrawlError::Cancelled`] without waiting for
    /// in-flight fetches.
    pub async fn run(&self, ctx: &Context) -> Result<Vec<Vec<String>>, CrawlError> {
        tracing::info!("Starting crawl of {} URLs", self.urls.len());
        let start_time = Instant::now();

        let run_ctx = ctx.child();
        let handles = self.spawn_workers(&run_ctx);
        let _guard = AbortOnDrop(handles.iter().map(JoinHandle::abort_handle).collect());

        let mut pending: FuturesUnordered<_> = handles
            .into_iter()
            .enumerate()
            .map(|(index, handle)| async move { (index, handle.await) })
            .collect();

        let mut slots: Vec<Option<Vec<String>>> = vec![None; self.urls.len()];

        let outcome = loop {
            tokio::select! {
                biased;
                reason = ctx.done() => break Err(CrawlError::Cancelled(reason)),
                next = pending.next() => match next {
                    None => break Ok(()),
                    Some((index, joined)) => match flatten_join(&self.urls[index], joined) {
                        Ok(images) => slots[index] = Some(images),
                        Err(source) => break Err(CrawlError::Fetch { index, source }),
                    },
                },
            }
        };

        // Stop anything still in flight before reporting.
        run_ctx.cancel();

        match outcome {
            Ok(()) => {
                let results: Vec<Vec<String>> =
                    slots.into_iter().map(Option::unwrap_or_default).collect();
                tracing::info!(
                    "Crawl completed: {} images from {} pages in {:?}",
                    results.iter().map(Vec::len).sum::<usize>(),
                    results.len(),
                    start_time.elapsed()
                );
                Ok(results)
            }
            Err(e) => {
                tracing::error!("Crawl failed: {}", e);
                Err(e)
            }
        }
    }

    /// Crawls every registered URL, collecting every outcome
    ///
    /// One failing URL never affects another. Cancelling `ctx` makes the
    /// outstanding workers finish promptly with [`FetchError::Cancelled`].
    pub async fn run_best_effort(&self, ctx: &Context) -> CrawlReport {
        tracing::info!("Starting best-effort crawl of {} URLs", self.urls.len());
        let start_time = Instant::now();

        let handles = self.spawn_workers(ctx);
        let _guard = AbortOnDrop(handles.iter().map(JoinHandle::abort_handle).collect());

        let joined = futures::future::join_all(handles).await;

        let entries = joined
            .into_iter()
            .zip(self.urls.iter())
            .enumerate()
            .map(|(index, (joined, url))| CrawlEntry {
                index,
                url: url.clone(),
                outcome: flatten_join(url, joined),
            })
            .collect();

        let report = CrawlReport { entries };
        tracing::info!(
            "Crawl completed: {} images from {} pages, {} failed, in {:?}",
            report.image_count(),
            report.len(),
            report.failures().count(),
            start_time.elapsed()
        );

        report
    }

    /// Crawls using the configured [`FailurePolicy`]
    ///
    /// Both policies report cancellation of `ctx` as [`CrawlError::Cancelled`].
    /// In best-effort mode that happens only when cancellation cut at least
    /// one worker short; a report whose workers all finished is returned even
    /// if `ctx` expires right afterwards.
    pub async fn run_with_policy(&self, ctx: &Context) -> Result<CrawlReport, CrawlError> {
        match self.config.failure_policy {
            FailurePolicy::FailFast => {
                let images = self.run(ctx).await?;
                Ok(CrawlReport::from_images(&self.urls, images))
            }
            FailurePolicy::BestEffort => {
                let report = self.run_best_effort(ctx).await;
                match report.cancellation() {
                    Some(reason) => Err(CrawlError::Cancelled(reason)),
                    None => Ok(report),
                }
            }
        }
    }

    /// Spawns one worker per registered URL
    ///
    /// Workers share the HTTP client and a semaphore sized by
    /// `max_concurrent_fetches`; nothing else is shared between them.
    fn spawn_workers(&self, ctx: &Context) -> Vec<JoinHandle<WorkerResult>> {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_fetches.max(1)));

        self.urls
            .iter()
            .enumerate()
            .map(|(index, url)| {
                let client = self.client.clone();
                let url = url.clone();
                let ctx = ctx.clone();
                let permits = Arc::clone(&permits);

                tokio::spawn(async move {
                    tracing::debug!(index, url = %url, "spawning worker");

                    let work = async {
                        let _permit =
                            permits
                                .acquire()
                                .await
                                .map_err(|e| FetchError::Worker {
                                    url: url.to_string(),
                                    message: e.to_string(),
                                })?;
                        fetch_images(&client, &url).await
                    };

                    let outcome = ctx.run(work).await;
                    let result = match outcome {
                        Ok(result) => result,
                        Err(reason) => Err(FetchError::Cancelled {
                            url: url.to_string(),
                            reason,
                        }),
                    };

                    if let Err(e) = &result {
                        tracing::error!(index, url = %url, "worker failed: {}", e);
                    }

                    result
                })
            })
            .collect()
    }
}

/// Maps a panicked or aborted worker onto a fetch error for its URL
fn flatten_join(url: &Url, joined: Result<WorkerResult, JoinError>) -> WorkerResult {
    joined.unwrap_or_else(|e| {
        Err(FetchError::Worker {
            url: url.to_string(),
            message: e.to_string(),
        })
    })
}
