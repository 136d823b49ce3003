//! Merging of resolved sources into one time-ordered feed.

use super::discovery::{ResolutionFailure, ResolutionState, Resolver, ResolvedFeed};
use super::parser::ParsedEntry;
use super::writer;
use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};

/// Title given to entries that carry none.
pub const NO_TITLE: &str = "No Title";

const DEFAULT_CONCURRENCY: usize = 4;

/// One registered origin and, once resolved, the entries it provided.
#[derive(Debug, Clone)]
pub struct FeedSource {
    /// URL as supplied by the caller
    pub url: String,
    pub state: ResolutionState,
    /// URL the feed was parsed from (differs from `url` for HTML pages)
    pub feed_url: Option<String>,
    pub entries: Vec<ParsedEntry>,
}

impl FeedSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: ResolutionState::Unresolved,
            feed_url: None,
            entries: Vec::new(),
        }
    }

    /// Fills the source from a successful resolution.
    pub fn resolved(self, resolved: ResolvedFeed) -> Self {
        Self {
            url: self.url,
            state: resolved.via,
            feed_url: Some(resolved.feed_url),
            entries: resolved.feed.entries,
        }
    }
}

/// A normalized item of the merged output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub published: DateTime<Utc>,
}

impl FeedItem {
    /// Normalizes an entry. The timestamp falls back from `published` to
    /// `updated` to `now`, so an item always has exactly one.
    pub fn from_entry(entry: &ParsedEntry, now: DateTime<Utc>) -> Self {
        Self {
            title: entry.title.clone().unwrap_or_else(|| NO_TITLE.to_owned()),
            link: entry.link.clone().unwrap_or_default(),
            description: entry.summary.clone().unwrap_or_default(),
            published: entry.published.or(entry.updated).unwrap_or(now),
        }
    }
}

/// Static channel metadata of the merged feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub title: String,
    pub link: String,
    pub description: String,
}

impl Default for ChannelInfo {
    fn default() -> Self {
        Self {
            title: "AI and ML News Aggregator".to_owned(),
            link: "https://example.com/feed".to_owned(),
            description: "Aggregated AI and ML news from multiple sources".to_owned(),
        }
    }
}

/// The merged output document.
#[derive(Debug, Clone)]
pub struct AggregatedFeed {
    pub channel: ChannelInfo,
    pub last_build: DateTime<Utc>,
    /// Newest first
    pub items: Vec<FeedItem>,
}

/// Outcome of registering one URL.
#[derive(Debug)]
pub struct Registration {
    pub url: String,
    /// `Direct`, `HtmlLink`, or `Failed`
    pub state: ResolutionState,
    /// Entries contributed by the source (0 on failure)
    pub entries: usize,
    pub error: Option<ResolutionFailure>,
}

impl Registration {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Flattens every source's entries, in registration order then entry order,
/// and sorts them newest first.
///
/// The sort is stable under a descending comparator, so items with equal
/// timestamps keep their pre-sort relative order.
pub fn merge_items(sources: &[FeedSource], now: DateTime<Utc>) -> Vec<FeedItem> {
    let mut items: Vec<FeedItem> = sources
        .iter()
        .flat_map(|source| source.entries.iter())
        .map(|entry| FeedItem::from_entry(entry, now))
        .collect();

    items.sort_by(|a, b| b.published.cmp(&a.published));
    items
}

/// Owns the set of resolved sources and produces the merged feed.
pub struct Aggregator {
    resolver: Resolver,
    channel: ChannelInfo,
    concurrency: usize,
    sources: Vec<FeedSource>,
}

impl Aggregator {
    pub fn new(resolver: Resolver, channel: ChannelInfo) -> Self {
        Self {
            resolver,
            channel,
            concurrency: DEFAULT_CONCURRENCY,
            sources: Vec::new(),
        }
    }

    /// Sets how many sources [`register_all`](Self::register_all) resolves at
    /// once. `1` resolves strictly one after another.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Successfully resolved sources, in registration order.
    pub fn sources(&self) -> &[FeedSource] {
        &self.sources
    }

    /// Resolves `url` and keeps it on success. Registering the same URL twice
    /// stores it twice.
    pub async fn register(&mut self, url: &str) -> bool {
        let outcome = resolve_source(&self.resolver, url.to_owned()).await;
        accept(&mut self.sources, outcome).is_success()
    }

    /// Registers a batch of URLs.
    ///
    /// Up to `concurrency` sources are resolved at the same time. Outcomes are
    /// handed to `report` and appended in input order, so the stored order
    /// never depends on which request finished first. A failing URL never
    /// stops the rest of the batch.
    ///
    /// Returns the number of URLs that were registered.
    pub async fn register_all<F>(&mut self, urls: &[String], mut report: F) -> usize
    where
        F: FnMut(&Registration),
    {
        let resolver = &self.resolver;
        let sources = &mut self.sources;

        let mut outcomes = stream::iter(urls.iter().cloned())
            .map(|url| resolve_source(resolver, url))
            .buffered(self.concurrency);

        let mut succeeded = 0;
        while let Some(outcome) = outcomes.next().await {
            let registration = accept(sources, outcome);
            if registration.is_success() {
                succeeded += 1;
            }
            report(&registration);
        }

        tracing::info!(
            total = urls.len(),
            succeeded = succeeded,
            "Source registration finished"
        );
        succeeded
    }

    /// Merges all registered sources, stamping fallbacks and the build time
    /// with the current wall-clock time.
    pub fn aggregate(&self) -> AggregatedFeed {
        self.aggregate_at(Utc::now())
    }

    /// Merges all registered sources as of `now`.
    pub fn aggregate_at(&self, now: DateTime<Utc>) -> AggregatedFeed {
        AggregatedFeed {
            channel: self.channel.clone(),
            last_build: now,
            items: merge_items(&self.sources, now),
        }
    }

    /// Aggregates and writes the RSS 2.0 document to `destination`.
    ///
    /// # Errors
    ///
    /// Fails only if serialization or the file write fails. An aggregator
    /// with no sources writes a feed with no items.
    pub fn build(&self, destination: &Path) -> Result<PathBuf> {
        let feed = self.aggregate();
        writer::write_to_file(&feed, destination)?;
        tracing::info!(
            path = %destination.display(),
            items = feed.items.len(),
            sources = self.sources.len(),
            "Combined feed written"
        );
        Ok(destination.to_path_buf())
    }
}

type Outcome = (FeedSource, Result<ResolvedFeed, ResolutionFailure>);

async fn resolve_source(resolver: &Resolver, url: String) -> Outcome {
    let result = resolver.resolve(&url).await;
    (FeedSource::new(url), result)
}

/// Stores a resolved source, or logs and discards a failed one.
fn accept(sources: &mut Vec<FeedSource>, (source, result): Outcome) -> Registration {
    match result {
        Ok(resolved) => {
            let source = source.resolved(resolved);
            let registration = Registration {
                url: source.url.clone(),
                state: source.state,
                entries: source.entries.len(),
                error: None,
            };
            sources.push(source);
            registration
        }
        Err(failure) => {
            tracing::warn!(
                url = %source.url,
                kind = ?failure.error.kind(),
                error = %failure.error,
                "Failed to resolve source"
            );
            Registration {
                url: source.url,
                state: ResolutionState::Failed,
                entries: 0,
                error: Some(failure),
            }
        }
    }
}
