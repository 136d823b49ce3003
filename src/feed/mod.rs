//! Feed discovery, parsing, and merging.
//!
//! This module turns a list of arbitrary URLs into one combined RSS 2.0 feed:
//!
//! - **Discovery**: decide whether a URL is a feed, or find the feed its HTML advertises
//! - **Parsing**: convert RSS/Atom into plain entries using `feed-rs`
//! - **Merging**: normalize entries from every source and order them newest first
//! - **Writing**: serialize the merged feed as RSS 2.0
//!
//! # Architecture
//!
//! - [`discovery`] - Two-stage [`Resolver`] (direct parse, then HTML `<link>` scan)
//! - [`fetcher`] - Single-request HTTP and local-file loading with timeout and size limits
//! - [`parser`] - Low-level feed parsing
//! - [`aggregator`] - [`Aggregator`] owning the resolved sources
//! - [`writer`] - RSS 2.0 output via `quick-xml`
//!
//! # Example
//!
//! ```ignore
//! use feedmerge::feed::{Aggregator, ChannelInfo, FetchLimits, Resolver};
//!
//! let resolver = Resolver::new(reqwest::Client::new(), FetchLimits::default());
//! let mut aggregator = Aggregator::new(resolver, ChannelInfo::default());
//! aggregator.register("https://example.com/blog").await;
//! aggregator.build(Path::new("combined_feed.xml"))?;
//! ```

pub mod aggregator;
pub mod discovery;
pub mod fetcher;
pub mod parser;
pub mod writer;

pub use aggregator::{
    merge_items, AggregatedFeed, Aggregator, ChannelInfo, FeedItem, FeedSource, Registration,
    NO_TITLE,
};
pub use discovery::{
    find_feed_link, join_feed_url, FailureKind, ResolutionFailure, ResolutionState,
    ResolveError, ResolvedFeed, Resolver,
};
pub use fetcher::FetchLimits;
pub use parser::{parse_feed, ParsedEntry, ParsedFeed};
pub use writer::{render_rss, write_to_file};
