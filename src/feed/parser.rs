use anyhow::Result;
use chrono::{DateTime, Utc};
use feed_rs::parser;

/// One entry of a parsed feed, with every field as the source provided it.
///
/// Defaults (placeholder title, fallback timestamp) are applied later, when
/// the entry is turned into a `FeedItem` at aggregation time.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub summary: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

/// A parsed RSS or Atom document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub entries: Vec<ParsedEntry>,
}

impl ParsedFeed {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed> {
    let feed = parser::parse(bytes)?;

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| ParsedEntry {
            title: entry.title.map(|t| t.content),
            link: entry.links.first().map(|l| l.href.clone()),
            summary: entry.summary.map(|s| s.content),
            published: entry.published,
            updated: entry.updated,
        })
        .collect();

    Ok(ParsedFeed {
        title: feed.title.map(|t| t.content),
        entries,
    })
}
