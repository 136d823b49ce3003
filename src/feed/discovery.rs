use super::fetcher::{self, FetchLimits};
use super::parser::ParsedFeed;
use scraper::{Html, Selector};
use thiserror::Error;

/// How far a source got through resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    /// Registration has not been attempted yet
    Unresolved,
    /// The URL itself parsed as a feed with at least one entry
    Direct,
    /// The URL was an HTML page advertising a feed via `<link type="...rss/atom...">`
    HtmlLink,
    /// Neither stage produced a feed
    Failed,
}

/// Coarse classification of a [`ResolveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    Parse,
    NoFeedFound,
}

/// Errors that can occur while resolving a source URL into a feed.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// HTTP request failed (DNS, connection, TLS, etc.)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the configured timeout
    #[error("request timed out")]
    Timeout,
    /// The feed URL answered with a non-2xx status
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response body exceeded the configured size limit
    #[error("response too large")]
    TooLarge,
    /// A local feed file could not be read
    #[error("failed to read local feed: {0}")]
    Io(#[from] std::io::Error),
    /// Feed or HTML content could not be parsed
    #[error("parse error: {0}")]
    Parse(String),
    /// The page is not a feed and advertises no RSS/Atom link
    #[error("no RSS/Atom feed found")]
    NoFeedFound,
}

impl ResolveError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ResolveError::Network(_)
            | ResolveError::Timeout
            | ResolveError::HttpStatus(_)
            | ResolveError::TooLarge
            | ResolveError::Io(_) => FailureKind::Network,
            ResolveError::Parse(_) => FailureKind::Parse,
            ResolveError::NoFeedFound => FailureKind::NoFeedFound,
        }
    }
}

/// A source URL that could not be resolved, with the reason.
#[derive(Debug, Error)]
#[error("{url}: {error}")]
pub struct ResolutionFailure {
    pub url: String,
    #[source]
    pub error: ResolveError,
}

/// A feed successfully located for a source URL.
#[derive(Debug, Clone)]
pub struct ResolvedFeed {
    /// URL the feed was actually parsed from
    pub feed_url: String,
    /// Which stage found it ([`ResolutionState::Direct`] or [`ResolutionState::HtmlLink`])
    pub via: ResolutionState,
    pub feed: ParsedFeed,
}

/// Outcome of a single resolution stage.
#[derive(Debug)]
enum Stage<T> {
    Found(T),
    NotFound,
    Failed(ResolveError),
}

/// Turns arbitrary URLs into parsed feeds.
///
/// Resolution is two-stage and first-match-wins:
///
/// 1. Parse the URL directly as RSS/Atom. One or more entries ends resolution.
/// 2. Otherwise GET the URL as HTML, take the first `<link>` whose `type`
///    mentions `rss` or `atom`, and parse the feed it points to.
#[derive(Debug, Clone)]
pub struct Resolver {
    client: reqwest::Client,
    limits: FetchLimits,
}

impl Resolver {
    pub fn new(client: reqwest::Client, limits: FetchLimits) -> Self {
        Self { client, limits }
    }

    /// Resolves `url` into a feed.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionFailure`] carrying the original URL when neither
    /// stage yields a feed. Errors never escape in any other form, so a
    /// caller processing many URLs can simply log and move on.
    pub async fn resolve(&self, url: &str) -> Result<ResolvedFeed, ResolutionFailure> {
        match self.try_direct(url).await {
            Stage::Found(feed) => {
                tracing::debug!(url = %url, entries = feed.entries.len(), "Resolved as direct feed");
                return Ok(ResolvedFeed {
                    feed_url: url.to_owned(),
                    via: ResolutionState::Direct,
                    feed,
                });
            }
            Stage::NotFound => {
                tracing::debug!(url = %url, "Direct parse yielded no entries, scanning HTML");
            }
            Stage::Failed(e) => {
                // A non-feed page usually lands here; the HTML stage decides
                tracing::debug!(url = %url, error = %e, "Direct parse failed, scanning HTML");
            }
        }

        let failure = |error| ResolutionFailure {
            url: url.to_owned(),
            error,
        };

        match self.try_html_link(url).await {
            Stage::Found(resolved) => {
                tracing::debug!(
                    url = %url,
                    feed_url = %resolved.feed_url,
                    entries = resolved.feed.entries.len(),
                    "Resolved via HTML feed link"
                );
                Ok(resolved)
            }
            Stage::NotFound => Err(failure(ResolveError::NoFeedFound)),
            Stage::Failed(e) => Err(failure(e)),
        }
    }

    async fn try_direct(&self, url: &str) -> Stage<ParsedFeed> {
        match fetcher::load_feed(&self.client, url, self.limits).await {
            Ok(feed) if feed.is_empty() => Stage::NotFound,
            Ok(feed) => Stage::Found(feed),
            Err(e) => Stage::Failed(e),
        }
    }

    async fn try_html_link(&self, url: &str) -> Stage<ResolvedFeed> {
        let page = match fetcher::get(&self.client, url, self.limits).await {
            Ok(page) => page,
            Err(e) => return Stage::Failed(e),
        };

        // Error pages can still carry <head> links, so the status is informational only
        if !page.status.is_success() {
            tracing::debug!(url = %url, status = %page.status, "HTML page returned non-success status");
        }

        let html = String::from_utf8_lossy(&page.body);
        let href = match find_feed_link(&html) {
            Ok(Some(href)) => href,
            Ok(None) => return Stage::NotFound,
            Err(e) => return Stage::Failed(e),
        };

        let feed_url = join_feed_url(url, &href);
        match fetcher::load_feed(&self.client, &feed_url, self.limits).await {
            Ok(feed) => Stage::Found(ResolvedFeed {
                feed_url,
                via: ResolutionState::HtmlLink,
                feed,
            }),
            Err(e) => Stage::Failed(e),
        }
    }
}

/// Returns the `href` of the first `<link>` element, in document order, whose
/// `type` attribute contains `rss` or `atom`.
///
/// The match is a case-sensitive substring test, which covers the usual
/// `application/rss+xml` and `application/atom+xml` values.
///
/// # Errors
///
/// [`ResolveError::Parse`] when the first matching link has no `href`.
pub fn find_feed_link(html: &str) -> Result<Option<String>, ResolveError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("link").map_err(|e| ResolveError::Parse(e.to_string()))?;

    let first = document.select(&selector).find(|link| {
        link.value()
            .attr("type")
            .is_some_and(|t| t.contains("rss") || t.contains("atom"))
    });

    match first {
        None => Ok(None),
        Some(link) => match link.value().attr("href") {
            Some(href) => Ok(Some(href.to_owned())),
            None => Err(ResolveError::Parse(
                "feed link element has no href".to_owned(),
            )),
        },
    }
}

/// Makes a discovered `href` absolute.
///
/// Anything starting with `http` is kept as-is. Otherwise the origin (trailing
/// slashes removed) and the href (leading slashes removed) are joined with a
/// single `/`. This is a plain string join: `../` segments are not collapsed
/// and the origin's path is always kept.
pub fn join_feed_url(origin: &str, href: &str) -> String {
    if href.starts_with("http") {
        return href.to_owned();
    }
    format!(
        "{}/{}",
        origin.trim_end_matches('/'),
        href.trim_start_matches('/')
    )
}
