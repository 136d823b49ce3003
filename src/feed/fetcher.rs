use super::discovery::ResolveError;
use super::parser::{parse_feed, ParsedFeed};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_BODY: usize = 5 * 1024 * 1024; // 5MB

/// Bounds applied to every single request issued while resolving a source.
///
/// There is no retry: one request either completes within `timeout` and
/// `max_body_bytes`, or the attempt fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    /// Upper bound for sending the request and reading the whole body
    pub timeout: Duration,
    /// Responses (or local files) larger than this are rejected
    pub max_body_bytes: usize,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY,
        }
    }
}

/// Status and body of a completed GET.
pub(crate) struct Page {
    pub status: reqwest::StatusCode,
    pub body: Vec<u8>,
}

/// Issues one GET and reads the body under the configured limits.
///
/// Non-2xx responses are returned as-is; callers decide whether the status
/// matters to them.
pub(crate) async fn get(
    client: &reqwest::Client,
    url: &str,
    limits: FetchLimits,
) -> Result<Page, ResolveError> {
    let response = tokio::time::timeout(limits.timeout, client.get(url).send())
        .await
        .map_err(|_| ResolveError::Timeout)?
        .map_err(ResolveError::Network)?;

    let status = response.status();
    let body = tokio::time::timeout(
        limits.timeout,
        read_limited_bytes(response, limits.max_body_bytes),
    )
    .await
    .map_err(|_| ResolveError::Timeout)??;

    Ok(Page { status, body })
}

/// Loads a feed document and parses it.
///
/// `target` is usually an http(s) URL, but `file://` URLs and bare paths are
/// read from disk so that local feed files can be merged too.
///
/// # Errors
///
/// - [`ResolveError::Network`] / [`ResolveError::Timeout`] for transport failures
/// - [`ResolveError::HttpStatus`] for non-2xx responses
/// - [`ResolveError::Io`] when a local file cannot be read
/// - [`ResolveError::TooLarge`] when the body exceeds the limit
/// - [`ResolveError::Parse`] when the bytes are not RSS or Atom
pub(crate) async fn load_feed(
    client: &reqwest::Client,
    target: &str,
    limits: FetchLimits,
) -> Result<ParsedFeed, ResolveError> {
    let bytes = match local_path(target) {
        Some(path) => read_local(path, limits.max_body_bytes).await?,
        None => {
            let page = get(client, target, limits).await?;
            if !page.status.is_success() {
                return Err(ResolveError::HttpStatus(page.status.as_u16()));
            }
            page.body
        }
    };

    parse_feed(&bytes).map_err(|e| ResolveError::Parse(e.to_string()))
}

/// Maps `file://` URLs and scheme-less strings to a filesystem path.
fn local_path(target: &str) -> Option<PathBuf> {
    match url::Url::parse(target) {
        Ok(parsed) if parsed.scheme() == "file" => parsed.to_file_path().ok(),
        Ok(_) => None,
        Err(url::ParseError::RelativeUrlWithoutBase) => Some(PathBuf::from(target)),
        Err(_) => None,
    }
}

async fn read_local(path: PathBuf, limit: usize) -> Result<Vec<u8>, ResolveError> {
    let metadata = tokio::fs::metadata(&path).await?;
    if metadata.len() > limit as u64 {
        return Err(ResolveError::TooLarge);
    }
    Ok(tokio::fs::read(&path).await?)
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, ResolveError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ResolveError::TooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ResolveError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ResolveError::TooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
