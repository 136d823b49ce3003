use super::aggregator::AggregatedFeed;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::Path;

const GENERATOR: &str = concat!("feedmerge ", env!("CARGO_PKG_VERSION"));
const RSS_DOCS: &str = "https://www.rssboard.org/rss-specification";

/// Formats a timestamp the way RSS 2.0 expects (RFC 822, GMT).
fn rfc822(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn write_text_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .with_context(|| format!("Failed to write {name} element"))?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .with_context(|| format!("Failed to write {name} text"))?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .with_context(|| format!("Failed to write {name} end"))?;
    Ok(())
}

/// Renders the merged feed as an RSS 2.0 document.
///
/// Items are written in the order they appear in `feed.items`. A feed with
/// no items still produces a complete `<rss><channel>` document.
pub fn render_rss(feed: &AggregatedFeed) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .context("Failed to write XML declaration")?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    writer
        .write_event(Event::Start(rss))
        .context("Failed to write rss element")?;
    writer
        .write_event(Event::Start(BytesStart::new("channel")))
        .context("Failed to write channel element")?;

    write_text_element(&mut writer, "title", &feed.channel.title)?;
    write_text_element(&mut writer, "link", &feed.channel.link)?;
    write_text_element(&mut writer, "description", &feed.channel.description)?;
    write_text_element(&mut writer, "lastBuildDate", &rfc822(&feed.last_build))?;
    write_text_element(&mut writer, "generator", GENERATOR)?;
    write_text_element(&mut writer, "docs", RSS_DOCS)?;

    for item in &feed.items {
        writer
            .write_event(Event::Start(BytesStart::new("item")))
            .context("Failed to write item element")?;
        write_text_element(&mut writer, "title", &item.title)?;
        write_text_element(&mut writer, "link", &item.link)?;
        write_text_element(&mut writer, "description", &item.description)?;
        write_text_element(&mut writer, "pubDate", &rfc822(&item.published))?;
        writer
            .write_event(Event::End(BytesEnd::new("item")))
            .context("Failed to write item end")?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("channel")))
        .context("Failed to write channel end")?;
    writer
        .write_event(Event::End(BytesEnd::new("rss")))
        .context("Failed to write rss end")?;

    let result = writer.into_inner().into_inner();
    String::from_utf8(result).context("Generated RSS contains invalid UTF-8")
}

/// Writes the merged feed to `path` atomically.
///
/// The document goes to a temporary file next to `path`, is synced to disk,
/// then renamed over the destination, so readers never see a partial file.
pub fn write_to_file(feed: &AggregatedFeed, path: &Path) -> Result<()> {
    use std::time::{SystemTime, UNIX_EPOCH};

    let content = render_rss(feed)?;

    let random_suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = path.with_extension(format!("tmp.{:016x}", random_suffix));

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .with_context(|| {
            format!(
                "Failed to create temporary file '{}': check directory permissions",
                temp_path.display()
            )
        })?;

    std::io::Write::write_all(&mut file, content.as_bytes()).with_context(|| {
        let _ = std::fs::remove_file(&temp_path);
        format!("Failed to write feed to temporary file '{}'", temp_path.display())
    })?;

    file.sync_all().with_context(|| {
        let _ = std::fs::remove_file(&temp_path);
        format!(
            "Failed to sync temporary file '{}' to disk",
            temp_path.display()
        )
    })?;

    drop(file);

    // On Windows, rename fails if destination exists, so remove it first
    #[cfg(windows)]
    if path.exists() {
        std::fs::remove_file(path).with_context(|| {
            let _ = std::fs::remove_file(&temp_path);
            format!("Failed to remove existing '{}'", path.display())
        })?;
    }

    std::fs::rename(&temp_path, path).with_context(|| {
        let _ = std::fs::remove_file(&temp_path);
        format!(
            "Failed to rename '{}' to '{}'",
            temp_path.display(),
            path.display()
        )
    })?;

    Ok(())
}
