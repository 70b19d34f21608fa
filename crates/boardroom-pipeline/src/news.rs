//! News headline seeding.
//!
//! A fraction of scheduled cycles riff on a real headline instead of
//! inventing an internal incident. Headlines come from an RSS feed over
//! HTTP; the feed structure is simple enough that a small hand scanner
//! over `<item>` blocks beats pulling in an XML stack. Any fetch or
//! scan failure degrades to internal-event mode upstream.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;

use crate::error::PipelineError;

/// One candidate headline for event seeding.
///
/// Serializable because the chosen headline is embedded in the prompt
/// context handed to the templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Headline {
    /// Headline text.
    pub title: String,
    /// Link to the article.
    pub link: String,
}

/// A source of fresh headlines.
pub trait NewsSource: Send + Sync {
    /// Fetch the current headlines, freshest first.
    fn latest(&self) -> impl Future<Output = Result<Vec<Headline>, PipelineError>> + Send;
}

/// Fetches headlines from an RSS feed (Google News by default).
pub struct RssNewsSource {
    client: reqwest::Client,
    feed_url: String,
}

impl RssNewsSource {
    /// Create a source for the given feed URL with a fetch timeout.
    pub fn new(feed_url: String, timeout: Duration) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::News(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, feed_url })
    }
}

impl NewsSource for RssNewsSource {
    async fn latest(&self) -> Result<Vec<Headline>, PipelineError> {
        let response = self
            .client
            .get(&self.feed_url)
            .send()
            .await
            .map_err(|e| PipelineError::News(format!("feed request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::News(format!("feed returned {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::News(format!("feed body read failed: {e}")))?;

        let headlines = scan_items(&body);
        if headlines.is_empty() {
            return Err(PipelineError::News("feed contained no items".to_owned()));
        }
        Ok(headlines)
    }
}

/// Scan RSS text for `<item>` blocks and pull out title and link.
fn scan_items(xml: &str) -> Vec<Headline> {
    let mut headlines = Vec::new();
    let mut rest = xml;

    while let Some(open) = rest.find("<item>") {
        let Some(after_open) = open.checked_add(6).and_then(|i| rest.get(i..)) else {
            break;
        };
        let Some(close) = after_open.find("</item>") else {
            break;
        };
        let Some(item) = after_open.get(..close) else {
            break;
        };

        if let Some(title) = tag_text(item, "title") {
            let link = tag_text(item, "link").unwrap_or_default();
            if !title.is_empty() {
                headlines.push(Headline { title, link });
            }
        }

        let Some(next) = close.checked_add(7).and_then(|i| after_open.get(i..)) else {
            break;
        };
        rest = next;
    }

    headlines
}

/// Extract the text of the first `<tag>...</tag>` pair, stripping CDATA.
fn tag_text(item: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = item.find(&open)?.checked_add(open.len())?;
    let inner = item.get(start..)?;
    let end = inner.find(&close)?;
    let text = inner.get(..end)?.trim();

    let text = text
        .strip_prefix("<![CDATA[")
        .and_then(|t| t.strip_suffix("]]>"))
        .unwrap_or(text);

    Some(text.trim().to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Top stories</title>
    <link>https://news.example.com</link>
    <item>
      <title>Markets rally on rate cut hopes</title>
      <link>https://news.example.com/markets</link>
      <pubDate>Mon, 24 Aug 2026 08:00:00 GMT</pubDate>
    </item>
    <item>
      <title><![CDATA[Chipmaker announces layoffs & restructuring]]></title>
      <link>https://news.example.com/chips</link>
    </item>
    <item>
      <description>no title here</description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn scan_extracts_titles_and_links() {
        let headlines = scan_items(SAMPLE_FEED);
        assert_eq!(headlines.len(), 2);
        assert_eq!(
            headlines.first().map(|h| h.title.as_str()),
            Some("Markets rally on rate cut hopes")
        );
        assert_eq!(
            headlines.last().map(|h| h.title.as_str()),
            Some("Chipmaker announces layoffs & restructuring")
        );
        assert_eq!(
            headlines.first().map(|h| h.link.as_str()),
            Some("https://news.example.com/markets")
        );
    }

    #[test]
    fn scan_skips_the_channel_title() {
        let headlines = scan_items(SAMPLE_FEED);
        assert!(headlines.iter().all(|h| h.title != "Top stories"));
    }

    #[test]
    fn headline_embeds_in_a_json_prompt_context() {
        let headline = Headline {
            title: String::from("Markets rally on rate cut hopes"),
            link: String::from("https://news.example.com/markets"),
        };
        let context = serde_json::json!({ "headline": headline });
        assert_eq!(
            context["headline"]["title"],
            "Markets rally on rate cut hopes"
        );
    }

    #[test]
    fn scan_of_non_rss_text_is_empty() {
        assert!(scan_items("<html><body>not a feed</body></html>").is_empty());
        assert!(scan_items("").is_empty());
    }

    #[tokio::test]
    async fn unreachable_feed_is_a_news_error() {
        let source = RssNewsSource::new(
            String::from("http://127.0.0.1:1/rss"),
            Duration::from_millis(200),
        )
        .unwrap();
        assert!(source.latest().await.is_err());
    }
}
