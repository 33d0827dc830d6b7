//! HTTP-only ingestion: captions via page metadata and the profile feed.
//!
//! When a full browser session is unavailable, two lighter reads still work
//! against public profiles: the `og:description` meta tag of a post page
//! (which wraps the caption in a `"N likes, M comments - user on DATE"`
//! envelope that [`wodarc_core::clean_boilerplate`] later strips), and the
//! JSON profile-feed endpoint that carries captions directly.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Local, TimeZone};
use regex::Regex;
use serde::Deserialize;
use wodarc_http::{HttpClient, RequestOpts};

use crate::RawEntry;

const BASE_URL: &str = "https://www.instagram.com";

/// App id the site's own web client sends; required by the feed endpoint.
const WEB_APP_ID: &str = "936619743392459";

static OG_DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*property=["']og:description["'][^>]*content=["']([^"']*)["']"#)
        .expect("og:description pattern")
});

/// Anything that can turn a post path into a raw caption.
#[async_trait]
pub trait CaptionFetcher {
    /// Fetch the caption for a post path like `/p/AbCdEf123/`, or `None`
    /// when the page carries no usable description.
    async fn caption_for_post(&self, post_path: &str) -> Result<Option<String>>;
}

pub struct MetaFetcher {
    http: HttpClient,
}

impl MetaFetcher {
    pub fn new(user_agent: &str, proxy: Option<&str>) -> Result<Self> {
        let mut builder = HttpClient::builder(BASE_URL).user_agent(user_agent);
        if let Some(proxy) = proxy {
            builder = builder.proxy(proxy);
        }
        let http = builder.build().context("building scrape http client")?;
        Ok(Self { http })
    }

    /// Read the recent posts of a profile through the public feed endpoint.
    ///
    /// Each entry's fallback key is the post's local date; captions arrive
    /// API-clean (no metadata wrapper), so callers skip the wrapper-removal
    /// step for these.
    pub async fn profile_feed(&self, username: &str) -> Result<Vec<RawEntry>> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("x-ig-app-id", WEB_APP_ID.parse().expect("static header"));

        let feed: WebProfileFeed = self
            .http
            .get_json(
                "api/v1/users/web_profile_info/",
                RequestOpts {
                    headers: Some(headers),
                    query: Some(vec![("username", username.into())]),
                    ..Default::default()
                },
            )
            .await
            .context("fetching profile feed")?;

        let Some(user) = feed.data.user else {
            tracing::warn!(username, "scrape.feed.profile_missing");
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for edge in user.edge_owner_to_timeline_media.edges {
            let node = edge.node;
            let Some(caption) = node
                .edge_media_to_caption
                .edges
                .into_iter()
                .next()
                .map(|e| e.node.text)
            else {
                tracing::debug!(shortcode = %node.shortcode, "scrape.feed.no_caption");
                continue;
            };
            let original_key = Local
                .timestamp_opt(node.taken_at_timestamp, 0)
                .single()
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| Local::now().format("%Y-%m-%d").to_string());
            entries.push(RawEntry {
                original_key,
                text: caption,
            });
        }
        tracing::info!(username, posts = entries.len(), "scrape.feed.fetched");
        Ok(entries)
    }
}

#[async_trait]
impl CaptionFetcher for MetaFetcher {
    async fn caption_for_post(&self, post_path: &str) -> Result<Option<String>> {
        let html = self
            .http
            .get_text(post_path, RequestOpts::default())
            .await
            .with_context(|| format!("fetching post page {post_path}"))?;
        Ok(extract_meta_description(&html))
    }
}

/// Pull the `og:description` content out of a post page.
pub fn extract_meta_description(html: &str) -> Option<String> {
    let caps = OG_DESCRIPTION.captures(html)?;
    let raw = caps.get(1)?.as_str();
    let text = unescape_entities(raw);
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Decode the handful of HTML entities the site emits in meta content.
///
/// `&amp;` is decoded last so double-escaped sequences do not re-expand.
fn unescape_entities(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&#34;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&#10;", "\n")
        .replace("&amp;", "&")
}

// ----- Feed endpoint shapes (only the fields we read) -----

#[derive(Debug, Deserialize)]
struct WebProfileFeed {
    data: FeedData,
}

#[derive(Debug, Deserialize)]
struct FeedData {
    user: Option<FeedUser>,
}

#[derive(Debug, Deserialize)]
struct FeedUser {
    edge_owner_to_timeline_media: MediaConnection,
}

#[derive(Debug, Deserialize)]
struct MediaConnection {
    edges: Vec<MediaEdge>,
}

#[derive(Debug, Deserialize)]
struct MediaEdge {
    node: MediaNode,
}

#[derive(Debug, Deserialize)]
struct MediaNode {
    shortcode: String,
    taken_at_timestamp: i64,
    edge_media_to_caption: CaptionConnection,
}

#[derive(Debug, Deserialize)]
struct CaptionConnection {
    edges: Vec<CaptionEdge>,
}

#[derive(Debug, Deserialize)]
struct CaptionEdge {
    node: CaptionNode,
}

#[derive(Debug, Deserialize)]
struct CaptionNode {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_description_from_meta_tag() {
        let html = r#"<html><head>
            <meta property="og:title" content="Post" />
            <meta property="og:description" content="45 likes, 2 comments - user on January 6, 2026: &quot;20260106 W.O.D!!&#10;&#10;For time&quot;." />
        </head></html>"#;
        let text = extract_meta_description(html).unwrap();
        assert!(text.starts_with("45 likes"));
        assert!(text.contains("20260106 W.O.D!!"));
        assert!(text.contains("\n\nFor time"));
    }

    #[test]
    fn missing_or_empty_meta_yields_none() {
        assert_eq!(extract_meta_description("<html></html>"), None);
        let empty = r#"<meta property="og:description" content="" />"#;
        assert_eq!(extract_meta_description(empty), None);
    }

    #[test]
    fn entities_unescape_in_safe_order() {
        assert_eq!(unescape_entities("&amp;quot;"), "&quot;");
        assert_eq!(unescape_entities("a &amp; b &quot;c&quot;"), "a & b \"c\"");
        assert_eq!(unescape_entities("don&#39;t"), "don't");
    }

    #[test]
    fn feed_shapes_deserialize() {
        let body = r#"{
            "data": { "user": { "edge_owner_to_timeline_media": { "edges": [
                { "node": {
                    "shortcode": "AbC123",
                    "taken_at_timestamp": 1767052800,
                    "edge_media_to_caption": { "edges": [
                        { "node": { "text": "20260106 W.O.D!!\n\nFor time" } }
                    ] }
                } }
            ] } } }
        }"#;
        let feed: WebProfileFeed = serde_json::from_str(body).unwrap();
        let user = feed.data.user.unwrap();
        let node = &user.edge_owner_to_timeline_media.edges[0].node;
        assert_eq!(node.shortcode, "AbC123");
        assert_eq!(
            node.edge_media_to_caption.edges[0].node.text,
            "20260106 W.O.D!!\n\nFor time"
        );
    }
}
