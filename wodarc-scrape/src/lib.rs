//! Profile crawling: the ingestion collaborator feeding the normalizer.
//!
//! The crawler walks a public profile and hands each raw caption, paired
//! with its fallback key, to an [`EntrySink`] supplied by the caller. All
//! normalization, de-duplication, and persistence policy lives behind that
//! sink; the crawler only knows how to fetch and how to pace itself.
//!
//! Two ingestion paths exist, mirroring how the site can be read:
//! - [`profile::ProfileCrawler`]: full browser walk via `wodarc-browser`
//! - [`meta::MetaFetcher`]: plain HTTP, reading the `og:description` meta
//!   tag and the public profile-feed endpoint
pub mod meta;
pub mod pace;
pub mod profile;

pub use meta::{CaptionFetcher, MetaFetcher};
pub use pace::AdaptiveLimiter;
pub use profile::{CrawlReport, CrawlSpec, Credentials, ProfileCrawler};

/// One raw caption as retrieved from the source, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    /// Fallback key assigned at ingestion (post date in `YYYY-MM-DD`); only
    /// used when no date can be derived from the caption itself.
    pub original_key: String,
    /// The caption text exactly as scraped.
    pub text: String,
}

/// Whether the crawl should keep going after an entry was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Short-circuit the run; used by sinks that stop at the first
    /// already-archived post.
    Stop,
}

/// Caller-side consumer of raw entries.
///
/// Implementations own the store: they normalize, skip or stop on known
/// keys, fold new entries in, and checkpoint. The crawler never sees any of
/// that.
pub trait EntrySink {
    fn accept(&mut self, entry: RawEntry) -> anyhow::Result<Flow>;
}
