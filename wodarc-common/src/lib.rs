//! Shared error type and observability helpers for the wodarc workspace.
//!
//! Kept deliberately small so every crate can depend on it without heavy
//! transitive costs.
//!
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`WodarcError`] and [`Result`]: shared error handling

pub mod observability;

/// Error types used across the wodarc workspace.
///
/// The normalizer and merger have no error path of their own; these variants
/// belong to the integration layers around them.
#[derive(thiserror::Error, Debug)]
pub enum WodarcError {
    /// The scraper could not produce entries (no posts found, caption
    /// extraction failed for every candidate).
    #[error("Scrape error: {0}")]
    Scrape(String),

    /// A driver (browser, network) reported an error.
    #[error("Driver error: {0}")]
    Driver(#[from] anyhow::Error),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The record store could not be written.
    #[error("Store error: {0}")]
    Store(String),
}

/// Convenient alias for results that use [`WodarcError`].
pub type Result<T> = std::result::Result<T, WodarcError>;
