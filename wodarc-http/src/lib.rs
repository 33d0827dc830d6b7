//! Minimal HTTP client with safe logging, retries, and proxy support.
//!
//! - Request options: headers, query params, timeout, retries
//! - Retries 429/5xx with exponential backoff and `Retry-After` support
//! - Redacts sensitive query params; secrets never reach the logs
//! - Client-level proxy and User-Agent, since the scraped site treats both
//!   as part of the session fingerprint
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), wodarc_http::HttpError> {
//! let client = wodarc_http::HttpClient::new("https://www.example.com")?;
//! let html = client
//!     .get_text("some/page", wodarc_http::RequestOpts::default())
//!     .await?;
//! # let _ = html;
//! # Ok(()) }
//! ```

use std::borrow::Cow;
use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::time::sleep;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("client build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {body_snippet}")]
    Api {
        status: StatusCode,
        body_snippet: String,
    },
}

/// Per-request tuning knobs.
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub retries: Option<usize>,
    pub headers: Option<HeaderMap>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>,
}

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
    pub max_retries: usize,
}

/// Builder for [`HttpClient`]; proxy and User-Agent are client-level because
/// they must stay stable across a scraping session.
pub struct HttpClientBuilder {
    base: String,
    user_agent: Option<String>,
    proxy: Option<String>,
    timeout: Duration,
    retries: usize,
}

impl HttpClientBuilder {
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    pub fn proxy(mut self, url: impl Into<String>) -> Self {
        self.proxy = Some(url.into());
        self
    }

    pub fn timeout(mut self, dur: Duration) -> Self {
        self.timeout = dur;
        self
    }

    pub fn retries(mut self, n: usize) -> Self {
        self.retries = n;
        self
    }

    pub fn build(self) -> Result<HttpClient, HttpError> {
        let base = Url::parse(&self.base).map_err(|e| HttpError::Url(e.to_string()))?;
        let mut builder = Client::builder().connect_timeout(Duration::from_secs(5));
        if let Some(ua) = &self.user_agent {
            builder = builder.user_agent(ua.clone());
        }
        if let Some(proxy) = &self.proxy {
            let proxy = reqwest::Proxy::all(proxy).map_err(|e| HttpError::Build(e.to_string()))?;
            builder = builder.proxy(proxy);
        }
        let inner = builder.build().map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(HttpClient {
            base,
            inner,
            default_timeout: self.timeout,
            max_retries: self.retries,
        })
    }
}

impl HttpClient {
    /// Construct a client anchored to a base URL with default settings.
    pub fn new(base: &str) -> Result<Self, HttpError> {
        Self::builder(base).build()
    }

    /// Start a builder for a customised client.
    pub fn builder(base: &str) -> HttpClientBuilder {
        HttpClientBuilder {
            base: base.to_string(),
            user_agent: None,
            proxy: None,
            timeout: Duration::from_secs(15),
            retries: 2,
        }
    }

    /// GET a JSON document and deserialize it.
    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        let bytes = self.request(Method::GET, path, opts).await?;
        let snippet = snip_body(&bytes);
        serde_json::from_slice::<T>(&bytes).map_err(|e| {
            tracing::warn!(
                serde_err = %e,
                body_snippet = %snippet,
                "http.response.decode_error"
            );
            HttpError::Decode(e.to_string(), snippet)
        })
    }

    /// GET a document as text (HTML pages, mostly).
    pub async fn get_text(&self, path: &str, opts: RequestOpts<'_>) -> Result<String, HttpError> {
        let bytes = self.request(Method::GET, path, opts).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        opts: RequestOpts<'_>,
    ) -> Result<Vec<u8>, HttpError> {
        let url = self
            .base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))?;

        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let max_retries = opts.retries.unwrap_or(self.max_retries);
        let mut attempt = 0usize;

        loop {
            let mut rb = self.inner.request(method.clone(), url.clone()).timeout(timeout);
            if let Some(q) = &opts.query {
                let pairs: Vec<(&str, &str)> = q.iter().map(|(k, v)| (*k, v.as_ref())).collect();
                rb = rb.query(&pairs);
            }
            if let Some(hdrs) = &opts.headers {
                rb = rb.headers(hdrs.clone());
            }

            tracing::debug!(
                attempt = attempt + 1,
                max_retries,
                method = %method,
                host_path = %format!("{}{}", url.domain().unwrap_or("-"), url.path()),
                query = ?redact_query_pairs(opts.query.as_deref()),
                timeout_ms = timeout.as_millis() as u64,
                "http.request.start"
            );

            let t0 = std::time::Instant::now();
            let resp = match rb.send().await {
                Ok(resp) => resp,
                Err(err) => {
                    if attempt < max_retries {
                        attempt += 1;
                        let delay = backoff_delay(attempt);
                        tracing::warn!(
                            attempt,
                            max_retries,
                            backoff_ms = delay.as_millis() as u64,
                            error = %err,
                            "http.retrying.network"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    return Err(HttpError::Network(err.to_string()));
                }
            };

            let status = resp.status();
            let headers = resp.headers().clone();
            let bytes = match resp.bytes().await {
                Ok(bytes) => bytes.to_vec(),
                Err(err) => {
                    if attempt < max_retries {
                        attempt += 1;
                        let delay = backoff_delay(attempt);
                        tracing::warn!(
                            attempt,
                            max_retries,
                            backoff_ms = delay.as_millis() as u64,
                            error = %err,
                            "http.retrying.body"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    return Err(HttpError::Network(err.to_string()));
                }
            };

            tracing::debug!(
                %status,
                duration_ms = t0.elapsed().as_millis() as u64,
                body_len = bytes.len(),
                "http.response"
            );

            if status.is_success() {
                return Ok(bytes);
            }

            let snippet = snip_body(&bytes);
            let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if retryable && attempt < max_retries {
                attempt += 1;
                let delay = match retry_after_delay_secs(&headers) {
                    Some(secs) => Duration::from_secs(secs),
                    None => {
                        let exp = backoff_delay(attempt);
                        if status == StatusCode::TOO_MANY_REQUESTS {
                            // Floor for 429 when no Retry-After is present.
                            exp.max(Duration::from_millis(1100))
                        } else {
                            exp
                        }
                    }
                };
                tracing::warn!(
                    %status,
                    attempt,
                    max_retries,
                    backoff_ms = delay.as_millis() as u64,
                    body_snippet = %snippet,
                    "http.retrying"
                );
                sleep(delay).await;
                continue;
            }

            tracing::warn!(%status, body_snippet = %snippet, "http.error");
            return Err(HttpError::Api {
                status,
                body_snippet: snippet,
            });
        }
    }
}

fn backoff_delay(attempt: usize) -> Duration {
    Duration::from_millis(200u64.saturating_mul(1 << (attempt - 1)))
}

fn retry_after_delay_secs(h: &HeaderMap) -> Option<u64> {
    h.get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())?
        .parse()
        .ok()
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > 500 {
        snip.truncate(500);
        snip.push_str("...");
    }
    snip
}

fn redact_query_pairs(query: Option<&[(&str, Cow<'_, str>)]>) -> Vec<(String, String)> {
    query
        .map(|q| {
            q.iter()
                .map(|(k, v)| {
                    let is_secret = matches!(
                        k.to_ascii_lowercase().as_str(),
                        "access_token" | "auth" | "key" | "api_key" | "token" | "secret"
                            | "password" | "sessionid"
                    );
                    (
                        (*k).to_string(),
                        if is_secret {
                            "<redacted>".to_string()
                        } else {
                            v.as_ref().to_string()
                        },
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(backoff_delay(1), Duration::from_millis(200));
        assert_eq!(backoff_delay(2), Duration::from_millis(400));
        assert_eq!(backoff_delay(3), Duration::from_millis(800));
    }

    #[test]
    fn snip_truncates_long_bodies() {
        let body = vec![b'x'; 2000];
        let snip = snip_body(&body);
        assert!(snip.len() <= 503);
        assert!(snip.ends_with("..."));
    }

    #[test]
    fn secret_query_params_are_redacted() {
        let q: Vec<(&str, Cow<'_, str>)> = vec![
            ("username", "cfgn_ej".into()),
            ("sessionid", "abc123".into()),
        ];
        let redacted = redact_query_pairs(Some(&q));
        assert_eq!(redacted[0].1, "cfgn_ej");
        assert_eq!(redacted[1].1, "<redacted>");
    }

    #[test]
    fn retry_after_parses_seconds() {
        let mut h = HeaderMap::new();
        h.insert(RETRY_AFTER, "30".parse().unwrap());
        assert_eq!(retry_after_delay_secs(&h), Some(30));
        h.insert(RETRY_AFTER, "soon".parse().unwrap());
        assert_eq!(retry_after_delay_secs(&h), None);
    }
}
