//! Browser-driven profile walk.
//!
//! Mirrors how a person reads a profile: land on the page, dismiss whatever
//! popup is in the way, scroll a little, then open recent posts one by one.
//! Selectors come as fallback lists because the site's markup shifts often;
//! the first one that matches wins.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Local;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use wodarc_browser::{Browser, Page};

use crate::pace::AdaptiveLimiter;
use crate::{EntrySink, Flow, RawEntry};

const BASE_URL: &str = "https://www.instagram.com";

/// Consent banners show these labels depending on locale and rollout.
const COOKIE_BUTTON_LABELS: &[&str] = &[
    "Allow all cookies",
    "Allow essential and optional cookies",
    "Accept All",
    "Accept",
    "허용",
    "Decline optional cookies",
];

const DISMISS_BUTTON_LABELS: &[&str] = &["Not now", "Not Now"];

const USERNAME_SELECTORS: &[&str] = &[
    "input[name='username']",
    "input[aria-label='Phone number, username, or email']",
    "input[autocomplete='username']",
    "form input[type='text']",
];

const PASSWORD_SELECTORS: &[&str] = &[
    "input[name='password']",
    "input[aria-label='Password']",
    "input[autocomplete='current-password']",
    "input[type='password']",
];

const POST_LINK_SELECTORS: &[&str] = &[
    "a[href*='/p/']",
    "article a[href*='/p/']",
    "main a[href*='/p/']",
];

/// Elements that only render once a session is authenticated.
const HOME_INDICATORS: &[&str] = &[
    "svg[aria-label='Home']",
    "svg[aria-label='홈']",
    "a[href*='/direct/']",
    "nav",
];

const CAPTION_SELECTORS: &[&str] = &[
    "div[class*='Caption'] span",
    "h1 + span",
    "article span[class*='x193iq5w']",
];

/// Captions shorter than this are assumed to be UI chrome, not content.
const MIN_CAPTION_LEN: usize = 20;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// What to crawl and how far to go.
#[derive(Debug, Clone)]
pub struct CrawlSpec {
    /// Profile to walk.
    pub username: String,
    /// Log in first when present; public profiles work without it but get
    /// rate-limited sooner.
    pub login: Option<Credentials>,
    /// Cap on posts opened per run.
    pub max_posts: usize,
    /// Skip this many of the newest posts (pinned posts, announcements).
    pub skip_first: usize,
    /// Where to drop screenshots and page dumps when a run goes wrong.
    pub debug_dir: Option<PathBuf>,
}

impl CrawlSpec {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            login: None,
            max_posts: 12,
            skip_first: 0,
            debug_dir: None,
        }
    }
}

/// What a crawl run accomplished.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrawlReport {
    /// Entries handed to the sink.
    pub delivered: usize,
    /// Posts opened but dropped (no caption found).
    pub skipped: usize,
    /// The sink asked to stop before the post list ran out.
    pub stopped_early: bool,
}

pub struct ProfileCrawler {
    spec: CrawlSpec,
    limiter: AdaptiveLimiter,
}

impl ProfileCrawler {
    pub fn new(spec: CrawlSpec, limiter: AdaptiveLimiter) -> Self {
        Self { spec, limiter }
    }

    /// Walk the profile and deliver each caption to `sink`.
    ///
    /// Fails when no post links can be found at all (after writing debug
    /// artifacts); individual post failures are logged and skipped.
    pub async fn crawl(
        &mut self,
        browser: &mut Browser,
        sink: &mut dyn EntrySink,
    ) -> Result<CrawlReport> {
        if let Some(creds) = self.spec.login.clone() {
            match self.login(browser, &creds).await {
                Ok(true) => info!("crawl.login.ok"),
                Ok(false) => warn!("crawl.login.unverified, continuing unauthenticated"),
                Err(err) => warn!(error = %err, "crawl.login.failed, continuing unauthenticated"),
            }
        }

        let profile_url = format!("{BASE_URL}/{}/", self.spec.username);
        info!(url = %profile_url, "crawl.profile.goto");
        let mut page = browser.goto(&profile_url).await?;
        sleep(Duration::from_secs(3)).await;

        click_button_with_text(&page, COOKIE_BUTTON_LABELS).await;
        dismiss_overlay(&page).await;

        // Nudge lazy loading, then return to the top where recent posts sit.
        page.execute("window.scrollTo(0, document.body.scrollHeight / 2)")
            .await?;
        sleep(Duration::from_secs(2)).await;
        page.execute("window.scrollTo(0, 0)").await?;
        sleep(Duration::from_secs(1)).await;

        let post_paths = self.collect_post_paths(&page).await?;
        if post_paths.is_empty() {
            self.dump_debug_artifacts(&page, "no_posts").await;
            bail!("no post links found on profile @{}", self.spec.username);
        }
        info!(posts = post_paths.len(), "crawl.profile.posts_found");

        let mut report = CrawlReport::default();
        for (i, path) in post_paths.iter().enumerate().skip(self.spec.skip_first) {
            self.limiter.wait().await;
            let url = format!("{BASE_URL}{path}");
            info!(n = i + 1, total = post_paths.len(), url = %url, "crawl.post.goto");

            let caption = match self.fetch_caption(&mut page, &url).await {
                Ok(Some(text)) => {
                    self.limiter.reset_errors();
                    text
                }
                Ok(None) => {
                    warn!(url = %url, "crawl.post.no_caption");
                    report.skipped += 1;
                    continue;
                }
                Err(err) => {
                    warn!(url = %url, error = %err, "crawl.post.failed");
                    self.limiter.backoff().await;
                    continue;
                }
            };

            let entry = RawEntry {
                original_key: Local::now().format("%Y-%m-%d").to_string(),
                text: caption,
            };
            report.delivered += 1;
            if sink.accept(entry)? == Flow::Stop {
                info!("crawl.sink.stop");
                report.stopped_early = true;
                break;
            }
        }
        Ok(report)
    }

    /// Gather unique post paths from the grid, first selector that matches.
    async fn collect_post_paths(&self, page: &Page) -> Result<Vec<String>> {
        let mut links = Vec::new();
        for selector in POST_LINK_SELECTORS {
            links = page.find_all(selector).await.unwrap_or_default();
            if !links.is_empty() {
                debug!(selector, count = links.len(), "crawl.posts.selector_hit");
                break;
            }
        }

        let mut seen = HashSet::new();
        let mut paths = Vec::new();
        for link in links {
            let Some(href) = link.attr("href").await? else {
                continue;
            };
            if href.contains("/p/") && seen.insert(href.clone()) {
                // hrefs may come absolute depending on rendering mode
                let path = href
                    .strip_prefix(BASE_URL)
                    .map(str::to_string)
                    .unwrap_or(href);
                paths.push(path);
            }
            if paths.len() >= self.spec.max_posts {
                break;
            }
        }
        Ok(paths)
    }

    /// Open a post and pull its caption, meta tag first, visible spans as
    /// fallback.
    async fn fetch_caption(&self, page: &mut Page, url: &str) -> Result<Option<String>> {
        page.goto(url).await?;

        if let Some(meta) = page.find_first("meta[property='og:description']").await? {
            if let Some(content) = meta.attr("content").await? {
                if !content.trim().is_empty() {
                    return Ok(Some(content));
                }
            }
        }

        for selector in CAPTION_SELECTORS {
            if let Some(elem) = page.find_first(selector).await? {
                let text = elem.text().await.unwrap_or_default();
                if text.len() > MIN_CAPTION_LEN {
                    return Ok(Some(text));
                }
            }
        }
        Ok(None)
    }

    /// Run the login form. `Ok(true)` means verified, `Ok(false)` means the
    /// outcome could not be confirmed.
    async fn login(&mut self, browser: &mut Browser, creds: &Credentials) -> Result<bool> {
        info!("crawl.login.start");
        let page = browser.goto(&format!("{BASE_URL}/accounts/login/")).await?;
        sleep(Duration::from_secs(5)).await;

        click_button_with_text(&page, COOKIE_BUTTON_LABELS).await;
        self.dump_debug_artifacts(&page, "login_page").await;

        let username_input = first_matching(&page, USERNAME_SELECTORS)
            .await
            .context("login form: username input not found")?;
        let password_input = first_matching(&page, PASSWORD_SELECTORS)
            .await
            .context("login form: password input not found")?;

        username_input.type_str(&creds.username).await?;
        sleep(Duration::from_millis(500)).await;
        password_input.type_str(&creds.password).await?;
        sleep(Duration::from_millis(500)).await;

        if let Some(submit) = page.find_first("button[type='submit']").await? {
            submit.click().await?;
        } else if !click_button_with_text(&page, &["Log in", "Log In"]).await {
            bail!("login form: submit button not found");
        }
        // Login round-trips through several redirects.
        sleep(Duration::from_secs(8)).await;

        // "Save login info" and notification prompts, in that order.
        for _ in 0..2 {
            if click_button_with_text(&page, DISMISS_BUTTON_LABELS).await {
                sleep(Duration::from_secs(2)).await;
            }
        }

        let current_url = page.url().await?;
        debug!(url = %current_url, "crawl.login.landed");
        if current_url.contains("/challenge") {
            self.dump_debug_artifacts(&page, "challenge").await;
            bail!("login requires additional verification (challenge page)");
        }

        for indicator in HOME_INDICATORS {
            if page.find_first(indicator).await?.is_some() {
                debug!(indicator, "crawl.login.indicator");
                return Ok(true);
            }
        }
        if !current_url.contains("/accounts/login") {
            return Ok(true);
        }

        self.dump_debug_artifacts(&page, "login_failed").await;
        Ok(false)
    }

    /// Best-effort screenshot and HTML dump for postmortems.
    async fn dump_debug_artifacts(&self, page: &Page, tag: &str) {
        let Some(dir) = &self.spec.debug_dir else {
            return;
        };
        if let Err(err) = page.screenshot(&dir.join(format!("debug_{tag}.png"))).await {
            warn!(error = %err, tag, "crawl.debug.screenshot_failed");
        }
        match page.content().await {
            Ok(html) => {
                let path = dir.join(format!("debug_{tag}.html"));
                if let Err(err) = std::fs::write(&path, html) {
                    warn!(error = %err, tag, "crawl.debug.html_failed");
                }
            }
            Err(err) => warn!(error = %err, tag, "crawl.debug.content_failed"),
        }
    }
}

/// WebDriver CSS cannot match on text, so scan buttons and compare labels.
/// Returns whether anything was clicked.
async fn click_button_with_text(page: &Page, labels: &[&str]) -> bool {
    let buttons = match page.find_all("button, div[role='button']").await {
        Ok(buttons) => buttons,
        Err(_) => return false,
    };
    for button in buttons {
        let Ok(text) = button.text().await else {
            continue;
        };
        let text = text.trim();
        if labels.iter().any(|label| text.eq_ignore_ascii_case(label)) {
            if button.click().await.is_ok() {
                debug!(label = text, "crawl.button.clicked");
                return true;
            }
        }
    }
    false
}

/// Close whatever modal sits over the profile (login nag, mostly).
async fn dismiss_overlay(page: &Page) {
    for selector in ["[aria-label='Close']", "svg[aria-label='Close']"] {
        if let Ok(Some(close)) = page.find_first(selector).await {
            if close.click().await.is_ok() {
                debug!(selector, "crawl.overlay.closed");
                return;
            }
        }
    }
    click_button_with_text(page, DISMISS_BUTTON_LABELS).await;
}

/// First present element from a selector fallback list.
async fn first_matching(
    page: &Page,
    selectors: &[&str],
) -> Option<wodarc_browser::PageElement> {
    for selector in selectors {
        if let Ok(Some(elem)) = page.find_first(selector).await {
            debug!(selector, "crawl.selector_hit");
            return Some(elem);
        }
    }
    None
}
