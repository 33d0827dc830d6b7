use crate::{
    agent::AgentPool,
    humanize::Humanizer,
    page::Page,
    stealth::chrome_arguments,
};
use anyhow::Result;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use std::collections::HashMap;
use webdriver::capabilities::Capabilities;

const WEBDRIVER_URL_ENV: &str = "WODARC_WEBDRIVER_URL";
const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

/// Thin wrapper around a `fantoccini` WebDriver client with stealth and
/// behavioral helpers.
pub struct Browser {
    pub client: Client,
    pub humanizer: Humanizer,
    pub agent_pool: AgentPool,
}

impl Browser {
    /// Create a new session against a running WebDriver service.
    ///
    /// Connects to `$WODARC_WEBDRIVER_URL`, defaulting to a local
    /// chromedriver at `http://localhost:9515`.
    pub async fn connect(headless: bool, proxy: Option<&str>) -> Result<Self> {
        let mut agent_pool = AgentPool::new();
        let agent = agent_pool.session_profile().clone();
        tracing::info!(
            user_agent = %agent.user_agent,
            viewport = ?agent.viewport,
            headless,
            "browser.session_profile"
        );

        let mut caps = Capabilities::new();
        let mut chrome_opts = HashMap::new();
        chrome_opts.insert(
            "args".to_string(),
            json!(chrome_arguments(&agent, headless, proxy)),
        );
        caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));

        let webdriver_url = std::env::var(WEBDRIVER_URL_ENV)
            .unwrap_or_else(|_| DEFAULT_WEBDRIVER_URL.to_string());
        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&webdriver_url)
            .await?;

        Ok(Self {
            client,
            humanizer: Humanizer::new(),
            agent_pool,
        })
    }

    /// Navigate to `url` and return a [`Page`] with evasion scripts applied.
    pub async fn goto(&mut self, url: &str) -> Result<Page> {
        let mut page = Page::new(self.client.clone(), self.humanizer.clone());
        page.goto(url).await?;
        Ok(page)
    }

    /// Close the underlying browser session.
    pub async fn close(self) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }
}
