use crate::{humanize::Humanizer, stealth::Evasions};
use anyhow::Result;
use fantoccini::{elements::Element, Client, Locator};

/// High-level page wrapper providing element queries, scripts, and
/// screenshots.
pub struct Page {
    pub(crate) client: Client,
    pub(crate) humanizer: Humanizer,
}

impl Page {
    /// Construct a page wrapper around an existing WebDriver client.
    pub fn new(client: Client, humanizer: Humanizer) -> Self {
        Self { client, humanizer }
    }

    /// Navigate to `url` and apply the evasion scripts.
    pub async fn goto(&mut self, url: &str) -> Result<()> {
        self.humanizer.random_delay(300, 1200).await;
        self.client.goto(url).await?;
        self.client.execute(Evasions::core(), vec![]).await?;
        Ok(())
    }

    /// Return the full page HTML source.
    pub async fn content(&self) -> Result<String> {
        self.client.source().await.map_err(anyhow::Error::from)
    }

    /// Return the current page URL.
    pub async fn url(&self) -> Result<String> {
        self.client
            .current_url()
            .await
            .map(|url| url.to_string())
            .map_err(anyhow::Error::from)
    }

    /// Wait for an element matching the CSS selector to appear.
    pub async fn wait_for(&self, selector: &str) -> Result<PageElement> {
        self.humanizer.random_delay(100, 500).await;
        let element = self
            .client
            .wait()
            .for_element(Locator::Css(selector))
            .await?;
        Ok(PageElement::new(element, &self.humanizer))
    }

    /// Find the first element matching the selector, if any is present right
    /// now (no waiting).
    pub async fn find_first(&self, selector: &str) -> Result<Option<PageElement>> {
        Ok(self.find_all(selector).await?.into_iter().next())
    }

    /// Find zero or more elements by CSS selector.
    pub async fn find_all(&self, selector: &str) -> Result<Vec<PageElement>> {
        let elements = self.client.find_all(Locator::Css(selector)).await?;
        Ok(elements
            .into_iter()
            .map(|element| PageElement::new(element, &self.humanizer))
            .collect())
    }

    /// Execute a JavaScript snippet in the page.
    pub async fn execute(&self, script: &str) -> Result<serde_json::Value> {
        self.client
            .execute(script, vec![])
            .await
            .map_err(anyhow::Error::from)
    }

    /// Capture a PNG screenshot to `path` (debugging aid for failed runs).
    pub async fn screenshot(&self, path: &std::path::Path) -> Result<()> {
        let png = self.client.screenshot().await?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, png)?;
        tracing::info!(path = %path.display(), "browser.screenshot");
        Ok(())
    }
}

#[derive(Clone)]
/// Wrapper for DOM elements with typed helpers consistent with [`Page`].
pub struct PageElement {
    pub element: Element,
    pub humanizer: Humanizer,
}

impl PageElement {
    pub fn new(element: Element, humanizer: &Humanizer) -> Self {
        Self {
            element,
            humanizer: humanizer.clone(),
        }
    }

    /// Type into the element using human-like timings.
    pub async fn type_str(&self, text: &str) -> Result<()> {
        self.humanizer.type_text(&self.element, text).await
    }

    /// Click the element.
    pub async fn click(&self) -> Result<()> {
        self.element.clone().click().await?;
        Ok(())
    }

    /// Read an attribute value.
    pub async fn attr(&self, attribute: &str) -> Result<Option<String>> {
        self.element
            .attr(attribute)
            .await
            .map_err(anyhow::Error::from)
    }

    /// Return the element's visible text.
    pub async fn text(&self) -> Result<String> {
        self.element.text().await.map_err(anyhow::Error::from)
    }
}
