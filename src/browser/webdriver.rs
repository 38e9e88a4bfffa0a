use async_trait::async_trait;
use log::{debug, info, warn};
use thirtyfour::prelude::*;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use url::Url;

use super::{Browser, BrowserCookie, Locator};
use crate::core::config::BrowserConfig;
use crate::{FetchError, FetchResult};

/// Chrome driven through a WebDriver server such as chromedriver.
pub struct WebDriverBrowser {
    driver: Mutex<Option<WebDriver>>,
}

fn by(locator: &Locator) -> By {
    match locator {
        Locator::Id(id) => By::Id(id.as_str()),
        Locator::Css(selector) => By::Css(selector.as_str()),
    }
}

impl WebDriverBrowser {
    pub async fn launch(config: &BrowserConfig) -> FetchResult<Self> {
        let mut caps = DesiredCapabilities::chrome();
        if config.headless {
            caps.add_chrome_arg("--headless=new")?;
        }
        for arg in &config.chrome_args {
            caps.add_chrome_arg(arg)?;
        }

        info!(
            "Connecting to WebDriver at {} (headless={})",
            config.webdriver_url, config.headless
        );
        let driver = WebDriver::new(&config.webdriver_url, caps).await?;

        Ok(Self {
            driver: Mutex::new(Some(driver)),
        })
    }

    async fn session(&self) -> FetchResult<MappedMutexGuard<'_, WebDriver>> {
        MutexGuard::try_map(self.driver.lock().await, |driver| driver.as_mut())
            .map_err(|_| FetchError::SessionClosed)
    }

    async fn first(&self, locator: &Locator) -> FetchResult<Option<WebElement>> {
        let driver = self.session().await?;
        let found = driver.find_all(by(locator)).await?;
        Ok(found.into_iter().next())
    }

    async fn require(&self, locator: &Locator) -> FetchResult<WebElement> {
        self.first(locator)
            .await?
            .ok_or_else(|| FetchError::ElementNotFound(locator.to_string()))
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn goto(&self, url: &Url) -> FetchResult<()> {
        debug!("Navigating to {}", url);
        self.session().await?.goto(url.as_str()).await?;
        Ok(())
    }

    async fn is_present(&self, locator: &Locator) -> FetchResult<bool> {
        Ok(self.first(locator).await?.is_some())
    }

    async fn click(&self, locator: &Locator) -> FetchResult<()> {
        debug!("Clicking {}", locator);
        self.require(locator).await?.click().await?;
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> FetchResult<()> {
        self.require(locator).await?.send_keys(text).await?;
        Ok(())
    }

    async fn clear(&self, locator: &Locator) -> FetchResult<()> {
        self.require(locator).await?.clear().await?;
        Ok(())
    }

    async fn submit(&self, locator: &Locator) -> FetchResult<()> {
        self.require(locator)
            .await?
            .send_keys(Key::Return.to_string())
            .await?;
        Ok(())
    }

    async fn text(&self, locator: &Locator) -> FetchResult<Option<String>> {
        match self.first(locator).await? {
            Some(element) => Ok(Some(element.text().await?)),
            None => Ok(None),
        }
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> FetchResult<Option<String>> {
        match self.first(locator).await? {
            Some(element) => Ok(element.attr(name).await?),
            None => Ok(None),
        }
    }

    async fn attributes(&self, locator: &Locator, name: &str) -> FetchResult<Vec<Option<String>>> {
        let elements = self.session().await?.find_all(by(locator)).await?;
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            values.push(element.attr(name).await?);
        }
        Ok(values)
    }

    async fn inner_html(&self, locator: &Locator) -> FetchResult<Option<String>> {
        match self.first(locator).await? {
            Some(element) => Ok(Some(element.inner_html().await?)),
            None => Ok(None),
        }
    }

    async fn is_displayed(&self, locator: &Locator) -> FetchResult<bool> {
        match self.first(locator).await? {
            Some(element) => Ok(element.is_displayed().await?),
            None => Ok(false),
        }
    }

    async fn title(&self) -> FetchResult<String> {
        Ok(self.session().await?.title().await?)
    }

    async fn cookies(&self) -> FetchResult<Vec<BrowserCookie>> {
        let cookies = self.session().await?.get_all_cookies().await?;
        Ok(cookies
            .iter()
            .map(|c| BrowserCookie::new(c.name(), c.value()))
            .collect())
    }

    async fn quit(&self) -> FetchResult<()> {
        let driver = self.driver.lock().await.take();
        match driver {
            Some(driver) => {
                info!("Closing browser session");
                driver.quit().await?;
            }
            None => warn!("Browser session was already closed"),
        }
        Ok(())
    }
}
