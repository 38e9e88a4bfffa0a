//! The browser seam: everything the site logic needs from a driven browser.
//!
//! Elements are addressed by [`Locator`] on every call rather than held as
//! handles, so an implementation only has to answer "what is on the current
//! page right now".

pub mod html;
pub mod webdriver;

use async_trait::async_trait;
use log::trace;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use url::Url;

use crate::{FetchError, FetchResult};

pub use html::HtmlBrowser;
pub use webdriver::WebDriverBrowser;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Id(String),
    Css(String),
}

impl Locator {
    pub fn id(id: impl Into<String>) -> Self {
        Locator::Id(id.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    /// CSS form of the locator. Ids go through an attribute selector so
    /// they need no escaping.
    pub fn to_css(&self) -> String {
        match self {
            Locator::Id(id) => format!(
                "[id=\"{}\"]",
                id.replace('\\', "\\\\").replace('"', "\\\"")
            ),
            Locator::Css(selector) => selector.clone(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id(id) => write!(f, "#{}", id),
            Locator::Css(selector) => f.write_str(selector),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
}

impl BrowserCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// How long to keep polling for a condition, and how often.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wait {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Wait {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            interval: Duration::from_millis(500),
        }
    }

    pub fn every(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

#[async_trait]
pub trait Browser: Send + Sync {
    async fn goto(&self, url: &Url) -> FetchResult<()>;

    /// Whether at least one element matches on the current page.
    async fn is_present(&self, locator: &Locator) -> FetchResult<bool>;

    async fn click(&self, locator: &Locator) -> FetchResult<()>;

    async fn type_text(&self, locator: &Locator, text: &str) -> FetchResult<()>;

    /// Empties an input so the next `type_text` starts from nothing.
    async fn clear(&self, locator: &Locator) -> FetchResult<()>;

    /// Presses Return inside the element.
    async fn submit(&self, locator: &Locator) -> FetchResult<()>;

    /// Visible text of the first match, `None` when nothing matches.
    async fn text(&self, locator: &Locator) -> FetchResult<Option<String>>;

    async fn attribute(&self, locator: &Locator, name: &str) -> FetchResult<Option<String>>;

    /// `name` of every match, in document order.
    async fn attributes(&self, locator: &Locator, name: &str) -> FetchResult<Vec<Option<String>>>;

    /// Inner HTML of the first match, `None` when nothing matches.
    async fn inner_html(&self, locator: &Locator) -> FetchResult<Option<String>>;

    /// `false` when nothing matches.
    async fn is_displayed(&self, locator: &Locator) -> FetchResult<bool>;

    async fn title(&self) -> FetchResult<String>;

    async fn cookies(&self) -> FetchResult<Vec<BrowserCookie>>;

    async fn quit(&self) -> FetchResult<()>;

    async fn wait_for(&self, locator: &Locator, wait: Wait) -> FetchResult<()> {
        let deadline = Instant::now() + wait.timeout;
        loop {
            if self.is_present(locator).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(FetchError::Timeout {
                    what: format!("element {}", locator),
                    after: wait.timeout,
                });
            }
            trace!("Waiting for {}", locator);
            sleep(wait.interval).await;
        }
    }

    async fn wait_title_contains(&self, needle: &str, wait: Wait) -> FetchResult<()> {
        let deadline = Instant::now() + wait.timeout;
        loop {
            let title = self.title().await?;
            if title.contains(needle) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(FetchError::Timeout {
                    what: format!("title containing {:?} (last: {:?})", needle, title),
                    after: wait.timeout,
                });
            }
            sleep(wait.interval).await;
        }
    }
}

/// A shared browser, so a caller can keep a handle on a browser that a
/// session owns.
#[async_trait]
impl<B: Browser + ?Sized> Browser for Arc<B> {
    async fn goto(&self, url: &Url) -> FetchResult<()> {
        (**self).goto(url).await
    }

    async fn is_present(&self, locator: &Locator) -> FetchResult<bool> {
        (**self).is_present(locator).await
    }

    async fn click(&self, locator: &Locator) -> FetchResult<()> {
        (**self).click(locator).await
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> FetchResult<()> {
        (**self).type_text(locator, text).await
    }

    async fn clear(&self, locator: &Locator) -> FetchResult<()> {
        (**self).clear(locator).await
    }

    async fn submit(&self, locator: &Locator) -> FetchResult<()> {
        (**self).submit(locator).await
    }

    async fn text(&self, locator: &Locator) -> FetchResult<Option<String>> {
        (**self).text(locator).await
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> FetchResult<Option<String>> {
        (**self).attribute(locator, name).await
    }

    async fn attributes(&self, locator: &Locator, name: &str) -> FetchResult<Vec<Option<String>>> {
        (**self).attributes(locator, name).await
    }

    async fn inner_html(&self, locator: &Locator) -> FetchResult<Option<String>> {
        (**self).inner_html(locator).await
    }

    async fn is_displayed(&self, locator: &Locator) -> FetchResult<bool> {
        (**self).is_displayed(locator).await
    }

    async fn title(&self) -> FetchResult<String> {
        (**self).title().await
    }

    async fn cookies(&self) -> FetchResult<Vec<BrowserCookie>> {
        (**self).cookies().await
    }

    async fn quit(&self) -> FetchResult<()> {
        (**self).quit().await
    }
}
