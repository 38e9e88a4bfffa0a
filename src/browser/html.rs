//! A browser over a fixed set of static HTML pages.
//!
//! Every lookup parses the current page with `scraper`, so the site logic
//! can be exercised against a known page structure without Chrome.

use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use url::Url;

use super::{Browser, BrowserCookie, Locator};
use crate::{FetchError, FetchResult};

#[derive(Debug, Default)]
struct PageState {
    current: Option<Url>,
    typed: HashMap<String, String>,
    clicks: Vec<String>,
    visits: Vec<Url>,
    closed: bool,
}

#[derive(Debug, Default)]
pub struct HtmlBrowser {
    pages: HashMap<Url, String>,
    click_targets: HashMap<String, Url>,
    submit_target: Option<Url>,
    cookies: Vec<BrowserCookie>,
    state: Mutex<PageState>,
}

struct Matched {
    text: String,
    inner_html: String,
    attrs: HashMap<String, String>,
    displayed: bool,
}

fn normalize_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn hides(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    if value.attr("hidden").is_some() {
        return true;
    }
    value
        .attr("style")
        .map(|style| style.replace(' ', "").contains("display:none"))
        .unwrap_or(false)
}

fn select_all(html: &str, locator: &Locator) -> FetchResult<Vec<Matched>> {
    let selector = Selector::parse(&locator.to_css())
        .map_err(|e| FetchError::PageError(format!("bad selector {}: {}", locator, e)))?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&selector)
        .map(|element| {
            let displayed = !hides(&element)
                && !element
                    .ancestors()
                    .filter_map(ElementRef::wrap)
                    .any(|ancestor| hides(&ancestor));
            Matched {
                text: normalize_text(&element),
                inner_html: element.inner_html(),
                attrs: element
                    .value()
                    .attrs()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                displayed,
            }
        })
        .collect())
}

fn page_title(html: &str) -> String {
    let document = Html::parse_document(html);
    Selector::parse("title")
        .ok()
        .and_then(|selector| document.select(&selector).next().map(|t| normalize_text(&t)))
        .unwrap_or_default()
}

impl HtmlBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: impl Into<String>) -> FetchResult<Self> {
        self.pages.insert(Url::parse(url)?, html.into());
        Ok(self)
    }

    /// Clicking the element with this id loads `url`.
    pub fn with_click_target(mut self, element_id: &str, url: &str) -> FetchResult<Self> {
        self.click_targets
            .insert(element_id.to_string(), Url::parse(url)?);
        Ok(self)
    }

    /// Pressing Return in any field loads `url`.
    pub fn with_submit_target(mut self, url: &str) -> FetchResult<Self> {
        self.submit_target = Some(Url::parse(url)?);
        Ok(self)
    }

    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.push(BrowserCookie::new(name, value));
        self
    }

    pub fn current_url(&self) -> Option<Url> {
        self.state.lock().current.clone()
    }

    /// Text typed into the element at `locator` so far.
    pub fn typed(&self, locator: &Locator) -> Option<String> {
        self.state.lock().typed.get(&locator.to_string()).cloned()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().clicks.clone()
    }

    pub fn visits(&self) -> Vec<Url> {
        self.state.lock().visits.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn load(&self, url: &Url) -> FetchResult<()> {
        if !self.pages.contains_key(url) {
            return Err(FetchError::PageError(format!("no page registered for {}", url)));
        }
        debug!("Loading static page {}", url);
        let mut state = self.state.lock();
        state.current = Some(url.clone());
        state.visits.push(url.clone());
        Ok(())
    }

    fn current_html(&self) -> FetchResult<(Url, &str)> {
        let state = self.state.lock();
        if state.closed {
            return Err(FetchError::SessionClosed);
        }
        let url = state
            .current
            .clone()
            .ok_or_else(|| FetchError::PageError("no page loaded".to_string()))?;
        let html = self
            .pages
            .get(&url)
            .map(String::as_str)
            .ok_or_else(|| FetchError::PageError(format!("no page registered for {}", url)))?;
        Ok((url, html))
    }

    fn matches(&self, locator: &Locator) -> FetchResult<Vec<Matched>> {
        let (_, html) = self.current_html()?;
        select_all(html, locator)
    }

    fn first(&self, locator: &Locator) -> FetchResult<Option<Matched>> {
        Ok(self.matches(locator)?.into_iter().next())
    }

    fn require(&self, locator: &Locator) -> FetchResult<Matched> {
        self.first(locator)?
            .ok_or_else(|| FetchError::ElementNotFound(locator.to_string()))
    }
}

#[async_trait]
impl Browser for HtmlBrowser {
    async fn goto(&self, url: &Url) -> FetchResult<()> {
        if self.state.lock().closed {
            return Err(FetchError::SessionClosed);
        }
        self.load(url)
    }

    async fn is_present(&self, locator: &Locator) -> FetchResult<bool> {
        Ok(self.first(locator)?.is_some())
    }

    async fn click(&self, locator: &Locator) -> FetchResult<()> {
        let element = self.require(locator)?;
        self.state.lock().clicks.push(locator.to_string());

        if let Some(target) = element
            .attrs
            .get("id")
            .and_then(|id| self.click_targets.get(id))
            .cloned()
        {
            return self.load(&target);
        }

        if let Some(href) = element.attrs.get("href") {
            let (current, _) = self.current_html()?;
            let target = current.join(href)?;
            if self.pages.contains_key(&target) {
                return self.load(&target);
            }
        }
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> FetchResult<()> {
        self.require(locator)?;
        self.state
            .lock()
            .typed
            .entry(locator.to_string())
            .or_default()
            .push_str(text);
        Ok(())
    }

    async fn clear(&self, locator: &Locator) -> FetchResult<()> {
        self.require(locator)?;
        self.state.lock().typed.remove(&locator.to_string());
        Ok(())
    }

    async fn submit(&self, locator: &Locator) -> FetchResult<()> {
        self.require(locator)?;
        match self.submit_target.clone() {
            Some(target) => self.load(&target),
            None => Ok(()),
        }
    }

    async fn text(&self, locator: &Locator) -> FetchResult<Option<String>> {
        Ok(self.first(locator)?.map(|m| m.text))
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> FetchResult<Option<String>> {
        Ok(self.first(locator)?.and_then(|m| m.attrs.get(name).cloned()))
    }

    async fn attributes(&self, locator: &Locator, name: &str) -> FetchResult<Vec<Option<String>>> {
        Ok(self
            .matches(locator)?
            .into_iter()
            .map(|m| m.attrs.get(name).cloned())
            .collect())
    }

    async fn inner_html(&self, locator: &Locator) -> FetchResult<Option<String>> {
        Ok(self.first(locator)?.map(|m| m.inner_html))
    }

    async fn is_displayed(&self, locator: &Locator) -> FetchResult<bool> {
        Ok(self.first(locator)?.map(|m| m.displayed).unwrap_or(false))
    }

    async fn title(&self) -> FetchResult<String> {
        let (_, html) = self.current_html()?;
        Ok(page_title(html))
    }

    async fn cookies(&self) -> FetchResult<Vec<BrowserCookie>> {
        Ok(self.cookies.clone())
    }

    async fn quit(&self) -> FetchResult<()> {
        self.state.lock().closed = true;
        Ok(())
    }
}
