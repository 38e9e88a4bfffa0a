use log::{debug, info, warn};
use tokio::time::sleep;
use url::Url;

use super::models::{
    ClassRecord, Credentials, DownloadReport, LoginOutcome, ResourceLink, SectionRecord,
};
use super::selectors;
use crate::browser::{Browser, Locator, Wait};
use crate::download::{file_name_for, sanitize_stem, Downloader};
use crate::stats::StatsTracker;
use crate::storage::DiskStorage;
use crate::{FetchError, FetchResult, FetcherConfig};

/// A browser session on Piazza.
///
/// Class and section lists are cached from the last listing call, and the
/// section list always belongs to `current_class`.
#[derive(Debug)]
pub struct PiazzaSession<B: Browser> {
    browser: B,
    config: FetcherConfig,
    classes: Vec<ClassRecord>,
    sections: Vec<SectionRecord>,
    current_class: Option<usize>,
    stats: StatsTracker,
}

impl<B: Browser> PiazzaSession<B> {
    /// A session that has not navigated anywhere yet.
    pub fn new(browser: B, config: FetcherConfig) -> Self {
        Self {
            browser,
            config,
            classes: Vec::new(),
            sections: Vec::new(),
            current_class: None,
            stats: StatsTracker::new(),
        }
    }

    /// Opens the login page.
    pub async fn open(browser: B, config: FetcherConfig) -> FetchResult<Self> {
        let session = Self::new(browser, config);
        session.goto_login().await?;
        Ok(session)
    }

    pub async fn goto_login(&self) -> FetchResult<()> {
        let login_url = self.config.site.login_url()?;
        self.browser.goto(&login_url).await
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    pub fn classes(&self) -> &[ClassRecord] {
        &self.classes
    }

    pub fn sections(&self) -> &[SectionRecord] {
        &self.sections
    }

    /// Counters of every download made through this session.
    pub fn stats(&self) -> &StatsTracker {
        &self.stats
    }

    fn login_wait(&self) -> Wait {
        Wait::new(self.config.timing.login_timeout()).every(self.config.timing.poll_interval())
    }

    async fn settle(&self) {
        let delay = self.config.timing.settle_delay();
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }

    /// Fills in the login form and waits for the landing page.
    ///
    /// A timeout closes the browser; the session cannot be used afterwards.
    pub async fn log_in(&mut self, credentials: &Credentials) -> FetchResult<LoginOutcome> {
        match self.try_log_in(credentials).await {
            Err(err) if err.is_timeout() => {
                warn!(
                    "Login process took too long. Please check your internet connection or try again later. ({})",
                    err
                );
                if let Err(quit_err) = self.browser.quit().await {
                    warn!("Failed to close browser: {}", quit_err);
                }
                Err(err)
            }
            other => other,
        }
    }

    async fn try_log_in(&mut self, credentials: &Credentials) -> FetchResult<LoginOutcome> {
        let email = Locator::id(selectors::EMAIL_FIELD);
        let password = Locator::id(selectors::PASSWORD_FIELD);
        let wait = self.login_wait();

        self.browser.wait_for(&email, wait).await?;
        self.browser.wait_for(&password, wait).await?;

        info!("Logging in as {}", credentials.email);
        self.browser.clear(&email).await?;
        self.browser.clear(&password).await?;
        self.browser.type_text(&email, &credentials.email).await?;
        self.browser.type_text(&password, &credentials.password).await?;
        self.browser.submit(&password).await?;
        self.settle().await;

        let error = Locator::id(selectors::LOGIN_ERROR);
        if self.browser.is_displayed(&error).await? {
            let message = self
                .browser
                .inner_html(&error)
                .await?
                .unwrap_or_default()
                .trim()
                .to_string();
            warn!("Login failed. Error message: {}", message);
            return Ok(LoginOutcome::Rejected { message });
        }

        self.browser
            .wait_title_contains(&self.config.site.title_marker, wait)
            .await?;
        info!("Logged in");
        Ok(LoginOutcome::LoggedIn)
    }

    fn class_url(&self, entry_id: &str) -> FetchResult<Url> {
        let class_id = entry_id
            .strip_prefix(selectors::CLASS_ID_PREFIX)
            .unwrap_or(entry_id);
        Ok(Url::parse(&format!(
            "{}{}",
            self.config.site.class_base_url, class_id
        ))?)
    }

    /// Opens the class dropdown (inactive classes included) and reads every
    /// entry in display order.
    pub async fn list_classes(&mut self) -> FetchResult<&[ClassRecord]> {
        self.browser
            .click(&Locator::id(selectors::CLASS_DROPDOWN))
            .await?;
        self.settle().await;
        self.browser
            .click(&Locator::id(selectors::INACTIVE_TOGGLE))
            .await?;
        self.settle().await;

        let ids = self
            .browser
            .attributes(&Locator::css(selectors::CLASS_ENTRIES), "id")
            .await?;

        let mut classes = Vec::with_capacity(ids.len());
        for (position, id) in ids.into_iter().enumerate() {
            let Some(id) = id else {
                warn!("Class entry {} has no id, skipping", position);
                continue;
            };
            let name = self
                .browser
                .text(&selectors::class_name_within(&id))
                .await?
                .unwrap_or_default();
            let url = self.class_url(&id)?;
            debug!("Class {}: {} ({})", classes.len(), name, url);
            classes.push(ClassRecord {
                index: classes.len(),
                name,
                url,
            });
        }

        info!("Found {} classes", classes.len());
        self.classes = classes;
        self.sections.clear();
        self.current_class = None;
        Ok(&self.classes)
    }

    /// Opens the class's resources tab and reads section names until the
    /// next index is missing.
    pub async fn list_sections(&mut self, class_index: usize) -> FetchResult<&[SectionRecord]> {
        let class = self
            .classes
            .get(class_index)
            .cloned()
            .ok_or(FetchError::UnknownClass(class_index))?;

        self.sections.clear();
        self.current_class = None;

        self.browser.goto(&class.url).await?;
        self.browser
            .click(&Locator::id(selectors::RESOURCES_TAB))
            .await?;
        self.settle().await;

        let mut sections = Vec::new();
        while let Some(name) = self
            .browser
            .text(&selectors::section_name(sections.len()))
            .await?
        {
            debug!("Section {}: {}", sections.len(), name);
            sections.push(SectionRecord {
                index: sections.len(),
                name,
            });
        }

        info!("Found {} resource sections in {}", sections.len(), class.name);
        self.sections = sections;
        self.current_class = Some(class_index);
        Ok(&self.sections)
    }

    /// The `index`-th file link of a section on the current page, if present.
    pub async fn resource_link(
        &self,
        section_index: usize,
        index: usize,
    ) -> FetchResult<Option<ResourceLink>> {
        let locator = selectors::resource_link(section_index, index);
        let Some(href) = self.browser.attribute(&locator, "href").await? else {
            return Ok(None);
        };
        let base = self.config.site.login_url()?;
        let url = base.join(&href)?;

        let text = self.browser.text(&locator).await?.unwrap_or_default();
        let name = match text.trim() {
            "" => format!("resource_{}", index),
            trimmed => trimmed.to_string(),
        };

        Ok(Some(ResourceLink { index, name, url }))
    }

    /// Every file link of a section, stopping at the first missing index.
    pub async fn resource_links(&self, section_index: usize) -> FetchResult<Vec<ResourceLink>> {
        let mut links = Vec::new();
        while let Some(link) = self.resource_link(section_index, links.len()).await? {
            links.push(link);
        }
        Ok(links)
    }

    async fn ensure_sections_for(&mut self, class_index: usize) -> FetchResult<()> {
        if self.current_class != Some(class_index) {
            self.list_sections(class_index).await?;
        }
        Ok(())
    }

    /// Downloads every file listed under a section into
    /// `<output>/<class>/<section>/`.
    ///
    /// The loop ends when the next link element is absent, or at the first
    /// link that cannot be fetched or saved. That link is counted as failed
    /// and the report covers what was saved before it.
    pub async fn download_section(
        &mut self,
        class_index: usize,
        section_index: usize,
        storage: &DiskStorage,
    ) -> FetchResult<DownloadReport> {
        let class = self
            .classes
            .get(class_index)
            .cloned()
            .ok_or(FetchError::UnknownClass(class_index))?;
        self.ensure_sections_for(class_index).await?;
        let section = self
            .sections
            .get(section_index)
            .cloned()
            .ok_or(FetchError::UnknownSection(section_index))?;

        let folder = storage.section_dir(&class.name, &section.name)?;
        info!(
            "Downloading {} / {} into {}",
            class.name,
            section.name,
            folder.display()
        );

        let cookies = self.browser.cookies().await?;
        let downloader = Downloader::from_cookies(&cookies, &self.config.download)?
            .with_stats(self.stats.clone());
        let fallback = self.config.download.fallback_extension.as_str();

        let mut report = DownloadReport::new(folder.clone());
        let mut index = 0;
        while let Some(link) = self.resource_link(section_index, index).await? {
            index += 1;
            info!("File name: {}", link.name);

            let file = match downloader.fetch(&link.url).await {
                Ok(file) => file,
                Err(err) => {
                    warn!("No more files: {} ({}) failed: {}", link.name, link.url, err);
                    report.failed += 1;
                    break;
                }
            };

            let extension = file.extension(fallback);
            debug!("File extension: {}", extension);
            let file_name = file_name_for(&sanitize_stem(&link.name, extension), extension);
            let path = match storage.write_file(&folder, &file_name, &file.body) {
                Ok(path) => path,
                Err(err) => {
                    warn!("No more files: could not save {}: {}", file_name, err);
                    report.failed += 1;
                    break;
                }
            };
            downloader.stats().record_saved();

            info!("Downloaded: {}", file_name);
            report.downloaded += 1;
            report.bytes += file.body.len() as u64;
            report.files.push(path);
        }

        if index == 0 {
            info!("No files listed under {}", section.name);
        }
        downloader.stats().finish();
        Ok(report)
    }

    /// Closes the browser.
    pub async fn close(self) -> FetchResult<()> {
        self.browser.quit().await
    }
}
