use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use super::{FetchError, FetchResult};

pub const DEFAULT_LOGIN_URL: &str = "https://piazza.com/account/login";
pub const DEFAULT_CLASS_BASE_URL: &str = "https://piazza.com/class/";
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Where the site lives and how a finished login is recognized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub login_url: String,
    /// Prefix that replaces `network_` in a class entry's id.
    pub class_base_url: String,
    /// Substring the page title must contain once the login went through.
    pub title_marker: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            class_base_url: DEFAULT_CLASS_BASE_URL.to_string(),
            title_marker: "Piazza".to_string(),
        }
    }
}

impl SiteConfig {
    pub fn login_url(&self) -> FetchResult<Url> {
        Ok(Url::parse(&self.login_url)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    pub headless: bool,
    /// Extra command line switches handed to Chrome.
    pub chrome_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            headless: true,
            chrome_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub login_timeout_ms: u64,
    /// Pause after a click before the page is read.
    pub settle_delay_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            login_timeout_ms: 10_000,
            settle_delay_ms: 1_000,
            poll_interval_ms: 500,
        }
    }
}

impl TimingConfig {
    pub fn login_timeout(&self) -> Duration {
        Duration::from_millis(self.login_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Root under which `<class>/<section>/` folders are created.
    pub output_dir: PathBuf,
    pub user_agent: String,
    /// Used when the Content-Type maps to no known extension.
    pub fallback_extension: String,
    pub request_timeout_secs: Option<u64>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            fallback_extension: ".pdf".to_string(),
            request_timeout_secs: None,
        }
    }
}

/// Everything a run needs, loadable from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    pub site: SiteConfig,
    pub browser: BrowserConfig,
    pub timing: TimingConfig,
    pub download: DownloadConfig,
}

impl FetcherConfig {
    pub fn with_output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.download.output_dir = dir.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.browser.headless = headless;
        self
    }

    pub fn with_webdriver_url(mut self, url: &str) -> Self {
        self.browser.webdriver_url = url.to_string();
        self
    }

    pub fn with_login_url(mut self, url: &str) -> Self {
        self.site.login_url = url.to_string();
        self
    }

    pub fn with_class_base_url(mut self, url: &str) -> Self {
        self.site.class_base_url = url.to_string();
        self
    }

    pub fn with_login_timeout(mut self, timeout: Duration) -> Self {
        self.timing.login_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.timing.settle_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.timing.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn from_toml(data: &str) -> FetchResult<Self> {
        Ok(toml::from_str(data)?)
    }

    /// Loads `path` when given (it must exist), otherwise the default
    /// location if a file is there, otherwise built-in defaults.
    pub fn load(path: Option<&Path>) -> FetchResult<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => {
                    debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let data = fs::read_to_string(&path).map_err(|e| {
            FetchError::IoError(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        let config = Self::from_toml(&data)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("piazza_fetch").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_values() {
        let cfg = FetcherConfig::default();
        assert_eq!(cfg.site.login_url, DEFAULT_LOGIN_URL);
        assert_eq!(cfg.site.title_marker, "Piazza");
        assert!(cfg.browser.headless);
        assert_eq!(cfg.timing.login_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.timing.settle_delay(), Duration::from_secs(1));
        assert_eq!(cfg.download.fallback_extension, ".pdf");
        assert_eq!(cfg.download.output_dir, PathBuf::from("."));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = FetcherConfig::from_toml(
            r#"
            [browser]
            headless = false

            [download]
            output_dir = "/tmp/piazza"
            "#,
        )
        .unwrap();

        assert!(!cfg.browser.headless);
        assert_eq!(cfg.browser.webdriver_url, DEFAULT_WEBDRIVER_URL);
        assert_eq!(cfg.download.output_dir, PathBuf::from("/tmp/piazza"));
        assert_eq!(cfg.timing, TimingConfig::default());
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = FetcherConfig::from_toml("[timing]\nlogin_timeout_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, FetchError::ConfigError(_)));
    }

    #[test]
    fn builder_overrides() {
        let cfg = FetcherConfig::default()
            .with_headless(false)
            .with_webdriver_url("http://127.0.0.1:4444")
            .with_login_timeout(Duration::from_millis(250))
            .with_settle_delay(Duration::ZERO)
            .with_output_dir("downloads");

        assert!(!cfg.browser.headless);
        assert_eq!(cfg.browser.webdriver_url, "http://127.0.0.1:4444");
        assert_eq!(cfg.timing.login_timeout_ms, 250);
        assert_eq!(cfg.timing.settle_delay(), Duration::ZERO);
        assert_eq!(cfg.download.output_dir, PathBuf::from("downloads"));
    }

    #[test]
    fn load_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[site]\ntitle_marker = \"Classes\"").unwrap();

        let cfg = FetcherConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.site.title_marker, "Classes");
        assert_eq!(cfg.site.class_base_url, DEFAULT_CLASS_BASE_URL);
    }

    #[test]
    fn load_missing_explicit_path_fails() {
        let err = FetcherConfig::load(Some(Path::new("/nonexistent/piazza_fetch.toml"))).unwrap_err();
        assert!(matches!(err, FetchError::IoError(_)));
    }
}
