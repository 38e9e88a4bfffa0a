pub mod app;
pub mod browser;
pub mod core;
pub mod download;
pub mod piazza;
pub mod stats;
pub mod storage;

pub use browser::{Browser, HtmlBrowser, Locator, WebDriverBrowser};
pub use core::{FetchError, FetchResult, FetcherConfig};
pub use piazza::{
    ClassRecord, Credentials, DownloadReport, LoginOutcome, PiazzaSession, ResourceLink,
    SectionRecord,
};
pub use stats::StatsTracker;
pub use storage::DiskStorage;
