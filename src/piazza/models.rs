use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// One entry of the class dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassRecord {
    /// Position in the dropdown, starting at 0.
    pub index: usize,
    pub name: String,
    pub url: Url,
}

/// A named group of files on a class's resources page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionRecord {
    pub index: usize,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceLink {
    pub index: usize,
    pub name: String,
    pub url: Url,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    LoggedIn,
    /// The login form showed an error, e.g. a wrong password.
    Rejected { message: String },
}

impl LoginOutcome {
    pub fn is_logged_in(&self) -> bool {
        matches!(self, LoginOutcome::LoggedIn)
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadReport {
    pub folder: PathBuf,
    pub downloaded: usize,
    pub failed: usize,
    pub bytes: u64,
    pub files: Vec<PathBuf>,
}

impl DownloadReport {
    pub fn new(folder: PathBuf) -> Self {
        Self {
            folder,
            downloaded: 0,
            failed: 0,
            bytes: 0,
            files: Vec::new(),
        }
    }

    /// The status line shown once a section is done.
    pub fn summary(&self) -> String {
        match self.downloaded {
            0 => "No file to download".to_string(),
            1 => "Download finished 1 file".to_string(),
            n => format!("Download finished {} files", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials::new("ada@example.edu", "hunter2");
        let shown = format!("{:?}", creds);
        assert!(shown.contains("ada@example.edu"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn report_summary_wording() {
        let mut report = DownloadReport::new(PathBuf::from("out"));
        assert_eq!(report.summary(), "No file to download");
        report.downloaded = 1;
        assert_eq!(report.summary(), "Download finished 1 file");
        report.downloaded = 4;
        assert_eq!(report.summary(), "Download finished 4 files");
    }
}
