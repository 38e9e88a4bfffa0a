use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;

use crate::FetcherConfig;

/// Download Piazza class resources.
#[derive(Debug, Parser)]
#[command(name = "piazza_fetch", version)]
#[command(about = "Log in to Piazza and download a class's resource files", long_about = None)]
pub struct Cli {
    /// Config file (defaults to the user config dir).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, env = "PIAZZA_EMAIL", global = true)]
    pub email: Option<String>,

    /// Prompted for when not given.
    #[arg(long, env = "PIAZZA_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// WebDriver server, e.g. a running chromedriver.
    #[arg(long, global = true)]
    pub webdriver: Option<String>,

    /// Show the browser window.
    #[arg(long, global = true)]
    pub headful: bool,

    /// Folder that receives `<class>/<section>/`.
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Print listings and download reports as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// -v for progress, -vv for details.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Pick a class and a section from menus (the default).
    Interactive,

    /// List enrolled classes, inactive ones included.
    Classes,

    /// List the resource sections of a class.
    Sections {
        /// Class index as printed by `classes`.
        #[arg(long)]
        class: usize,
    },

    /// Download every file of one resource section.
    Download {
        #[arg(long)]
        class: usize,

        /// Section index as printed by `sections`.
        #[arg(long)]
        section: usize,
    },
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Interactive)
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    /// Flags win over the config file.
    pub fn apply(&self, mut config: FetcherConfig) -> FetcherConfig {
        if let Some(url) = &self.webdriver {
            config = config.with_webdriver_url(url);
        }
        if self.headful {
            config = config.with_headless(false);
        }
        if let Some(output) = &self.output {
            config = config.with_output_dir(output.clone());
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_interactive() {
        let cli = Cli::try_parse_from(["piazza_fetch"]).unwrap();
        assert_eq!(cli.command(), Command::Interactive);
        assert_eq!(cli.log_level(), LevelFilter::Warn);
    }

    #[test]
    fn download_subcommand_with_global_flags() {
        let cli = Cli::try_parse_from([
            "piazza_fetch",
            "download",
            "--class",
            "2",
            "--section",
            "0",
            "--output",
            "files",
            "-vv",
        ])
        .unwrap();

        assert_eq!(
            cli.command(),
            Command::Download {
                class: 2,
                section: 0
            }
        );
        assert_eq!(cli.output, Some(PathBuf::from("files")));
        assert_eq!(cli.log_level(), LevelFilter::Debug);
        assert!(!cli.json);
    }

    #[test]
    fn sections_requires_class() {
        assert!(Cli::try_parse_from(["piazza_fetch", "sections"]).is_err());
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "piazza_fetch",
            "--headful",
            "--webdriver",
            "http://127.0.0.1:4444",
            "classes",
        ])
        .unwrap();

        let config = cli.apply(FetcherConfig::default().with_output_dir("from-file"));
        assert!(!config.browser.headless);
        assert_eq!(config.browser.webdriver_url, "http://127.0.0.1:4444");
        assert_eq!(config.download.output_dir, PathBuf::from("from-file"));
    }
}
