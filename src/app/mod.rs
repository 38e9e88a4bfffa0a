//! Command-line front end.

pub mod cli;
pub mod console;
pub mod interactive;

use anyhow::{bail, Context, Result};
use log::{error, info};

pub use cli::{Cli, Command};
pub use console::StatusConsole;
pub use interactive::{run_interactive, Prompter, TerminalPrompter};

use interactive::close_quietly;

use crate::browser::{Browser, WebDriverBrowser};
use crate::piazza::{Credentials, LoginOutcome, PiazzaSession};
use crate::storage::DiskStorage;
use crate::FetcherConfig;

fn credentials(cli: &Cli, prompter: &mut impl Prompter) -> Result<Credentials> {
    let email = match &cli.email {
        Some(email) => email.clone(),
        None => prompter
            .line("Email: ")?
            .context("an email is required to log in")?,
    };
    let password = match &cli.password {
        Some(password) => password.clone(),
        None => prompter.secret("Password: ")?,
    };
    Ok(Credentials::new(email, password))
}

async fn log_in_once<B: Browser>(
    session: &mut PiazzaSession<B>,
    credentials: &Credentials,
) -> Result<()> {
    match session.log_in(credentials).await? {
        LoginOutcome::LoggedIn => Ok(()),
        LoginOutcome::Rejected { message } => bail!("Log in failed: {}", message),
    }
}

/// Opens the login page, quitting the browser if that fails.
async fn open_session<B: Browser>(browser: B, config: FetcherConfig) -> Result<PiazzaSession<B>> {
    let session = PiazzaSession::new(browser, config);
    if let Err(err) = session.goto_login().await {
        close_quietly(session).await;
        return Err(err).context("cannot open the login page");
    }
    Ok(session)
}

/// Runs one non-interactive command on a logged-in session and returns
/// what it prints.
pub async fn run_command<B: Browser>(
    session: &mut PiazzaSession<B>,
    command: &Command,
    storage: &DiskStorage,
    json: bool,
) -> Result<String> {
    let mut out = String::new();
    match command {
        Command::Interactive => bail!("interactive mode runs through run_interactive"),
        Command::Classes => {
            let classes = session.list_classes().await?;
            if json {
                out = serde_json::to_string_pretty(classes)?;
            } else {
                for class in classes {
                    out.push_str(&format!("{}\t{}\t{}\n", class.index, class.name, class.url));
                }
            }
        }
        Command::Sections { class } => {
            session.list_classes().await?;
            let sections = session.list_sections(*class).await?;
            if json {
                out = serde_json::to_string_pretty(sections)?;
            } else {
                for section in sections {
                    out.push_str(&format!("{}\t{}\n", section.index, section.name));
                }
            }
        }
        Command::Download { class, section } => {
            session.list_classes().await?;
            let report = session.download_section(*class, *section, storage).await?;
            if json {
                out = serde_json::to_string_pretty(&report)?;
            } else {
                out.push_str(&format!("{}\n", report.summary()));
                if report.failed > 0 {
                    out.push_str("Stopped at a file that could not be downloaded\n");
                }
                out.push_str(&format!("Files are in {}\n", report.folder.display()));
            }
        }
    }
    Ok(out.trim_end().to_string())
}

pub async fn run(cli: Cli, config: FetcherConfig) -> Result<()> {
    let command = cli.command();
    let storage = DiskStorage::new(&config.download.output_dir).with_context(|| {
        format!(
            "cannot use output folder {}",
            config.download.output_dir.display()
        )
    })?;

    info!("Connecting to WebDriver at {}", config.browser.webdriver_url);
    let browser = WebDriverBrowser::launch(&config.browser)
        .await
        .with_context(|| format!("cannot start a browser via {}", config.browser.webdriver_url))?;
    let session = open_session(browser, config).await?;
    let mut prompter = TerminalPrompter;

    if command == Command::Interactive {
        let (console, printer) = StatusConsole::spawn_stdout();
        let result = run_interactive(
            session,
            cli.email.clone(),
            cli.password.clone(),
            &storage,
            &mut prompter,
            &console,
        )
        .await;
        drop(console);
        if let Err(err) = printer.await {
            error!("Status console stopped: {}", err);
        }
        return result;
    }

    let mut session = session;
    let result = match credentials(&cli, &mut prompter) {
        Ok(credentials) => match log_in_once(&mut session, &credentials).await {
            Ok(()) => run_command(&mut session, &command, &storage, cli.json).await,
            Err(err) => Err(err),
        },
        Err(err) => Err(err),
    };
    if let Ok(out) = &result {
        println!("{}", out);
        if matches!(command, Command::Download { .. }) && !cli.json {
            session.stats().print_summary();
        }
    }
    close_quietly(session).await;
    result.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::HtmlBrowser;
    use std::sync::Arc;
    use std::time::Duration;

    const LOGIN: &str = "https://piazza.test/account/login";

    fn rejecting_site() -> HtmlBrowser {
        HtmlBrowser::new()
            .with_page(
                LOGIN,
                r#"<html><head><title>Log In</title></head><body>
                <input id="email_field"><input id="password_field">
                <div id="modal_error_text">Email or password is incorrect</div>
                </body></html>"#,
            )
            .unwrap()
            .with_submit_target(LOGIN)
            .unwrap()
    }

    #[tokio::test]
    async fn unreachable_login_page_closes_the_browser() {
        let browser = Arc::new(HtmlBrowser::new());
        let config = FetcherConfig::default().with_login_url(LOGIN);

        let err = open_session(browser.clone(), config).await.unwrap_err();

        assert_eq!(err.to_string(), "cannot open the login page");
        assert!(browser.is_closed());
    }

    #[tokio::test]
    async fn rejected_login_is_an_error() {
        let config = FetcherConfig::default()
            .with_login_url(LOGIN)
            .with_login_timeout(Duration::from_millis(50))
            .with_poll_interval(Duration::from_millis(5))
            .with_settle_delay(Duration::ZERO);
        let mut session = PiazzaSession::open(rejecting_site(), config).await.unwrap();

        let err = log_in_once(&mut session, &Credentials::new("a@b.c", "nope"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Log in failed: Email or password is incorrect");
    }

    fn class_site() -> HtmlBrowser {
        HtmlBrowser::new()
            .with_page(
                LOGIN,
                r#"<html><head><title>Piazza</title></head><body>
                <div id="classDropdownMenuId"></div><div id="toggleInactiveNetworksId"></div>
                <div id="my_classes">
                  <a data-pats="classes_dropdown_item" id="network_k1"><span class="course_number">CS 61A</span></a>
                </div></body></html>"#,
            )
            .unwrap()
            .with_page(
                "https://piazza.test/class/k1",
                r#"<html><body><a id="resources_link" href="/class/k1/resources">Resources</a></body></html>"#,
            )
            .unwrap()
            .with_page(
                "https://piazza.test/class/k1/resources",
                r#"<html><body><div id="resources">
                <h3 id="section_name_idx0">Lecture Notes</h3>
                <h3 id="section_name_idx1">Exams</h3>
                </div></body></html>"#,
            )
            .unwrap()
    }

    async fn class_session() -> PiazzaSession<HtmlBrowser> {
        let config = FetcherConfig::default()
            .with_login_url(LOGIN)
            .with_class_base_url("https://piazza.test/class/")
            .with_settle_delay(Duration::ZERO);
        PiazzaSession::open(class_site(), config).await.unwrap()
    }

    #[tokio::test]
    async fn classes_as_json() {
        let out = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(out.path()).unwrap();
        let mut session = class_session().await;

        let printed = run_command(&mut session, &Command::Classes, &storage, true)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&printed).unwrap();
        assert_eq!(parsed[0]["index"], 0);
        assert_eq!(parsed[0]["name"], "CS 61A");
        assert_eq!(parsed[0]["url"], "https://piazza.test/class/k1");
    }

    #[tokio::test]
    async fn sections_as_text() {
        let out = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(out.path()).unwrap();
        let mut session = class_session().await;

        let printed = run_command(&mut session, &Command::Sections { class: 0 }, &storage, false)
            .await
            .unwrap();
        assert_eq!(printed, "0\tLecture Notes\n1\tExams");
    }

    #[tokio::test]
    async fn interactive_is_not_a_command() {
        let out = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(out.path()).unwrap();
        let mut session = class_session().await;

        assert!(run_command(&mut session, &Command::Interactive, &storage, false)
            .await
            .is_err());
    }
}
