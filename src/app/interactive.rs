//! The menu-driven front end: log in on a worker task, then pick a class
//! and a resource section, download, repeat.

use anyhow::{anyhow, Result};
use log::warn;
use std::io::{self, BufRead, Write};

use super::console::StatusConsole;
use crate::browser::Browser;
use crate::piazza::{Credentials, LoginOutcome, PiazzaSession};
use crate::storage::DiskStorage;

const LOGIN_FAILED: &str =
    "Log in failed, please manually log in to see if there is any error message";
const LOGIN_TOO_SLOW: &str =
    "Login process took too long. Please check your internet connection or try again later.";
const NOTHING_SELECTED: &str = "Please select a class and a resource";

/// Source of user input.
pub trait Prompter: Send {
    /// `None` once input is exhausted.
    fn line(&mut self, label: &str) -> io::Result<Option<String>>;

    fn secret(&mut self, label: &str) -> io::Result<String>;
}

pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn line(&mut self, label: &str) -> io::Result<Option<String>> {
        print!("{}", label);
        io::stdout().flush()?;
        let mut input = String::new();
        if io::stdin().lock().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        Ok(Some(input.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn secret(&mut self, label: &str) -> io::Result<String> {
        rpassword::prompt_password(label)
    }
}

/// Numbered menu with the placeholder entry at 0.
pub fn menu(placeholder: &str, items: &[String]) -> String {
    let mut out = format!("  0) {}\n", placeholder);
    for (i, item) in items.iter().enumerate() {
        out.push_str(&format!("  {}) {}\n", i + 1, item));
    }
    out
}

/// Maps a menu answer to a 0-based item index. The placeholder, anything
/// out of range and non-numbers select nothing.
pub fn parse_choice(input: &str, len: usize) -> Option<usize> {
    match input.trim().parse::<usize>() {
        Ok(n) if n >= 1 && n <= len => Some(n - 1),
        _ => None,
    }
}

fn is_quit(input: &str) -> bool {
    matches!(input.trim(), "" | "q" | "quit")
}

/// Closes the browser, logging instead of failing.
pub(crate) async fn close_quietly<B: Browser>(session: PiazzaSession<B>) {
    if let Err(err) = session.close().await {
        warn!("Failed to close browser: {}", err);
    }
}

/// The email is kept across attempts, the password is asked for again.
fn prompt_credentials<P: Prompter>(
    prompter: &mut P,
    email: &mut Option<String>,
    password: &mut Option<String>,
) -> Result<Credentials> {
    let address = match email.clone() {
        Some(address) => address,
        None => prompter
            .line("Email: ")?
            .ok_or_else(|| anyhow!("no email given"))?,
    };
    *email = Some(address.clone());
    let secret = match password.take() {
        Some(secret) => secret,
        None => prompter.secret("Password: ")?,
    };
    Ok(Credentials::new(address, secret))
}

/// Logs in, asking again after a rejection. The browser is closed on
/// every error path.
async fn log_in<B, P>(
    mut session: PiazzaSession<B>,
    mut email: Option<String>,
    mut password: Option<String>,
    prompter: &mut P,
    console: &StatusConsole,
) -> Result<PiazzaSession<B>>
where
    B: Browser + 'static,
    P: Prompter,
{
    loop {
        console.flush().await;
        let credentials = match prompt_credentials(prompter, &mut email, &mut password) {
            Ok(credentials) => credentials,
            Err(err) => {
                close_quietly(session).await;
                return Err(err);
            }
        };

        console.append("Logging in...");
        let worker = tokio::spawn(async move {
            let outcome = session.log_in(&credentials).await;
            (session, outcome)
        });
        let (returned, outcome) = worker.await?;
        session = returned;

        match outcome {
            Ok(LoginOutcome::LoggedIn) => {
                console.append("Log in successfully");
                return Ok(session);
            }
            Ok(LoginOutcome::Rejected { message }) => {
                warn!("Login rejected: {}", message);
                console.append(format!("{} ({})", LOGIN_FAILED, message));
            }
            // the session already quit the browser
            Err(err) if err.is_timeout() => {
                console.append(LOGIN_TOO_SLOW);
                return Err(err.into());
            }
            Err(err) => {
                console.append(LOGIN_FAILED);
                close_quietly(session).await;
                return Err(err.into());
            }
        }
    }
}

async fn choose_and_download<B, P>(
    session: &mut PiazzaSession<B>,
    storage: &DiskStorage,
    prompter: &mut P,
    console: &StatusConsole,
) -> Result<()>
where
    B: Browser,
    P: Prompter,
{
    let classes: Vec<String> = session
        .list_classes()
        .await?
        .iter()
        .map(|c| c.name.clone())
        .collect();
    if classes.is_empty() {
        console.append("No classes found");
        return Ok(());
    }

    loop {
        console.flush().await;
        print!("{}", menu("Select a class", &classes));
        let Some(answer) = prompter.line("Class (Enter to quit): ")? else {
            return Ok(());
        };
        if is_quit(&answer) {
            return Ok(());
        }
        let Some(class_index) = parse_choice(&answer, classes.len()) else {
            console.append(NOTHING_SELECTED);
            continue;
        };

        let sections: Vec<String> = session
            .list_sections(class_index)
            .await?
            .iter()
            .map(|s| s.name.clone())
            .collect();
        if sections.is_empty() {
            console.append(format!("No resources found for {}", classes[class_index]));
            continue;
        }

        console.flush().await;
        print!("{}", menu("Select a resource", &sections));
        let Some(answer) = prompter.line("Resource: ")? else {
            return Ok(());
        };
        let Some(section_index) = parse_choice(&answer, sections.len()) else {
            console.append(NOTHING_SELECTED);
            continue;
        };

        console.append("Start Downloading...");
        match session
            .download_section(class_index, section_index, storage)
            .await
        {
            Ok(report) => {
                console.append(report.summary());
                if report.failed > 0 {
                    console.append("Stopped at a file that could not be downloaded");
                }
                console.append(format!("Files are in {}", report.folder.display()));
            }
            Err(err) => console.append(format!("Download failed: {}", err)),
        }
    }
}

/// Runs the whole interactive session and closes the browser afterwards.
pub async fn run_interactive<B, P>(
    session: PiazzaSession<B>,
    email: Option<String>,
    password: Option<String>,
    storage: &DiskStorage,
    prompter: &mut P,
    console: &StatusConsole,
) -> Result<()>
where
    B: Browser + 'static,
    P: Prompter,
{
    let mut session = log_in(session, email, password, prompter, console).await?;
    let result = choose_and_download(&mut session, storage, prompter, console).await;
    console.flush().await;
    close_quietly(session).await;
    result
}
