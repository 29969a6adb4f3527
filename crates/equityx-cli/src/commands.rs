//! Command parsing for the interactive session

use anyhow::{Result, anyhow, bail};

/// Parsed line of REPL input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Plain text, fed to the symbol search
    Search { text: String },
    /// Fill the form from the n-th search result (1-based)
    Pick { index: usize },
    /// Submit a report, optionally setting the form first
    Report { form: Option<(String, String)> },
    /// Fill the form from the n-th recent lookup (1-based)
    Recent { index: usize },
    /// Save the current report
    Download { filename: Option<String> },
    /// Fetch the current report's document again
    Retry,
    /// Show recent lookups
    History,
    /// Sign in with email and password
    Login { email: String, password: String },
    /// Sign out
    Logout,
    /// Show help
    Help,
    /// Leave the session
    Exit,
}

fn parse_index(arg: Option<&str>, what: &str) -> Result<usize> {
    let raw = arg.ok_or_else(|| anyhow!("Missing number for {what}"))?;
    match raw.parse::<usize>() {
        Ok(index) if index > 0 => Ok(index),
        _ => bail!("Invalid number for {what}: {raw}"),
    }
}

/// Split `Apple Inc | AAPL` into name and ticker
fn parse_form(rest: &str) -> Result<Option<(String, String)>> {
    if rest.is_empty() {
        return Ok(None);
    }
    let (name, ticker) = rest
        .split_once('|')
        .ok_or_else(|| anyhow!("Use /report <stock name> | <ticker>"))?;
    Ok(Some((name.trim().to_string(), ticker.trim().to_string())))
}

impl Command {
    /// Parse a command from user input
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        if input.is_empty() {
            bail!("Empty input");
        }

        let Some(body) = input.strip_prefix('/') else {
            return Ok(Command::Search {
                text: input.to_string(),
            });
        };

        let (cmd, rest) = match body.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (body, ""),
        };
        if cmd.is_empty() {
            bail!("Empty command");
        }
        let mut args = rest.split_whitespace();

        match cmd.to_lowercase().as_str() {
            "pick" | "p" => Ok(Command::Pick {
                index: parse_index(args.next(), "pick")?,
            }),
            "report" | "r" => Ok(Command::Report {
                form: parse_form(rest)?,
            }),
            "recent" => Ok(Command::Recent {
                index: parse_index(args.next(), "recent")?,
            }),
            "download" | "dl" => Ok(Command::Download {
                filename: args.next().map(str::to_string),
            }),
            "retry" => Ok(Command::Retry),
            "history" | "hist" => Ok(Command::History),
            "login" => match (args.next(), args.next()) {
                (Some(email), Some(password)) => Ok(Command::Login {
                    email: email.to_string(),
                    password: password.to_string(),
                }),
                _ => bail!("Use /login <email> <password>"),
            },
            "logout" => Ok(Command::Logout),
            "help" | "h" | "?" => Ok(Command::Help),
            "exit" | "quit" | "q" => Ok(Command::Exit),
            _ => bail!("Unknown command: {cmd}"),
        }
    }

    /// Get help text for all commands
    pub fn help_text() -> &'static str {
        r"
equityx commands
================

  <text>                      Search symbols (two characters or more)
  /pick <n>                   Use the n-th search result
  /report                     Generate a report for the current form
  /report <name> | <ticker>   Set the form and generate a report
  /recent <n>                 Load the n-th recent lookup into the form
  /history                    Show recent lookups
  /download [file]            Save the current report
  /retry                      Reload the report document
  /login <email> <password>   Sign in
  /logout                     Sign out
  /help                       Show help
  /exit                       Exit

Aliases: /p = /pick   /r = /report   /dl = /download   /q = /exit
"
    }
}
