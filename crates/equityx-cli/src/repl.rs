//! Interactive session
//!
//! Each plain line is fed to the debounced search as one keystroke burst;
//! results are printed by a task watching the search state, the same way a
//! UI would subscribe to it.

use crate::commands::Command;
use crate::output::{print_candidates, print_history, print_report};
use anyhow::Result;
use equityx_client::{
    AuthClient, ClientConfig, Dashboard, SearchState, SessionGate, SubmitOutcome, TokenSession,
};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;

const PROMPT: &str = "equityx> ";

fn print_banner(signed_in: bool) {
    println!("equityx interactive session. Type /help for commands.");
    if !signed_in {
        println!("Not signed in: use /login <email> <password>.");
    }
    println!();
}

fn spawn_search_printer(mut rx: watch::Receiver<SearchState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            if state.searching || state.query.chars().count() < 2 {
                continue;
            }
            match &state.error {
                Some(e) => println!("\nSearch failed: {}", e.user_message()),
                None => {
                    println!();
                    print_candidates(&state.results);
                }
            }
            print!("{PROMPT}");
            std::io::stdout().flush().ok();
        }
    })
}

async fn submit(dashboard: &Dashboard) {
    let form = dashboard.form();
    println!("Generating report for {} ({}). This can take a few minutes...", form.stock_name, form.ticker);

    match dashboard.on_submit_report().await {
        Ok(SubmitOutcome::Ready { data, rendered }) => {
            print_report(&data, true);
            if rendered {
                let size = dashboard
                    .orchestrator()
                    .artifact_blob()
                    .map_or(0, |blob| blob.bytes.len());
                println!("Document loaded ({size} bytes). Use /download to save it.");
            } else {
                let state = dashboard.report_state();
                if let Some(e) = state.render_error {
                    println!("{} Use /retry to try again.", e.user_message());
                }
            }
        }
        Ok(SubmitOutcome::Skipped) => {
            println!("Enter a stock name and ticker first: /report <name> | <ticker>");
        }
        Ok(SubmitOutcome::Superseded) => {}
        Err(e) => eprintln!("{}", e.user_message()),
    }
}

/// Handle one command; returns `false` when the session should end
async fn handle(
    dashboard: &Dashboard,
    session: &TokenSession,
    auth: &AuthClient,
    command: Command,
) -> bool {
    match command {
        Command::Search { text } => {
            if text.chars().count() < 2 {
                println!("Type at least two characters to search.");
            }
            dashboard.on_search_input(&text);
        }
        Command::Pick { index } => match dashboard.search_state().results.get(index - 1) {
            Some(candidate) => {
                dashboard.on_select_candidate(candidate);
                let form = dashboard.form();
                println!("Selected {} ({}). /report to generate.", form.stock_name, form.ticker);
            }
            None => println!("No search result #{index}."),
        },
        Command::Report { form } => {
            if let Some((name, ticker)) = form {
                dashboard.set_form(&name, &ticker);
            }
            submit(dashboard).await;
        }
        Command::Recent { index } => match dashboard.recent_searches().get(index - 1) {
            Some(entry) => {
                dashboard.load_recent(entry);
                println!("Loaded {} ({}). /report to generate.", entry.stock_name, entry.ticker);
            }
            None => println!("No recent search #{index}."),
        },
        Command::Download { filename } => {
            match dashboard.on_download_report(filename.as_deref()).await {
                Ok(path) => println!("Saved {}", path.display()),
                Err(e) => eprintln!("{}", e.user_message()),
            }
        }
        Command::Retry => match dashboard.retry_render().await {
            Ok(()) => println!("Document loaded."),
            Err(e) => eprintln!("{}", e.user_message()),
        },
        Command::History => print_history(&dashboard.recent_searches()),
        Command::Login { email, password } => {
            match auth.sign_in(session, &email, &password).await {
                Ok(()) => println!("Signed in as {email}."),
                Err(e) => eprintln!("Login failed: {}", e.user_message()),
            }
        }
        Command::Logout => {
            dashboard.logout();
            println!("Signed out.");
        }
        Command::Help => println!("{}", Command::help_text()),
        Command::Exit => return false,
    }
    true
}

/// Run the interactive session until `/exit` or end of input
pub async fn run(
    dashboard: Dashboard,
    session: Arc<TokenSession>,
    config: &ClientConfig,
) -> Result<()> {
    let auth = AuthClient::new(config)?;
    print_banner(dashboard.session().is_authenticated());

    let printer = spawn_search_printer(dashboard.subscribe_search());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{PROMPT}");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match Command::parse(&line) {
            Ok(command) => {
                if !handle(&dashboard, &session, &auth, command).await {
                    break;
                }
            }
            Err(e) => eprintln!("{e}"),
        }
    }

    dashboard.close();
    printer.abort();
    println!("Goodbye!");
    Ok(())
}
