//! Command-line interface for the equityx report service
//!
//! # Usage
//!
//! ```bash
//! # Point at the API and sign in
//! export EQUITYX_API_URL="https://api.example.com/prod"
//! equityx login --email analyst@example.com --password '...'
//! export EQUITYX_TOKEN="<printed token>"
//!
//! # One-shot commands
//! equityx search apple
//! equityx report "Apple Inc" AAPL --summary --download
//!
//! # Interactive session
//! equityx repl
//! ```

mod commands;
mod output;
mod repl;

use anyhow::Result;
use clap::{Parser, Subcommand};
use equityx_client::{
    AuthClient, ClientConfig, Dashboard, RecentSearchStore, SessionGate, SubmitOutcome,
    SymbolSearch, SymbolSearchClient, TokenSession, require_authenticated,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const DEFAULT_LOG_FILTER: &str = "warn,equityx_client=info";

#[derive(Parser, Debug)]
#[command(name = "equityx")]
#[command(about = "Search stocks and generate equity analysis reports", long_about = None)]
#[command(version)]
struct Cli {
    /// Base URL of the report API [env: EQUITYX_API_URL]
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Bearer token [env: EQUITYX_TOKEN]
    #[arg(long, global = true)]
    token: Option<String>,

    /// File holding recent searches [env: EQUITYX_HISTORY_PATH]
    #[arg(long, global = true)]
    history_file: Option<PathBuf>,

    /// Directory downloaded reports are saved to [env: EQUITYX_DOWNLOAD_DIR]
    #[arg(long, global = true)]
    download_dir: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in and print a token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Search for symbols
    Search {
        /// Company name or symbol
        query: String,
    },
    /// Generate a report
    Report {
        /// Stock name, e.g. "Apple Inc"
        stock_name: String,
        /// Ticker symbol, e.g. AAPL
        ticker: String,
        /// Save the report document, optionally under FILE
        #[arg(long, value_name = "FILE", num_args = 0..=1)]
        download: Option<Option<String>>,
        /// Print the summary text
        #[arg(long)]
        summary: bool,
    },
    /// Show or clear recent searches
    History {
        #[arg(long)]
        clear: bool,
    },
    /// Interactive session
    Repl,
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder().with_env();
    if let Some(url) = &cli.api_url {
        builder = builder.api_base_url(url.as_str());
    }
    if let Some(path) = &cli.history_file {
        builder = builder.history_path(path);
    }
    if let Some(dir) = &cli.download_dir {
        builder = builder.download_dir(dir);
    }
    Ok(builder.build()?)
}

fn open_session(cli: &Cli) -> Arc<TokenSession> {
    match &cli.token {
        Some(token) => Arc::new(TokenSession::with_token(token.as_str())),
        None => Arc::new(TokenSession::from_env()),
    }
}

async fn login(config: &ClientConfig, email: &str, password: &str) -> Result<()> {
    let token = AuthClient::new(config)?.login(email, password).await?;
    println!("Signed in as {email}.");
    println!("export EQUITYX_TOKEN={token}");
    Ok(())
}

async fn search(config: &ClientConfig, session: &TokenSession, query: &str) -> Result<()> {
    require_authenticated(session)?;
    let client = SymbolSearchClient::new(config)?;
    let token = session.token();
    let results = client.search(query, token.as_deref()).await?;
    output::print_candidates(&results);
    Ok(())
}

async fn report(
    dashboard: &Dashboard,
    download: Option<Option<String>>,
    with_summary: bool,
) -> Result<()> {
    require_authenticated(dashboard.session())?;

    let data = match dashboard.on_submit_report().await {
        Ok(SubmitOutcome::Ready { data, .. }) => data,
        Ok(_) => anyhow::bail!("Stock name and ticker are required"),
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Err(e.into());
        }
    };
    output::print_report(&data, with_summary);

    if let Some(e) = dashboard.report_state().render_error {
        eprintln!("{}", e.user_message());
    }

    if let Some(filename) = download {
        let path = dashboard.on_download_report(filename.as_deref()).await?;
        println!("Saved {}", path.display());
    }
    Ok(())
}

fn history(config: &ClientConfig, clear: bool) -> Result<()> {
    let store = RecentSearchStore::at_path(config.history_path.clone(), config.history_capacity);
    if clear {
        store.clear()?;
        println!("Recent searches cleared.");
    } else {
        output::print_history(&store.list());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.json_logs {
        equityx_utils::init_tracing_json(DEFAULT_LOG_FILTER);
    } else {
        equityx_utils::init_tracing(DEFAULT_LOG_FILTER);
    }

    let config = load_config(&cli)?;
    let session = open_session(&cli);
    info!("Using API at {}", config.api_base_url);

    match cli.command {
        Commands::Login { email, password } => login(&config, &email, &password).await,
        Commands::Search { query } => search(&config, &session, &query).await,
        Commands::Report {
            stock_name,
            ticker,
            download,
            summary,
        } => {
            let dashboard = Dashboard::from_config(&config, session)?;
            dashboard.set_form(&stock_name, &ticker);
            report(&dashboard, download, summary).await
        }
        Commands::History { clear } => history(&config, clear),
        Commands::Repl => {
            let dashboard = Dashboard::from_config(&config, session.clone())?;
            repl::run(dashboard, session, &config).await
        }
    }
}
