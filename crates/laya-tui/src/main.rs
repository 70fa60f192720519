//! # LAYA terminal client (`laya`)
//!
//! Without a subcommand, `laya` opens the interactive search/chat/projects
//! TUI. Subcommands run a single backend call and print the result.
//!
//! ```bash
//! laya                               # interactive
//! laya search "vector databases" -l 5
//! laya ask "What is LAYA?" --top-k 4
//! laya projects list
//! laya --api-url http://localhost:8000 ingest notes.pdf cv.docx
//! ```

mod app;
mod cli;
mod handler;
mod tui;
mod ui;

use anyhow::{Context as _, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use app::App;
use laya_core::{ApiClient, ChatController, Config, LocalStore};
use tui::{AppEvent, EventHandler, Tui};

const DEFAULT_LOG_FILTER: &str = "laya=info,laya_core=info";
const TICK_MS: u64 = 100;

#[derive(Parser)]
#[command(name = "laya", version, about = "Search, chat and manage projects on a LAYA backend")]
struct Cli {
    /// Backend base URL. Overrides LAYA_API_URL and the config file.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Directory for the theme, last query, chat transcript and log file.
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<cli::Commands>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let store = match &cli.state_dir {
        Some(dir) => Some(LocalStore::new(dir)),
        None => LocalStore::open_default(),
    };
    let interactive = cli.command.is_none();

    if interactive {
        init_file_logging(store.as_ref().map(LocalStore::root));
    } else {
        init_stderr_logging();
    }

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "config file unreadable, using defaults");
        Config::new()
    });

    let mut api = ApiClient::from_config(&config);
    if let Some(url) = &cli.api_url {
        api = api.with_base_url(url);
    }
    tracing::info!(base_url = %api.base_url(), "LAYA client starting v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        None => run_tui(api, store, &config).await,
        Some(command) => {
            let mut chat = ChatController::new(config.error_prefix());
            chat.top_k = Some(config.top_k());
            let ctx = cli::Context {
                api,
                chat,
                search_limit: config.search_limit(),
                store,
            };
            cli::run(ctx, command).await
        }
    }
}

async fn run_tui(api: ApiClient, store: Option<LocalStore>, config: &Config) -> Result<()> {
    let mut app = App::new(api, store, config);

    // Both guards restore their resources on every exit path
    let mut tui = Tui::enter().context("failed to set up terminal")?;
    let mut events = EventHandler::new(TICK_MS);

    while !app.should_quit {
        tui.terminal.draw(|frame| ui::render(&mut app, frame))?;

        match events.next().await {
            Some(event) => {
                let is_tick = matches!(event, AppEvent::Tick);
                handler::handle_event(&mut app, event).await?;
                if !is_tick {
                    // Pick up anything that finished while the key was handled
                    app.poll_tasks().await;
                }
            }
            None => break,
        }
    }

    tracing::info!("LAYA client exiting");
    Ok(())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// The TUI owns the terminal, so logs go to `<state dir>/laya.log` instead.
fn init_file_logging(state_dir: Option<&Path>) {
    let file = state_dir.and_then(|dir| {
        std::fs::create_dir_all(dir).ok()?;
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("laya.log"))
            .ok()
    });

    // No writable state dir: stay silent rather than draw over the UI
    let Some(file) = file else {
        return;
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}
