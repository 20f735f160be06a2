use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};

mod api;
mod app;
mod config;
mod handler;
mod message;
mod panel;
mod relay;
mod scenario;
mod server;
mod store;
mod tool;
mod tui;
mod ui;

use api::ApiClient;
use app::App;
use config::Config;
use relay::ProviderClient;
use store::ConversationStore;

#[derive(Parser)]
#[command(name = "socratic")]
#[command(about = "Terminal chat where the AI interviews you, one scenario at a time")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the chat TUI, optionally jumping straight into a scenario
    Chat {
        /// Scenario id (see `socratic scenarios`)
        scenario: Option<String>,
        /// Reopen the scenario's most recent conversation
        #[arg(short, long)]
        resume: bool,
    },
    /// Run the relay server the TUI talks to
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// List available scenarios
    Scenarios,
    /// Delete stored conversations for a scenario
    Clear {
        /// Scenario id
        scenario: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { port }) => serve(port).await,
        Some(Commands::Scenarios) => {
            list_scenarios();
            Ok(())
        }
        Some(Commands::Clear { scenario }) => clear_scenario(&scenario),
        Some(Commands::Chat { scenario, resume }) => run_tui(scenario.as_deref(), resume).await,
        None => run_tui(None, false).await,
    }
}

async fn serve(port: Option<u16>) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "socratic=info,tower_http=info".into()),
        )
        .init();

    let _ = Config::scaffold();
    let config = Config::load().unwrap_or_default();
    let api_key = config.api_key().ok_or_else(|| {
        anyhow!(
            "no provider API key: set {} or add api_key to the config file",
            relay::API_KEY_ENV
        )
    })?;

    let provider = ProviderClient::new(&config.provider_base_url(), &api_key, &config.model());
    let state = server::AppState {
        relay: Arc::new(provider),
    };

    server::serve(state, port.unwrap_or_else(|| config.port())).await
}

fn list_scenarios() {
    println!("Available scenarios:\n");
    for s in scenario::SCENARIOS {
        println!("  {:<22} {}", s.id, s.name);
        println!("  {:<22} {}\n", "", s.description);
    }
    println!("Start one with: socratic chat <scenario-id>");
}

fn clear_scenario(id: &str) -> Result<()> {
    scenario::get(id).ok_or_else(|| anyhow!("unknown scenario: {id}"))?;
    let store = ConversationStore::open()?;
    let removed = store.clear_scenario(id)?;
    println!("Removed {removed} conversation(s) for {id}");
    Ok(())
}

async fn run_tui(scenario_id: Option<&str>, resume: bool) -> Result<()> {
    let initial = match scenario_id {
        Some(id) => Some(scenario::get(id).ok_or_else(|| {
            anyhow!("unknown scenario: {id} (see `socratic scenarios`)")
        })?),
        None => None,
    };

    let config = Config::load().unwrap_or_default();
    let store = ConversationStore::open()?;
    let api = ApiClient::new(&config.server_url());

    let mut app = App::new(store, api);
    if let Some(scenario) = initial {
        app.start_scenario(scenario, resume);
    }

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(&mut app, event);
        }
        app.poll_relay().await;
    }

    tui::restore()?;
    Ok(())
}
