//! Deckshot panel - Entry Point
//!
//! Terminal front-end for the panel: one-shot commands against the backend,
//! or `watch` to keep the panel mounted and re-render it as the daemon's run
//! state changes.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use deckshot_panel::{
    panel::view::PluginDefinition, Config, ConfigState, Gateway, MockGateway, Panel, Reconciler,
    WsGateway,
};
use deckshot_protocol::ConfigSummary;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "deckshot-panel", about = "Control panel for the Deckshot screenshot uploader")]
struct Cli {
    /// Panel configuration file (defaults to the per-user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Backend address, overrides the configuration file
    #[arg(long)]
    backend: Option<String>,

    /// Poll interval in milliseconds, overrides the configuration file
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Use a simulated daemon instead of the backend
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Print whether Deckshot is running
    Status,
    /// Start Deckshot if stopped, stop it if running
    Toggle,
    /// Print the configuration summary
    Config,
    /// Keep the panel open and re-render on changes (default)
    Watch,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging (stderr, stdout is the panel)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let gateway = open_gateway(&cli, &config).await;

    match cli.command.unwrap_or(Commands::Watch) {
        Commands::Status => {
            let running = gateway.query_running().await?;
            println!("Deckshot is {}", if running { "running" } else { "stopped" });
        }
        Commands::Toggle => {
            let reconciler = Reconciler::new(gateway);
            let state = reconciler
                .toggle_confirmed()
                .await
                .context("Toggle outcome could not be confirmed")?;
            println!("Deckshot is {}", state);
        }
        Commands::Config => {
            let summary = gateway.fetch_config().await?;
            print_config(summary)?;
        }
        Commands::Watch => run_watch(gateway, &config).await?,
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(addr) = &cli.backend {
        config.backend.addr = addr.clone();
    }
    if let Some(interval_ms) = cli.interval_ms {
        config.poll.interval_ms = interval_ms;
    }

    Ok(config)
}

async fn open_gateway(cli: &Cli, config: &Config) -> Arc<dyn Gateway> {
    if cli.mock {
        info!("Using simulated daemon");
        let summary: Option<ConfigSummary> =
            serde_json::from_value(serde_json::json!({ "uploader": { "kind": "noop" } })).ok();
        return Arc::new(
            MockGateway::new(false)
                .with_latency(Duration::from_millis(150))
                .with_config(summary),
        );
    }

    let gateway = WsGateway::connect(&config.backend.addr);
    if !gateway.wait_connected(config.connect_timeout()).await {
        warn!("Backend at {} not reachable yet", config.backend.addr);
    }
    Arc::new(gateway)
}

fn print_config(summary: Option<ConfigSummary>) -> Result<()> {
    let state = ConfigState::Loaded(summary);
    println!("Uploader: {}", state.uploader_label());

    if let Some(summary) = state.summary() {
        let pretty = serde_json::to_string_pretty(summary).context("Failed to format configuration")?;
        println!("{}", pretty);
    }
    Ok(())
}

async fn run_watch(gateway: Arc<dyn Gateway>, config: &Config) -> Result<()> {
    let mut panel = Panel::mount(gateway, config);
    let mut state_rx = panel.subscribe();
    let mut config_rx = panel.subscribe_config();
    let mut config_pending = true;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("t = toggle, o = open instructions, q = quit");
    let mut last_view = render(None, panel.view());

    loop {
        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                state_rx.borrow_and_update();
            }
            changed = config_rx.changed(), if config_pending => {
                // Sender goes away once the one-shot fetch is done
                config_pending = changed.is_ok();
                config_rx.borrow_and_update();
            }
            line = lines.next_line() => match line.context("Failed to read stdin")? {
                Some(line) => match line.trim() {
                    "t" => panel.toggle(),
                    "o" => panel.open_instructions(),
                    "q" => break,
                    "" => {}
                    other => eprintln!("unknown command: {}", other),
                },
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }

        last_view = render(Some(&last_view), panel.view());
    }

    panel.unmount();
    Ok(())
}

/// Print `view` unless it matches what is already on screen
fn render(last: Option<&PluginDefinition>, view: PluginDefinition) -> PluginDefinition {
    if last != Some(&view) {
        println!("{}", view);
    }
    view
}
