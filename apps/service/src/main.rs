use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use uuid::Uuid;

use tokio_util::sync::CancellationToken;

use echowatch_service::config::Config;
use echowatch_service::context::open_database;
use echowatch_service::database::{MonitorDirectory, MonitorDraft, MonitorOrder};
use echowatch_service::monitoring::IcmpProber;
use echowatch_service::telemetry::log_messages;
use echowatch_service::ServiceContext;

/// Periodic ICMP reachability monitor
#[derive(Parser, Debug)]
#[command(name = "echowatch-service", version, about)]
struct Cli {
    /// Path to the config file (defaults to $XDG_CONFIG_HOME/echowatch/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the probe engine and log telemetry until ctrl-c
    Run,
    /// Add a monitor
    Add {
        address: String,
        #[arg(short, long, default_value = "")]
        label: String,
        #[arg(long, default_value_t = false)]
        disabled: bool,
    },
    /// List monitors with their current state
    List {
        /// Sort field, e.g. address, label, status, last_success_on
        #[arg(short, long)]
        sort: Option<String>,
        /// asc or desc
        #[arg(short, long)]
        direction: Option<String>,
    },
    /// Remove a monitor by id
    Remove { id: Uuid },
    /// Print the effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init_with_level(if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO });

    let config = Config::from_config(cli.config.as_ref()).context("loading config")?;

    if let Command::ShowConfig = cli.command {
        println!("{config}");
        return Ok(());
    }

    if let Command::Run = cli.command {
        let prober = Arc::new(IcmpProber::new().context("opening ICMP socket")?);
        let context = ServiceContext::build(&config, prober).await?;
        return run(context).await;
    }

    let database = open_database(&config).await?;
    match cli.command {
        Command::Add { address, label, disabled } => {
            let draft = MonitorDraft::new(address).with_label(label).with_enabled(!disabled);
            let monitor = database.add_monitor(&draft).await?;
            println!("{}\t{}", monitor.id, monitor.address);
        }
        Command::List { sort, direction } => {
            let order = MonitorOrder::parse(sort.as_deref(), direction.as_deref())?;
            for entry in database.list_monitors(&order).await? {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    entry.monitor.id,
                    entry.monitor.address,
                    entry.state.last_status,
                    entry.state.failed_count.map(|c| c.to_string()).unwrap_or_else(|| "-".into()),
                    entry.state.last_success_on.map(|t| t.to_rfc3339()).unwrap_or_else(|| "never".into()),
                );
            }
        }
        Command::Remove { id } => {
            database.remove_monitor(id).await?;
            println!("removed {id}");
        }
        // handled above
        Command::Run | Command::ShowConfig => {}
    }

    Ok(())
}

async fn run(context: ServiceContext) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let journal = tokio::spawn(log_messages(context.hub.clone(), shutdown.clone()));
    context.start_engine().await?;

    let signal = tokio::signal::ctrl_c().await;

    info!("Shutting down");
    context.engine.stop().await;
    shutdown.cancel();
    if let Err(e) = journal.await {
        warn!(error = %e, "Telemetry log task failed");
    }

    signal.context("waiting for ctrl-c")
}
