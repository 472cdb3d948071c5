#![warn(clippy::all, clippy::pedantic)]

use std::path::PathBuf;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use tracing::info;

mod error;
mod routes;

use echowatch_service::monitoring::IcmpProber;
use echowatch_service::{Config, ServiceContext};

/// ICMP reachability monitor with a live dashboard API
#[derive(Parser, Debug)]
#[command(name = "echowatch-server", version, about)]
struct Cli {
    /// Path to the config file (defaults to $XDG_CONFIG_HOME/echowatch/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long, default_value_t = false)]
    show_config: bool,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    logger::init();

    let cli = Cli::parse();
    let config = Config::from_config(cli.config.as_ref()).context("loading config")?;
    if cli.show_config {
        println!("{config}");
        return Ok(());
    }

    let prober = Arc::new(IcmpProber::new().context("opening ICMP socket")?);
    let context = ServiceContext::build(&config, prober).await?;
    context.start_engine().await?;

    let served = run_server(&config, context.clone()).await;

    info!("HTTP server stopped, draining probe engine");
    context.engine.stop().await;
    served
}

async fn run_server(config: &Config, context: ServiceContext) -> anyhow::Result<()> {
    let data = web::Data::new(context);
    info!(address = %config.http_address(), "Starting HTTP server");

    HttpServer::new(move || App::new().app_data(data.clone()).configure(routes::routes))
        .bind((config.http.bind.as_str(), config.http.port))
        .with_context(|| format!("binding {}", config.http_address()))?
        .shutdown_timeout(config.engine.shutdown_grace_secs)
        .run()
        .await?;

    Ok(())
}
