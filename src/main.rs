//! Corral — a Telegram control panel for Docker workloads and screen logs.

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use corral::bot::ControlBot;
use corral::config::BotConfig;
use corral::metrics;
use corral::runtime::WorkloadRuntime;
use corral::runtime::docker::DockerCli;
use corral::transport::ChannelEvent;
use corral::transport::telegram::TelegramTransport;

/// Corral — chat-driven control panel for a Docker host.
#[derive(Parser)]
#[command(name = "corral", version, about)]
struct Cli {
    /// Path to the config file.
    #[arg(short, long, default_value = "corral.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the bot (long-poll loop + health monitor).
    Run,

    /// Print host metrics and workload statuses once, then exit.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    match cli.command {
        Command::Run => cmd_run(&cli.config).await,
        Command::Status => cmd_status(&cli.config).await,
    }
}

async fn cmd_run(config_path: &Path) -> Result<()> {
    let config = BotConfig::load(config_path)?;
    eprintln!("[bot] loaded config from {}", config_path.display());
    eprintln!("[bot] monitor interval: {}s", config.monitor_interval_secs);
    eprintln!("[bot] alert chat: {}", config.telegram.alert_chat_id);

    let transport = Arc::new(TelegramTransport::new(
        config.telegram.bot_token.clone(),
        config.allowed_user_ids.clone(),
    ));
    let runtime = Arc::new(DockerCli::new(config.docker_bin.clone()));

    let cancel = CancellationToken::new();

    // SIGTERM/SIGINT handler.
    let shutdown_cancel = cancel.clone();
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to install SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }
        eprintln!("\n[bot] shutdown signal received");
        shutdown_cancel.cancel();
    });

    // Telegram long-poll loop feeding the dispatch loop.
    let (tx, rx) = mpsc::channel::<ChannelEvent>(64);
    let poll_transport = transport.clone();
    let poll_cancel = cancel.clone();
    tokio::spawn(async move {
        poll_transport.run(tx, poll_cancel).await;
    });

    let mut bot = ControlBot::new(config, transport, runtime);
    bot.run(rx, cancel).await
}

async fn cmd_status(config_path: &Path) -> Result<()> {
    // Status works without Telegram wiring; config is optional here.
    let docker_bin = BotConfig::load(config_path)
        .map(|c| c.docker_bin)
        .unwrap_or_else(|_| "docker".to_owned());
    let runtime = DockerCli::new(docker_bin);

    println!("{}", metrics::snapshot().await);
    println!();

    match runtime.list(true).await {
        Ok(workloads) if workloads.is_empty() => println!("No containers."),
        Ok(workloads) => {
            println!("Containers:");
            for w in &workloads {
                println!("  {}: {}", w.name, w.status);
            }
        }
        Err(e) => println!("Containers unavailable: {e}"),
    }

    Ok(())
}
