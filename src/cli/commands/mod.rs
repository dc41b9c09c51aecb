mod subcommands;
mod view;

#[cfg(test)]
mod tests;

use crate::access::Whitelist;
use crate::agent::{AgentService, EchoAgent, HttpAgentClient};
use crate::channels::{ChatTransport, Outbox, WhatsAppTransport};
use crate::config::{Config, load_config};
use crate::relay::InboundRelay;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub(crate) use view::TerminalView;

/// Inbound messages buffered between the webhook and the relay.
const INBOUND_CAPACITY: usize = 256;

/// Time given to in-flight work after Ctrl+C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "clawbridge")]
#[command(about = "WhatsApp bridge for a chat agent")]
#[command(version)]
pub struct Cli {
    /// Config file (default: ~/.clawbridge/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Run the relay and the outbound bridge
    Serve {
        /// Echo mode: test transport connectivity without an agent
        #[arg(long)]
        echo: bool,
    },
    /// Push a message through a running bridge
    Push {
        /// Destination phone number or qualified id
        #[arg(long)]
        to: String,
        #[arg(short, long)]
        message: Option<String>,
        /// Media file to attach (audio goes out as a voice note)
        #[arg(long)]
        media: Option<PathBuf>,
    },
    /// Send one message to the web chat API and stream the reply
    Chat {
        #[arg(short, long)]
        message: String,
        /// File to attach to the request
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Write the final rendered HTML here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show configuration and service status
    Status {
        /// Wait up to this many seconds for the agent to report ready
        #[arg(long, value_name = "SECS")]
        wait: Option<u64>,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init { force } => {
            init(config_path, force)?;
        }
        Commands::Serve { echo } => {
            serve(config_path, echo).await?;
        }
        Commands::Push { to, message, media } => {
            let config = load_config(config_path)?;
            subcommands::push(&config, &to, message.as_deref(), media.as_deref()).await?;
        }
        Commands::Chat {
            message,
            file,
            output,
        } => {
            let config = load_config(config_path)?;
            subcommands::chat(&config, &message, file.as_deref(), output.as_deref()).await?;
        }
        Commands::Status { wait } => {
            let config = load_config(config_path)?;
            subcommands::status(&config, config_path, wait.map(Duration::from_secs)).await?;
        }
    }

    Ok(())
}

fn init(config_path: Option<&Path>, force: bool) -> Result<()> {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => crate::config::get_config_path()?,
    };
    if path.exists() && !force {
        println!(
            "\u{26a0}\u{fe0f}  Config already exists at {} (use --force to overwrite)",
            path.display()
        );
        return Ok(());
    }

    let written = crate::config::save_config(&Config::default(), Some(path.as_path()))?;
    println!("\u{2713} Created config at {}", written.display());
    println!("\nNext steps:");
    println!("  1. Set channels.whatsapp.accessToken and phoneNumberId, then enabled: true");
    println!("  2. Point agent.url at your agent endpoint");
    println!("  3. Run: clawbridge serve");
    Ok(())
}

async fn serve(config_path: Option<&Path>, echo: bool) -> Result<()> {
    info!("Loading configuration...");
    let config = load_config(config_path)?;
    let wa = &config.channels.whatsapp;
    if !wa.enabled {
        anyhow::bail!("whatsapp channel is disabled (set channels.whatsapp.enabled)");
    }

    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
    let transport = Arc::new(WhatsAppTransport::new(wa.clone(), inbound_tx));
    transport
        .start()
        .await
        .context("failed to start whatsapp transport")?;
    let (outbox, mut outbox_task) = Outbox::spawn(transport.clone());

    let agent: Arc<dyn AgentService> = if echo {
        println!("Starting clawbridge in ECHO mode (no agent)...");
        Arc::new(EchoAgent)
    } else {
        info!("agent endpoint: {}", config.agent.url);
        Arc::new(HttpAgentClient::new(
            config.agent.url.clone(),
            Duration::from_secs(config.agent.timeout_secs),
        ))
    };

    let whitelist = Whitelist::new(wa.allow_from.as_slice());
    if whitelist.is_empty() {
        warn!("no allowFrom entries: every direct sender can reach the agent");
    } else {
        info!("whitelist has {} sender(s)", whitelist.len());
    }
    let relay = InboundRelay::new(agent, outbox.clone(), whitelist);
    let relay_stop = CancellationToken::new();
    let mut relay_task = tokio::spawn(relay.run(inbound_rx, relay_stop.clone()));

    let shutdown = CancellationToken::new();
    let bridge_task = if config.bridge.enabled {
        let (handle, addr) = crate::gateway::start(
            &config.bridge.host,
            config.bridge.port,
            outbox.clone(),
            shutdown.clone(),
        )
        .await?;
        println!("Outbound bridge listening on http://{}", addr);
        Some(handle)
    } else {
        None
    };
    drop(outbox);

    println!("clawbridge is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    println!("\nShutting down...");

    shutdown.cancel();
    if let Some(handle) = bridge_task
        && tokio::time::timeout(SHUTDOWN_GRACE, handle).await.is_err()
    {
        warn!("bridge did not stop within {:?}", SHUTDOWN_GRACE);
    }
    if let Err(e) = transport.stop().await {
        warn!("error stopping whatsapp transport: {}", e);
    }
    // Webhook is down; let the relay finish what it already accepted.
    relay_stop.cancel();
    if tokio::time::timeout(SHUTDOWN_GRACE, &mut relay_task)
        .await
        .is_err()
    {
        warn!("relay did not finish within {:?}, abandoning replies", SHUTDOWN_GRACE);
        relay_task.abort();
    }
    // Last outbox handle went with the relay.
    if tokio::time::timeout(SHUTDOWN_GRACE, &mut outbox_task)
        .await
        .is_err()
    {
        outbox_task.abort();
    }
    Ok(())
}
