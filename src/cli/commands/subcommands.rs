use super::TerminalView;
use crate::config::Config;
use crate::gateway::BridgeClient;
use crate::stream::render::Renderer;
use crate::stream::{Failure, StreamState, WebChatClient};
use crate::utils::http::default_http_client;
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub(super) async fn push(
    config: &Config,
    to: &str,
    message: Option<&str>,
    media: Option<&Path>,
) -> Result<()> {
    let client = BridgeClient::new(config.bridge.base_url());
    client
        .push(to, message, media)
        .await
        .with_context(|| format!("push to {} failed", to))?;
    println!("\u{2713} Sent to {}", to);
    Ok(())
}

pub(super) async fn chat(
    config: &Config,
    message: &str,
    file: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let client = WebChatClient::new(
        config.web.url.clone(),
        Renderer::new(config.web.artifact_prefix.clone()),
    );

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let mut view = TerminalView::new(std::io::stdout());
    let result = client.chat(message, file, &mut view, &cancel).await;
    watcher.abort();

    if let Some(failure) = view.failure() {
        match failure {
            Failure::Network(reason) => eprintln!("\u{2717} connection lost: {}", reason),
            Failure::Rejected(reason) => eprintln!("\u{2717} request rejected: {}", reason),
        }
    }
    let outcome = result?;

    if outcome.state == StreamState::Aborted {
        eprintln!("(stopped)");
    }
    if outcome.dropped_frames > 0 {
        debug!("{} malformed frame(s) skipped", outcome.dropped_frames);
    }
    if let Some(path) = output {
        crate::utils::atomic_write(path, view.html())
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("\u{2713} Wrote rendered reply to {}", path.display());
    }
    Ok(())
}

fn mark(ok: bool) -> &'static str {
    if ok { "\u{2713}" } else { "\u{2717}" }
}

pub(super) async fn status(
    config: &Config,
    config_path: Option<&Path>,
    wait: Option<Duration>,
) -> Result<()> {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => crate::config::get_config_path()?,
    };

    println!("\u{1f980} clawbridge Status\n");
    println!("Config: {} {}", path.display(), mark(path.exists()));

    let wa = &config.channels.whatsapp;
    println!(
        "WhatsApp: {}",
        if wa.enabled { "enabled" } else { "disabled" }
    );
    println!(
        "  webhook: {}:{}{}",
        wa.webhook_host, wa.webhook_port, wa.webhook_path
    );
    println!(
        "  allowFrom: {}",
        if wa.allow_from.is_empty() {
            "everyone".to_string()
        } else {
            wa.allow_from.join(", ")
        }
    );
    let credentials = crate::config::credentials::configured_credentials(config);
    println!("Credentials set: {}", credentials.join(", "));
    println!("Agent endpoint: {}", config.agent.url);

    if config.bridge.enabled {
        let url = format!("{}/api/health", config.bridge.base_url());
        let up = match default_http_client().get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!("bridge health check failed: {}", e);
                false
            }
        };
        println!("Bridge: {} {}", config.bridge.base_url(), mark(up));
    } else {
        println!("Bridge: disabled");
    }

    let web = WebChatClient::new(config.web.url.clone(), Renderer::default());
    let ready = match wait {
        Some(deadline) => {
            println!("Waiting up to {:?} for the agent...", deadline);
            web.wait_until_ready(deadline).await.is_ok()
        }
        None => web.status().await.unwrap_or(false),
    };
    println!("Web chat: {} {}", config.web.url, mark(ready));
    Ok(())
}
