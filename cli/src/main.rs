//! counterlink CLI — talk to the counter backend from the terminal.
//!
//! # Commands
//! ```text
//! counterlink health
//! counterlink info
//! counterlink add 5 3
//! counterlink add 5 3 --realtime
//! counterlink watch --ping-secs 10
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Number, Value};
use tokio::sync::mpsc;

use counterlink_core::message::{kinds, Message};
use counterlink_core::status::ConnectionStatus;
use counterlink_http::ApiClient;
use counterlink_ws::RealtimeChannel;

mod config;
mod logging;

use config::{ClientConfig, API_URL_ENV};

#[derive(Parser)]
#[command(
    name = "counterlink",
    about = "Counter API client over HTTP and an optional WebSocket channel",
    long_about = "
Counterlink talks to the counter backend over its HTTP API and, when the
server supports it, over a real-time WebSocket channel derived from the same
base URL (http -> ws, https -> wss).

ENVIRONMENT VARIABLES:
  COUNTERLINK_API_URL   Base URL of the counter API
  RUST_LOG              Log filter (overrides the config file)
",
    version
)]
struct Cli {
    /// YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the counter API (overrides config and environment)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON logs
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health (GET /health)
    Health,

    /// Show API info (GET /)
    Info,

    /// Add two numbers
    Add {
        #[arg(allow_negative_numbers = true)]
        a: f64,
        #[arg(allow_negative_numbers = true)]
        b: f64,
        /// Use the real-time channel, falling back to HTTP if unavailable
        #[arg(long)]
        realtime: bool,
    },

    /// Connect the real-time channel and print everything it sees
    Watch {
        /// Send a health message every N seconds while connected
        #[arg(long)]
        ping_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ClientConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    if cli.verbose {
        config.log.level = "debug".into();
    }
    if cli.json_logs {
        config.log.json = true;
    }
    logging::init_tracing(&config.log);
    tracing::debug!(api_url = %config.api_url, "configuration loaded");

    match cli.command {
        Commands::Health => cmd_health(&config).await,
        Commands::Info => cmd_info(&config).await,
        Commands::Add { a, b, realtime } => cmd_add(&config, a, b, realtime).await,
        Commands::Watch { ping_secs } => cmd_watch(&config, ping_secs).await,
    }
}

fn api_client(config: &ClientConfig) -> Result<ApiClient> {
    ApiClient::new(&config.api_url, config.api_client_config())
        .with_context(|| format!("set --api-url or {API_URL_ENV}"))
}

fn realtime_channel(config: &ClientConfig) -> Result<RealtimeChannel> {
    Ok(RealtimeChannel::for_api(
        &config.api_url,
        config.channel_config(),
    )?)
}

async fn cmd_health(config: &ClientConfig) -> Result<()> {
    let health = api_client(config)?.health().await?;
    println!("  Status:  {}", health.status);
    println!("  Message: {}", health.message);
    Ok(())
}

async fn cmd_info(config: &ClientConfig) -> Result<()> {
    let info = api_client(config)?.info().await?;
    println!("  Message:  {}", info.message);
    if let Some(api_base) = info.api_base {
        println!("  API base: {api_base}");
    }
    Ok(())
}

async fn cmd_add(config: &ClientConfig, a: f64, b: f64, realtime: bool) -> Result<()> {
    if realtime {
        match add_realtime(config, a, b).await {
            Ok(result) => {
                println!("{result}");
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(error = %e, "realtime add failed, falling back to HTTP");
            }
        }
    }

    let result = api_client(config)?.add(a, b).await?;
    println!("{result}");
    Ok(())
}

/// Wait until the channel settles on `connected` or gives up.
async fn await_connected(
    channel: &RealtimeChannel,
    statuses: &mut mpsc::UnboundedReceiver<ConnectionStatus>,
    window: Duration,
) -> Result<()> {
    tokio::time::timeout(window, async {
        while let Some(status) = statuses.recv().await {
            match status {
                ConnectionStatus::Connected => return Ok(()),
                ConnectionStatus::Disconnected if !channel.reconnect_pending() => {
                    bail!("realtime channel unavailable at {}", channel.url())
                }
                _ => {}
            }
        }
        bail!("status stream ended")
    })
    .await
    .map_err(|_| anyhow!("realtime channel did not connect within {window:?}"))?
}

async fn add_realtime(config: &ClientConfig, a: f64, b: f64) -> Result<Value> {
    let to_number =
        |x: f64| Number::from_f64(x).ok_or_else(|| anyhow!("{x} is not a JSON number"));
    let (a, b) = (to_number(a)?, to_number(b)?);

    let channel = realtime_channel(config)?;
    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    let status_sub = channel.on_status_change(move |s| {
        let _ = status_tx.send(*s);
    });
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();
    let reply_sub = channel.on_message(move |m| {
        if m.is(kinds::ADD) {
            let _ = reply_tx.send(m.clone());
        }
    });

    channel.connect();
    let window = config.channel_config().connect_timeout + Duration::from_secs(1);
    let outcome = exchange_add(&channel, &mut status_rx, &mut reply_rx, window, a, b).await;

    status_sub.unsubscribe();
    reply_sub.unsubscribe();
    channel.disconnect();
    outcome
}

async fn exchange_add(
    channel: &RealtimeChannel,
    statuses: &mut mpsc::UnboundedReceiver<ConnectionStatus>,
    replies: &mut mpsc::UnboundedReceiver<Message>,
    window: Duration,
    a: Number,
    b: Number,
) -> Result<Value> {
    await_connected(channel, statuses, window).await?;
    channel.send_add_numbers(a, b)?;

    let reply = tokio::time::timeout(Duration::from_secs(5), replies.recv())
        .await
        .map_err(|_| anyhow!("no reply to add"))?
        .ok_or_else(|| anyhow!("channel closed before reply"))?;
    reply
        .data
        .as_ref()
        .and_then(|d| d.get("result"))
        .cloned()
        .ok_or_else(|| anyhow!("add reply without result: {:?}", reply.data))
}

async fn cmd_watch(config: &ClientConfig, ping_secs: Option<u64>) -> Result<()> {
    let channel = realtime_channel(config)?;
    println!("Watching {}", channel.url());

    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    let _statuses = channel.on_status_change(move |s| {
        let _ = status_tx.send(*s);
    });
    let _messages = channel.on_message(|m| match serde_json::to_string(m) {
        Ok(json) => println!("  <- {json}"),
        Err(e) => tracing::debug!(error = %e, "unprintable message"),
    });
    let _errors = channel.on_error(|e| eprintln!("  !! {e}"));

    channel.connect();

    let period = Duration::from_secs(ping_secs.unwrap_or(0).max(1));
    let mut ping = tokio::time::interval(period);
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                channel.disconnect();
                return Ok(());
            }
            status = status_rx.recv() => {
                let Some(status) = status else { return Ok(()) };
                println!("  status: {status}");
                if status == ConnectionStatus::Disconnected && !channel.reconnect_pending() {
                    println!("  channel closed, not reconnecting (use HTTP commands instead)");
                    return Ok(());
                }
            }
            _ = ping.tick(), if ping_secs.is_some() => {
                if channel.is_connected() && send_ping(&channel) {
                    println!("  -> health");
                }
            }
        }
    }
}

/// Send a health message; a channel that closed since the last status check
/// only skips this ping.
fn send_ping(channel: &RealtimeChannel) -> bool {
    match channel.send_health_check() {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "health ping skipped");
            false
        }
    }
}
