//! Courier CLI - binary entry point.
//!
//! ```text
//! courier status <application-id>   race both status sources, print the response as JSON
//! courier broadcast                 read the next event, deliver it to every recipient
//! ```
//!
//! Configuration comes from `$COURIER_CONFIG` or `~/.courier/config.toml`;
//! logs go to stderr, filtered by `RUST_LOG` (default `info`).

use std::{env, sync::Arc};

use anyhow::{Context, Result, anyhow, bail};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use courier_config::CourierConfig;
use courier_engine::{
    BroadcastHandler, FanoutSettings, RaceSettings, StatusHandler, WorkerPool,
};
use courier_providers::http::{HttpDeliveryClient, HttpStatusClient};
use courier_providers::http_client;
use courier_types::ApplicationId;

const USAGE: &str = "usage: courier status <application-id> | courier broadcast";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Status(ApplicationId),
    Broadcast,
}

impl Command {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut args = args.into_iter();
        let command = match args.next().as_deref() {
            Some("status") => {
                let raw = args
                    .next()
                    .ok_or_else(|| anyhow!("missing application id\n{USAGE}"))?;
                Command::Status(ApplicationId::new(raw)?)
            }
            Some("broadcast") => Command::Broadcast,
            Some(other) => bail!("unknown command '{other}'\n{USAGE}"),
            None => bail!("{USAGE}"),
        };
        if let Some(extra) = args.next() {
            bail!("unexpected argument '{extra}'\n{USAGE}");
        }
        Ok(command)
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
    value.ok_or_else(|| anyhow!("{field} is not configured"))
}

fn run_status(config: &CourierConfig, pool: Arc<WorkerPool>, id: &ApplicationId) -> Result<()> {
    let status = &config.status;
    let client = HttpStatusClient::new(
        http_client()?,
        required(status.primary_url.as_deref(), "status.primary_url")?,
        required(status.secondary_url.as_deref(), "status.secondary_url")?,
    )?;
    let handler = StatusHandler::new(pool, Arc::new(client), RaceSettings::from_config(status));

    let response = handler
        .perform_operation(id)
        .with_context(|| format!("status lookup for {id} failed"))?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn run_broadcast(config: &CourierConfig, pool: Arc<WorkerPool>) -> Result<()> {
    let broadcast = &config.broadcast;
    let client = HttpDeliveryClient::new(
        http_client()?,
        required(broadcast.events_url.as_deref(), "broadcast.events_url")?,
        required(broadcast.send_url.as_deref(), "broadcast.send_url")?,
    )?;
    let handler = BroadcastHandler::new(
        pool,
        Arc::new(client),
        FanoutSettings::from_config(broadcast),
    );

    let summary = handler.perform_operation().context("broadcast failed")?;
    println!(
        "delivered to {} recipients in {} sends",
        summary.recipients, summary.attempts
    );
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();

    let command = Command::parse(env::args().skip(1))?;
    let config = CourierConfig::load()
        .context("failed to load config")?
        .unwrap_or_default();
    let pool = Arc::new(WorkerPool::new(config.pool.threads)?);

    match command {
        Command::Status(id) => run_status(&config, pool, &id),
        Command::Broadcast => run_broadcast(&config, pool),
    }
}
