//! Roster Server
//!
//! Standalone Roster registry binary.

use anyhow::Context;
use clap::{Parser, Subcommand};
use roster_core::io::IoContext;
use roster_core::{init_telemetry, LogFormat, RosterConfig, TelemetryConfig};
use roster_registry::{BackendCatalog, HealthMonitor};
use roster_server::security::{default_token_ttl, TokenIssuer};
use roster_server::{router, AppState};
use std::path::PathBuf;
use std::time::Duration;

/// Roster server CLI
#[derive(Parser, Debug)]
#[command(name = "roster-server")]
#[command(about = "Multi-tenant service-discovery registry")]
#[command(version)]
struct Cli {
    /// Configuration file path (YAML)
    #[arg(short, long, env = "ROSTER_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address, overrides configuration
    #[arg(short, long)]
    bind: Option<String>,

    /// Registry backend, overrides configuration
    #[arg(long)]
    backend: Option<String>,

    /// Log output format (text or json)
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a signed bearer token for a tenant and exit
    Token {
        /// Tenant named by the token; empty for the default scope
        #[arg(long, default_value = "")]
        tenant: String,

        /// Issuer claim
        #[arg(long, default_value = "roster")]
        issuer: String,

        /// Token lifetime, e.g. "30m" or "12h" (default: 30m)
        #[arg(long, value_parser = humantime::parse_duration)]
        ttl: Option<Duration>,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<RosterConfig> {
    let mut config = match &cli.config {
        Some(path) => RosterConfig::from_file(path)?,
        None => RosterConfig::default(),
    };
    config.apply_env();

    if let Some(bind) = &cli.bind {
        config.server.bind_address = bind.clone();
    }
    if let Some(backend) = &cli.backend {
        config.registry.backend = backend.clone();
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    if let Some(Command::Token {
        tenant,
        issuer,
        ttl,
    }) = &cli.command
    {
        let secret = config
            .server
            .secret_key
            .as_deref()
            .context("ROSTER_SECRET_KEY must be set to issue tokens")?;
        let token = TokenIssuer::new(secret, IoContext::production())?.generate(
            issuer,
            tenant,
            ttl.unwrap_or_else(default_token_ttl),
        )?;
        println!("{token}");
        return Ok(());
    }

    // Initialize logging
    let mut telemetry = TelemetryConfig::from_env();
    telemetry.service_name = "roster-server".to_string();
    match cli.verbose {
        0 => {}
        1 => telemetry.log_level = "debug".to_string(),
        _ => telemetry.log_level = "trace".to_string(),
    }
    if let Some(format) = cli.log_format {
        telemetry.format = format;
    }
    init_telemetry(telemetry)?;

    tracing::info!(
        bind = %config.server.bind_address,
        backend = %config.registry.backend,
        max_clients = config.registry.max_clients,
        ping_interval_ms = config.registry.ping_interval_ms,
        "Roster server starting"
    );

    let registry = BackendCatalog::with_builtins().init(&config.registry, IoContext::production())?;
    let monitor = HealthMonitor::start(
        registry.clone(),
        Duration::from_millis(config.registry.monitor_tick_ms),
    );

    let state = AppState::from_config(registry, &config.server)?;
    if !state.tenants().bearer_enabled() && !state.tenants().basic_enabled() {
        tracing::warn!("No credentials configured; every /api request will be rejected");
    }

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_address))?;
    tracing::info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down");
    monitor.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
