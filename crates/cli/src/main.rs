//! twin-reconciler entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: flags with environment fallbacks (see [`config`]).
//! 2. **Wire observability**: `tracing-subscriber` with a JSON or pretty fmt
//!    layer, plus an OpenTelemetry OTLP exporter when an endpoint is configured.
//!    All spans and structured events emitted by every crate flow through it.
//! 3. **Construct infrastructure**: the HTTP registry connector and the
//!    signature verifier, injected into the webhook router.
//! 4. **Select mode**:
//!    - `serve`: bind the webhook endpoint and reconcile each delivery.
//!    - `simulate`: reconcile one delivery against an in-memory registry seeded
//!      from a device listing and print the reconciliation as JSON.

mod config;
mod observability;

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use listener::{build_router, AppState, SignatureVerifier};
use reconciler::{InMemoryRegistry, Reconciler};
use registry::wire::ListDevicesResponse;
use registry::{RegistryEndpoints, ServiceAccount, ServiceAccountConnector};
use secrecy::SecretString;
use tokio::net::TcpListener;
use tracing::{info, warn};
use twin::Delivery;

use crate::config::{Cli, Command, ServeArgs, SimulateArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let telemetry = observability::init(cli.log_format, cli.otlp_endpoint.as_deref())?;

    let result = match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Simulate(args) => simulate(args).await,
    };

    telemetry.shutdown();
    result
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.request_timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let connector = ServiceAccountConnector::new(
        http,
        ServiceAccount {
            email: args.service_account_email,
            key_id: args.service_account_key_id,
            secret: SecretString::from(args.service_account_secret),
            auth_endpoint: args.auth_endpoint,
        },
        RegistryEndpoints::new(args.api_url_base, args.emu_url_base),
    );

    let verifier = SignatureVerifier::new(args.signature_secret.map(SecretString::from));
    if !verifier.has_secret() {
        warn!("no signature secret configured; every delivery will be rejected");
    }

    let router = build_router(AppState::new(connector, verifier, args.model.into_config()));

    let listener = TcpListener::bind(args.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", args.bind_addr))?;
    info!(addr = %args.bind_addr, "listening for deliveries");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("webhook server failed")?;

    info!("shutdown complete");
    Ok(())
}

async fn simulate(args: SimulateArgs) -> anyhow::Result<()> {
    let delivery: Delivery = read_json(&args.payload)?;
    let listing: ListDevicesResponse = read_json(&args.roster)?;
    let devices = listing
        .into_devices()
        .with_context(|| format!("invalid device in {}", args.roster.display()))?;

    let config = args.model.into_config();
    let registry = InMemoryRegistry::with_twin_prefix(devices, config.twin_id_prefix.clone());

    let reconciliation = Reconciler::new(&registry, &config)
        .reconcile(&delivery.event, &delivery.labels)
        .await;

    let output = serde_json::to_string_pretty(&reconciliation)
        .context("failed to encode reconciliation")?;
    println!("{output}");
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
