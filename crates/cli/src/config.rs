//! Command-line and environment configuration.
//!
//! Every setting can be passed as a flag or through the environment variable
//! named next to it. Configuration is read once at startup.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use twin::ReconcilerConfig;

#[derive(Debug, Parser)]
#[command(
    name = "twin-reconciler",
    version,
    about = "Keeps emulated twin devices in step with their originals"
)]
pub struct Cli {
    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormat,

    /// OTLP collector endpoint; spans are exported when set.
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT", global = true)]
    pub otlp_endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the webhook endpoint.
    Serve(ServeArgs),
    /// Run one delivery against an in-memory registry and print the result.
    Simulate(SimulateArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: SocketAddr,

    /// Registry API base (device listing, label updates).
    #[arg(long, env = "API_URL_BASE")]
    pub api_url_base: String,

    /// Registry emulator API base (create, delete, publish).
    #[arg(long, env = "EMU_URL_BASE")]
    pub emu_url_base: String,

    /// Service-account token endpoint.
    #[arg(long, env = "AUTH_ENDPOINT")]
    pub auth_endpoint: String,

    /// Delivery signature secret. Without it every delivery is rejected.
    #[arg(long, env = "DT_SIGNATURE_SECRET", hide_env_values = true)]
    pub signature_secret: Option<String>,

    #[arg(long, env = "SERVICE_ACCOUNT_EMAIL")]
    pub service_account_email: String,

    #[arg(long, env = "SERVICE_ACCOUNT_KEY_ID")]
    pub service_account_key_id: String,

    #[arg(long, env = "SERVICE_ACCOUNT_SECRET", hide_env_values = true)]
    pub service_account_secret: String,

    /// Timeout applied to every outbound HTTP request.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    #[command(flatten)]
    pub model: ModelArgs,
}

#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Delivery JSON (`{"event": ..., "labels": ...}`).
    #[arg(long)]
    pub payload: PathBuf,

    /// Device listing in the registry's format (`{"devices": [...]}`).
    #[arg(long)]
    pub roster: PathBuf,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// Overrides for [`ReconcilerConfig`]; unset fields keep their defaults.
#[derive(Debug, Default, Args)]
pub struct ModelArgs {
    #[arg(long, env = "EMULATION_LABEL")]
    pub emulation_label: Option<String>,

    #[arg(long, env = "ORIGINAL_DEVICE_LABEL")]
    pub original_device_label: Option<String>,

    #[arg(long, env = "NAME_LABEL")]
    pub name_label: Option<String>,

    #[arg(long, env = "TWIN_ID_PREFIX")]
    pub twin_id_prefix: Option<String>,

    #[arg(long, env = "TWIN_NAME_SUFFIX")]
    pub twin_name_suffix: Option<String>,

    #[arg(long, env = "TWIN_DEVICE_TYPE")]
    pub twin_device_type: Option<String>,
}

impl ModelArgs {
    pub fn into_config(self) -> ReconcilerConfig {
        let defaults = ReconcilerConfig::default();
        ReconcilerConfig {
            emulation_label: self.emulation_label.unwrap_or(defaults.emulation_label),
            original_device_label: self
                .original_device_label
                .unwrap_or(defaults.original_device_label),
            name_label: self.name_label.unwrap_or(defaults.name_label),
            twin_id_prefix: self.twin_id_prefix.unwrap_or(defaults.twin_id_prefix),
            twin_name_suffix: self.twin_name_suffix.unwrap_or(defaults.twin_name_suffix),
            twin_device_type: self.twin_device_type.unwrap_or(defaults.twin_device_type),
        }
    }
}
