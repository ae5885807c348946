// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

use crate::transport::console::ConsoleArgs;

/// Multi-channel USSD service gateway.
#[derive(Debug, Parser)]
#[command(name = "ussdgw", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Serve USSD traffic over NATS and/or HTTP.
    Serve(ServeArgs),
    /// Interactive USSD simulator on the terminal.
    Console(ConsoleCmd),
    /// Run the session store HTTP service.
    Sessiond(SessiondArgs),
}

#[derive(Debug, clap::Args)]
pub struct LogArgs {
    /// Log format (json or text).
    #[arg(long, env = "USSD_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "USSD_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, clap::Args)]
pub struct ServeArgs {
    /// NATS server URL; enables the NATS transport.
    #[arg(long, env = "USSD_NATS_URL")]
    pub nats_url: Option<String>,

    /// Request subject domain; requests arrive on `<domain>.*`.
    #[arg(long, env = "USSD_NATS_DOMAIN", default_value = "ussd")]
    pub domain: String,

    /// Subscribe without a queue group (every instance sees every request).
    #[arg(long, env = "USSD_NATS_BROADCAST")]
    pub broadcast: bool,

    /// NATS auth token.
    #[arg(long, env = "USSD_NATS_TOKEN")]
    pub nats_token: Option<String>,

    /// Outbound service call TTL in milliseconds.
    #[arg(long, env = "USSD_REQUEST_TTL_MS", default_value_t = 10_000)]
    pub request_ttl_ms: u64,

    /// Host to bind the HTTP transport on.
    #[arg(long, env = "USSD_HTTP_HOST", default_value = "0.0.0.0")]
    pub http_host: String,

    /// HTTP port; enables the HTTP transport.
    #[arg(long, env = "USSD_HTTP_PORT")]
    pub http_port: Option<u16>,

    /// Session store service URL; in-memory store when unset.
    #[arg(long, env = "USSD_SESSION_STORE_URL")]
    pub session_store_url: Option<String>,

    #[command(flatten)]
    pub log: LogArgs,
}

impl ServeArgs {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.nats_url.is_none() && self.http_port.is_none() {
            anyhow::bail!("either --nats-url or --http-port must be specified");
        }
        if self.nats_url.is_none() && self.session_store_url.is_none() {
            // Single-instance HTTP with in-memory sessions is fine; a
            // remote store only matters across instances.
            tracing::debug!("serving with in-memory sessions");
        }
        if self.log.log_format != "json" && self.log.log_format != "text" {
            anyhow::bail!("--log-format must be json or text");
        }
        Ok(())
    }
}

#[derive(Debug, clap::Args)]
pub struct ConsoleCmd {
    #[command(flatten)]
    pub console: ConsoleArgs,

    /// NATS server URL for outbound service calls (optional).
    #[arg(long, env = "USSD_NATS_URL")]
    pub nats_url: Option<String>,

    /// Request subject domain for outbound calls.
    #[arg(long, env = "USSD_NATS_DOMAIN", default_value = "ussd")]
    pub domain: String,

    /// Session store service URL; in-memory store when unset.
    #[arg(long, env = "USSD_SESSION_STORE_URL")]
    pub session_store_url: Option<String>,

    #[command(flatten)]
    pub log: LogArgs,
}

#[derive(Debug, clap::Args)]
pub struct SessiondArgs {
    /// Host to bind on.
    #[arg(long, env = "USSD_SESSIOND_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, env = "USSD_SESSIOND_PORT", default_value_t = 8100)]
    pub port: u16,

    #[command(flatten)]
    pub log: LogArgs,
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
