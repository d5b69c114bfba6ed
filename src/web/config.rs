//! Configuration for the startuplink server.

use std::str::FromStr;

use clap::Parser;

use crate::dispatcher::{DispatchConfig, DEFAULT_UPDATE_FANOUT};
use crate::logging::DEFAULT_FILTER;
use crate::registry::{RegistryConfig, DEFAULT_CHANNEL_CAPACITY};

pub(crate) const DEFAULT_PORT: u16 = 4000;

/// Engagement feed and live notification server for startup pitches.
///
/// Configuration can be set via CLI arguments or environment variables.
/// CLI arguments take precedence over environment variables.
#[derive(Parser, Debug, Default)]
#[command(name = "startuplink", version, about)]
pub struct Cli {
    /// HTTP bind address [env: STARTUPLINK_BIND, or 0.0.0.0:$PORT] [default: 0.0.0.0:4000]
    #[arg(long, short = 'b')]
    pub bind: Option<String>,

    /// Start with an empty store instead of demo data [env: STARTUPLINK_NO_SEED]
    #[arg(long)]
    pub no_seed: bool,

    /// RNG seed for reproducible demo data [env: STARTUPLINK_SEED]
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of users an update notification reaches [env: STARTUPLINK_UPDATE_FANOUT] [default: 6]
    #[arg(long)]
    pub update_fanout: Option<usize>,

    /// Pushes buffered per live channel [env: STARTUPLINK_CHANNEL_CAPACITY] [default: 64]
    #[arg(long)]
    pub channel_capacity: Option<usize>,

    /// Log filter directives, e.g. `debug` or `startuplink=trace` [env: RUST_LOG] [default: info]
    #[arg(long)]
    pub log: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub seed_demo_data: bool,
    pub seed: Option<u64>,
    pub dispatch: DispatchConfig,
    pub registry: RegistryConfig,
    pub log_filter: String,
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.parse().ok())
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

impl Config {
    pub fn from_cli_and_env(cli: Cli) -> Self {
        let bind_addr = cli
            .bind
            .or_else(|| std::env::var("STARTUPLINK_BIND").ok())
            .unwrap_or_else(|| {
                let port = env_parse::<u16>("PORT").unwrap_or(DEFAULT_PORT);
                format!("0.0.0.0:{port}")
            });

        let update_fanout = cli
            .update_fanout
            .or_else(|| env_parse("STARTUPLINK_UPDATE_FANOUT"))
            .unwrap_or(DEFAULT_UPDATE_FANOUT);

        let channel_capacity = cli
            .channel_capacity
            .or_else(|| env_parse("STARTUPLINK_CHANNEL_CAPACITY"))
            .unwrap_or(DEFAULT_CHANNEL_CAPACITY);

        let log_filter = cli
            .log
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());

        Self {
            bind_addr,
            seed_demo_data: !(cli.no_seed || env_flag("STARTUPLINK_NO_SEED")),
            seed: cli.seed.or_else(|| env_parse("STARTUPLINK_SEED")),
            dispatch: DispatchConfig { update_fanout },
            registry: RegistryConfig { channel_capacity },
            log_filter,
        }
    }
}
