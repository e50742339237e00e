//! Finder configuration (env-driven, loaded once at startup).

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use slotpool::DEFAULT_HOST_TEMPLATE;

use crate::db::{DbConfig, TableName};
use crate::notify::SlackConfig;

/// Where slot assignments are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    /// Process-local table; state is lost on exit.
    Memory,
}

/// Where outcome notifications go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierKind {
    Slack,
    /// Emit notifications as log lines only.
    Log,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Port rendered into the success notification.
    pub application_port: u16,

    /// Pool size N; slots are `1..=N`.
    pub pool_size: u32,

    /// Backing table identifier.
    pub table_name: TableName,

    /// Slot hostname pattern, `{slot}` is substituted.
    pub host_template: String,

    pub store: StoreKind,
    pub database: DbConfig,

    /// Create the assignment table on startup if missing.
    pub create_table: bool,

    pub notifier: NotifierKind,
    pub slack: SlackConfig,

    /// Secret holding the notifier bearer token.
    pub secret_name: String,
    pub secret_region: String,
    pub secrets_dir: PathBuf,

    /// HTTP invocation listener.
    pub listen_addr: SocketAddr,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let application_port: u16 = lookup("APPLICATION_PORT")
            .context("Missing APPLICATION_PORT.")?
            .parse()
            .context("APPLICATION_PORT must be a port number.")?;

        let pool_size: u32 = lookup("SU_UNIT_COUNT")
            .context("Missing SU_UNIT_COUNT.")?
            .parse()
            .context("SU_UNIT_COUNT must be a positive integer.")?;
        if pool_size == 0 {
            bail!("SU_UNIT_COUNT must be at least 1.");
        }

        let table_name = lookup("DDB_SU_ASSIGNMENTS_TABLE_NAME")
            .context("Missing DDB_SU_ASSIGNMENTS_TABLE_NAME.")?;
        let table_name = TableName::parse(&table_name)
            .context("DDB_SU_ASSIGNMENTS_TABLE_NAME is not a usable table name.")?;

        let host_template =
            lookup("SLOT_HOST_TEMPLATE").unwrap_or_else(|| DEFAULT_HOST_TEMPLATE.to_string());

        let store = match lookup("ASSIGNMENT_STORE").as_deref() {
            None | Some("postgres") => StoreKind::Postgres,
            Some("memory") => StoreKind::Memory,
            Some(other) => bail!("ASSIGNMENT_STORE must be 'postgres' or 'memory', got '{other}'."),
        };

        let create_table = lookup("ASSIGNMENT_CREATE_TABLE")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        let notifier = match lookup("NOTIFIER").as_deref() {
            None | Some("slack") => NotifierKind::Slack,
            Some("log") => NotifierKind::Log,
            Some(other) => bail!("NOTIFIER must be 'slack' or 'log', got '{other}'."),
        };

        let defaults = SlackConfig::default();
        let slack = SlackConfig {
            api_url: lookup("SLACK_API_URL").unwrap_or(defaults.api_url),
            channel: lookup("SLACK_CHANNEL").unwrap_or(defaults.channel),
            username: lookup("SLACK_USERNAME").unwrap_or(defaults.username),
            icon_emoji: lookup("SLACK_ICON_EMOJI").unwrap_or(defaults.icon_emoji),
        };

        let secret_name = lookup("NOTIFIER_SECRET_NAME")
            .unwrap_or_else(|| "forward-research-slackbot-oauth-token".to_string());
        let secret_region =
            lookup("NOTIFIER_SECRET_REGION").unwrap_or_else(|| "us-west-1".to_string());
        let secrets_dir = lookup("SECRETS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/run/secrets"));

        let listen_addr = lookup("LISTEN_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8080".to_string())
            .parse()
            .context("LISTEN_ADDR must be a socket address.")?;

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            application_port,
            pool_size,
            table_name,
            host_template,
            store,
            database: DbConfig::from_lookup(&lookup),
            create_table,
            notifier,
            slack,
            secret_name,
            secret_region,
            secrets_dir,
            listen_addr,
            log_level,
        })
    }
}
