//! Process startup: wire the table, credential and notifier into a
//! [`Finder`].
//!
//! Everything here runs once, before the first invocation is accepted.

use std::sync::Arc;

use anyhow::{Context, Result};
use slotpool::{Allocator, MemorySlotTable, Reporter, SlotTable};
use tracing::{info, warn};

use crate::config::{Config, NotifierKind, StoreKind};
use crate::db::{Database, PgSlotTable};
use crate::invoke::Finder;
use crate::notify::{LogNotifier, Notifier, SlackNotifier};
use crate::secrets::{load_bearer_token, LocalSecretProvider};

/// Connect to Postgres and return the configured assignment table.
pub async fn connect_pg_table(config: &Config) -> Result<PgSlotTable> {
    let db = Database::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    Ok(db.slot_table(config.table_name.clone()))
}

/// Open the configured assignment table backend.
pub async fn open_table(config: &Config) -> Result<Arc<dyn SlotTable>> {
    match config.store {
        StoreKind::Memory => {
            warn!("Using in-memory assignment table; assignments are lost on exit");
            Ok(Arc::new(MemorySlotTable::new()))
        }
        StoreKind::Postgres => {
            let table = connect_pg_table(config).await?;
            if config.create_table {
                table
                    .ensure_table()
                    .await
                    .context("Failed to create assignment table")?;
            }
            info!(table = %table.table_name(), "Using Postgres assignment table");
            Ok(Arc::new(table))
        }
    }
}

/// Build the notifier. A missing credential degrades Slack delivery to
/// log-and-skip; any other credential failure aborts startup.
pub async fn open_notifier(config: &Config) -> Result<Arc<dyn Notifier>> {
    match config.notifier {
        NotifierKind::Log => Ok(Arc::new(LogNotifier)),
        NotifierKind::Slack => {
            let provider = LocalSecretProvider::new(config.secrets_dir.clone());
            let token =
                load_bearer_token(&provider, &config.secret_name, &config.secret_region)
                    .await
                    .context("Failed to load notifier credential")?;
            let notifier = SlackNotifier::new(config.slack.clone(), &token)
                .context("Failed to build Slack client")?;
            Ok(Arc::new(notifier))
        }
    }
}

pub async fn build_finder(config: &Config) -> Result<Finder> {
    let table = open_table(config).await?;
    let notifier = open_notifier(config).await?;
    let allocator = Allocator::new(table, config.pool_size)?;
    let reporter = Reporter::new(config.host_template.clone(), config.application_port);

    info!(
        pool_size = config.pool_size,
        application_port = config.application_port,
        "Assignment finder ready"
    );

    Ok(Finder::new(allocator, reporter, notifier))
}
