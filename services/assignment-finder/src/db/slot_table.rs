//! Postgres-backed assignment table.
//!
//! One row per slot:
//!
//! ```sql
//! assignment_number BIGINT PRIMARY KEY
//! public_ip         TEXT NULL
//! updated_at        TIMESTAMPTZ NOT NULL
//! ```
//!
//! Rows imported from upstream may carry `''` or `'null'` in `public_ip`;
//! both are read as free and may be claimed.

use std::fmt;

use async_trait::async_trait;
use slotpool::{
    Endpoint, PutOutcome, SlotNumber, SlotRecord, SlotState, SlotTable, TableError,
};
use sqlx::postgres::PgPool;
use tracing::{debug, info};

use super::DbError;

const MAX_IDENTIFIER_LEN: usize = 63;

/// Validated Postgres table identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName(String);

impl TableName {
    /// Accepts ASCII letters, digits, `_` and `-`, starting with a letter or
    /// `_`, up to 63 bytes. The name is always emitted quoted.
    pub fn parse(name: &str) -> Result<Self, DbError> {
        let invalid = |reason| DbError::InvalidTableName {
            name: name.to_string(),
            reason,
        };

        let Some(first) = name.chars().next() else {
            return Err(invalid("empty"));
        };
        if name.len() > MAX_IDENTIFIER_LEN {
            return Err(invalid("longer than 63 bytes"));
        }
        if !(first.is_ascii_alphabetic() || first == '_') {
            return Err(invalid("must start with a letter or underscore"));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(invalid("only letters, digits, '_' and '-' are allowed"));
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// SQL rendered once per table.
#[derive(Debug, Clone)]
struct Statements {
    create: String,
    select: String,
    claim_free: String,
    replace_held: String,
}

impl Statements {
    fn for_table(table: &TableName) -> Self {
        let t = table.quoted();
        Self {
            create: format!(
                r#"
                CREATE TABLE IF NOT EXISTS {t} (
                    assignment_number BIGINT PRIMARY KEY CHECK (assignment_number > 0),
                    public_ip TEXT,
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
                )
                "#
            ),
            select: format!("SELECT public_ip FROM {t} WHERE assignment_number = $1"),
            // Inserting the row and updating a free row are one statement so
            // concurrent claimers serialize on the primary key.
            claim_free: format!(
                r#"
                INSERT INTO {t} (assignment_number, public_ip, updated_at)
                VALUES ($1, $2, now())
                ON CONFLICT (assignment_number) DO UPDATE
                    SET public_ip = EXCLUDED.public_ip,
                        updated_at = now()
                    WHERE {t}.public_ip IS NULL
                       OR {t}.public_ip IN ('', 'null')
                RETURNING assignment_number
                "#
            ),
            replace_held: format!(
                r#"
                UPDATE {t}
                SET public_ip = $2,
                    updated_at = now()
                WHERE assignment_number = $1
                  AND public_ip = $3
                RETURNING assignment_number
                "#
            ),
        }
    }
}

/// Assignment table stored in Postgres.
#[derive(Clone)]
pub struct PgSlotTable {
    pool: PgPool,
    table: TableName,
    sql: Statements,
}

impl PgSlotTable {
    pub fn new(pool: PgPool, table: TableName) -> Self {
        let sql = Statements::for_table(&table);
        Self { pool, table, sql }
    }

    pub fn table_name(&self) -> &TableName {
        &self.table
    }

    /// Create the table if it does not exist yet.
    pub async fn ensure_table(&self) -> Result<(), DbError> {
        sqlx::query(&self.sql.create)
            .execute(&self.pool)
            .await
            .map_err(DbError::Query)?;
        info!(table = %self.table, "Assignment table ready");
        Ok(())
    }
}

fn slot_key(slot: SlotNumber) -> i64 {
    i64::from(slot.get())
}

fn backend(err: sqlx::Error) -> TableError {
    TableError::backend(DbError::Query(err))
}

#[async_trait]
impl SlotTable for PgSlotTable {
    async fn get(&self, slot: SlotNumber) -> Result<Option<SlotRecord>, TableError> {
        let row = sqlx::query_scalar::<_, Option<String>>(&self.sql.select)
            .bind(slot_key(slot))
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        if let Some(raw) = &row {
            debug!(slot = %slot, public_ip = ?raw, "Read slot");
        }

        Ok(row.map(|raw| SlotRecord::from_raw(slot, raw.as_deref())))
    }

    async fn conditional_put(
        &self,
        slot: SlotNumber,
        endpoint: &Endpoint,
        expected: &SlotState,
    ) -> Result<PutOutcome, TableError> {
        let written = match expected {
            SlotState::Free => sqlx::query_scalar::<_, i64>(&self.sql.claim_free)
                .bind(slot_key(slot))
                .bind(endpoint.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?,
            SlotState::Assigned(holder) => sqlx::query_scalar::<_, i64>(&self.sql.replace_held)
                .bind(slot_key(slot))
                .bind(endpoint.as_str())
                .bind(holder.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?,
        };

        Ok(match written {
            Some(_) => PutOutcome::Claimed,
            None => PutOutcome::ConditionFailed,
        })
    }

    async fn ping(&self) -> Result<(), TableError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}
