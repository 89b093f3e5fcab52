use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use super::{InsertOutcome, SignupRecord, SignupStore, StoreError, StoreResult, COUNTER_KEY};
use crate::{config::DbConfig, web::types::ValidEmail};

/// A `SignupStore` backed by a single PostgreSQL table.
///
/// The table is keyed by `(email, timestamp)` with `email` unique on its own, so the sentinel
/// counter row and the signups share it without colliding.
#[derive(Clone, Debug)]
pub struct PgStore {
    db: PgPool,
    queries: Queries,
}

impl PgStore {
    pub async fn init(db_config: &DbConfig, table: &str) -> StoreResult<Self> {
        info!("{:<20} - Initializing the DB pool", "init_db");
        let max_cons = if cfg!(test) { 1 } else { 5 };

        let db = PgPoolOptions::new()
            .max_connections(max_cons)
            .acquire_timeout(Duration::from_millis(500))
            .connect_with(db_config.connection_options())
            .await
            .map_err(|ex| StoreError::FailToCreatePool(ex.to_string()))?;

        let store = Self::from_pool(db, table);
        store.ensure_table().await?;

        Ok(store)
    }

    /// Wraps an existing pool. `table` has to be a validated SQL identifier.
    pub fn from_pool(db: PgPool, table: &str) -> Self {
        Self {
            db,
            queries: Queries::new(table),
        }
    }

    async fn ensure_table(&self) -> StoreResult<()> {
        sqlx::query(&self.queries.create_table)
            .execute(&self.db)
            .await?;
        info!("{:<20} - Table '{}' is ready", "init_db", self.queries.table);
        Ok(())
    }
}

#[async_trait]
impl SignupStore for PgStore {
    async fn find_signup(&self, email: &ValidEmail) -> StoreResult<Option<SignupRecord>> {
        let row: Option<(String, String, i64)> = sqlx::query_as(&self.queries.find_signup)
            .bind(email.as_ref())
            .fetch_optional(&self.db)
            .await?;

        Ok(row.map(|(email, timestamp, created_at)| SignupRecord {
            email,
            timestamp,
            created_at,
        }))
    }

    async fn insert_signup(&self, record: &SignupRecord) -> StoreResult<InsertOutcome> {
        let query_result = sqlx::query(&self.queries.insert_signup)
            .bind(&record.email)
            .bind(&record.timestamp)
            .bind(record.created_at)
            .execute(&self.db)
            .await;

        if !was_already_signed_up(query_result)? {
            return Ok(InsertOutcome::Inserted);
        }

        // Lost the race against a concurrent submission, report the record that won.
        let existing: Option<(String, String, i64)> = sqlx::query_as(&self.queries.find_signup)
            .bind(&record.email)
            .fetch_optional(&self.db)
            .await?;
        let (email, timestamp, created_at) =
            existing.ok_or_else(|| StoreError::ConflictWithoutRecord(record.email.clone()))?;

        Ok(InsertOutcome::AlreadyExists(SignupRecord {
            email,
            timestamp,
            created_at,
        }))
    }

    async fn increment_signup_count(&self) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar(&self.queries.increment_count)
            .bind(COUNTER_KEY)
            .bind(Utc::now().timestamp_millis())
            .fetch_one(&self.db)
            .await?;

        u64::try_from(count).map_err(|_| StoreError::InvalidCount(count))
    }

    async fn signup_count(&self) -> StoreResult<u64> {
        let count: Option<Option<i64>> = sqlx::query_scalar(&self.queries.signup_count)
            .bind(COUNTER_KEY)
            .fetch_optional(&self.db)
            .await?;
        let count = count.flatten().unwrap_or(0);

        u64::try_from(count).map_err(|_| StoreError::InvalidCount(count))
    }
}

// ###################################
// ->   HELPERS
// ###################################

/// SQL text for one table name, rendered once at startup.
#[derive(Clone, Debug)]
struct Queries {
    table: String,
    create_table: String,
    find_signup: String,
    insert_signup: String,
    increment_count: String,
    signup_count: String,
}

impl Queries {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            create_table: format!(
                r#"CREATE TABLE IF NOT EXISTS {table} (
                    email TEXT NOT NULL UNIQUE,
                    timestamp TEXT NOT NULL,
                    created_at BIGINT NOT NULL,
                    signup_count BIGINT,
                    PRIMARY KEY (email, timestamp)
                )"#
            ),
            find_signup: format!(
                r#"SELECT email, timestamp, created_at FROM {table}
                WHERE email = $1"#
            ),
            insert_signup: format!(
                r#"INSERT INTO {table} (email, timestamp, created_at)
                VALUES ($1, $2, $3)"#
            ),
            increment_count: format!(
                r#"INSERT INTO {table} (email, timestamp, created_at, signup_count)
                VALUES ($1, $1, $2, 1)
                ON CONFLICT (email)
                DO UPDATE SET signup_count = COALESCE({table}.signup_count, 0) + 1
                RETURNING signup_count"#
            ),
            signup_count: format!(
                r#"SELECT signup_count FROM {table}
                WHERE email = $1"#
            ),
        }
    }
}

/// Checks whether the insert failed because the email was already stored.
/// Propagates every other error. Returns `Ok(true)` on a unique violation and `Ok(false)`
/// when the row was written.
fn was_already_signed_up(
    query_result: std::result::Result<sqlx::postgres::PgQueryResult, sqlx::Error>,
) -> StoreResult<bool> {
    match query_result {
        Ok(_) => Ok(false),
        Err(sqlx::Error::Database(er)) if er.is_unique_violation() => Ok(true),
        Err(error) => Err(error.into()),
    }
}
