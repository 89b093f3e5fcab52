//! The signup store port and its adapters.
//!
//! Every adapter keeps signups and the aggregate counter in one logical table. The counter lives
//! on a sentinel record whose key can never be a valid normalized email.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::web::types::ValidEmail;

/// Key (and timestamp) of the sentinel record holding `signup_count`. Contains no '@'.
pub const COUNTER_KEY: &str = "#SIGNUP_COUNTER#";

// ###################################
// ->   STRUCTS
// ###################################
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupRecord {
    /// Normalized email, unique.
    pub email: String,
    /// ISO-8601 creation time.
    pub timestamp: String,
    /// Epoch milliseconds of the creation time.
    pub created_at: i64,
}

impl SignupRecord {
    pub fn new(email: &ValidEmail, now: DateTime<Utc>) -> Self {
        Self {
            email: email.as_ref().to_string(),
            timestamp: iso_timestamp(now),
            created_at: now.timestamp_millis(),
        }
    }
}

/// Result of a conditional insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The email was already stored, carries the record that won.
    AlreadyExists(SignupRecord),
}

/// `2024-05-01T12:00:00.123Z`
pub fn iso_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ###################################
// ->   PORT
// ###################################
#[async_trait]
pub trait SignupStore: Send + Sync {
    async fn find_signup(&self, email: &ValidEmail) -> StoreResult<Option<SignupRecord>>;

    /// Writes `record` only if no record with the same email exists yet.
    async fn insert_signup(&self, record: &SignupRecord) -> StoreResult<InsertOutcome>;

    /// Atomically adds 1 to the counter, creating it with 1 if missing. Returns the new value.
    async fn increment_signup_count(&self) -> StoreResult<u64>;

    /// Current counter value, 0 if the counter was never incremented.
    async fn signup_count(&self) -> StoreResult<u64>;
}

// ###################################
// ->   ERROR
// ###################################
pub type StoreResult<T> = core::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to create db pool: {0}")]
    FailToCreatePool(String),
    #[error("signup counter holds an invalid value: {0}")]
    InvalidCount(i64),
    #[error("record for '{0}' vanished after a conflicting insert")]
    ConflictWithoutRecord(String),

    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}
