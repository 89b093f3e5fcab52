use std::{
    collections::{hash_map::Entry, HashMap},
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{InsertOutcome, SignupRecord, SignupStore, StoreResult};
use crate::web::types::ValidEmail;

/// An in-process `SignupStore` for local runs and tests.
///
/// Counts every call made through the port so callers can check that a request never touched
/// the store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: Mutex<MemoryTable>,
    calls: AtomicUsize,
}

#[derive(Debug, Default)]
struct MemoryTable {
    signups: HashMap<String, SignupRecord>,
    signup_count: Option<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose sentinel counter already holds `signup_count`.
    pub fn with_signup_count(signup_count: u64) -> Self {
        Self {
            table: Mutex::new(MemoryTable {
                signups: HashMap::new(),
                signup_count: Some(signup_count),
            }),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of port calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Snapshot of the stored signups, ordered by `created_at`.
    pub async fn signups(&self) -> Vec<SignupRecord> {
        let table = self.table.lock().await;
        let mut signups: Vec<_> = table.signups.values().cloned().collect();
        signups.sort_by_key(|record| record.created_at);
        signups
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SignupStore for MemoryStore {
    async fn find_signup(&self, email: &ValidEmail) -> StoreResult<Option<SignupRecord>> {
        self.record_call();
        let table = self.table.lock().await;
        Ok(table.signups.get(email.as_ref()).cloned())
    }

    async fn insert_signup(&self, record: &SignupRecord) -> StoreResult<InsertOutcome> {
        self.record_call();
        let mut table = self.table.lock().await;
        match table.signups.entry(record.email.clone()) {
            Entry::Occupied(existing) => Ok(InsertOutcome::AlreadyExists(existing.get().clone())),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    async fn increment_signup_count(&self) -> StoreResult<u64> {
        self.record_call();
        let mut table = self.table.lock().await;
        let count = table.signup_count.map_or(1, |count| count + 1);
        table.signup_count = Some(count);
        Ok(count)
    }

    async fn signup_count(&self) -> StoreResult<u64> {
        self.record_call();
        let table = self.table.lock().await;
        Ok(table.signup_count.unwrap_or(0))
    }
}
