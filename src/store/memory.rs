//! In-memory `SettingsStore` for tests and hosts that don't need durability.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::DatabaseError;
use crate::store::traits::SettingsStore;

/// Settings held in a map keyed by `(user_id, key)`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<(String, String), serde_json::Value>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, to exercise error paths.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Number of stored values across all users.
    pub async fn len(&self) -> usize {
        self.values.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.values.read().await.is_empty()
    }

    fn check_writable(&self, op: &str) -> Result<(), DatabaseError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(DatabaseError::Query(format!("{op}: store is read-only")));
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get_setting(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError> {
        let values = self.values.read().await;
        Ok(values
            .get(&(user_id.to_string(), key.to_string()))
            .cloned())
    }

    async fn set_setting(
        &self,
        user_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError> {
        self.check_writable("set_setting")?;
        self.values
            .write()
            .await
            .insert((user_id.to_string(), key.to_string()), value.clone());
        Ok(())
    }

    async fn delete_setting(&self, user_id: &str, key: &str) -> Result<bool, DatabaseError> {
        self.check_writable("delete_setting")?;
        Ok(self
            .values
            .write()
            .await
            .remove(&(user_id.to_string(), key.to_string()))
            .is_some())
    }
}
