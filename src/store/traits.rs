//! `SettingsStore` trait: durable string-keyed values for tutorial progress.

use async_trait::async_trait;

use crate::error::DatabaseError;

/// Backend-agnostic key-value storage, scoped per user.
///
/// Values are JSON so hosts can store flags and small records alike; the
/// tutorial itself only writes booleans and persona tags.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read a value. `None` when the key was never written or was deleted.
    async fn get_setting(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError>;

    /// Insert or overwrite a value.
    async fn set_setting(
        &self,
        user_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError>;

    /// Delete a value. Returns whether anything was removed.
    async fn delete_setting(&self, user_id: &str, key: &str) -> Result<bool, DatabaseError>;

    /// Read a boolean flag; missing or non-boolean values read as `false`.
    async fn get_flag(&self, user_id: &str, key: &str) -> Result<bool, DatabaseError> {
        Ok(self
            .get_setting(user_id, key)
            .await?
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    /// Write a boolean flag.
    async fn set_flag(&self, user_id: &str, key: &str, value: bool) -> Result<(), DatabaseError> {
        self.set_setting(user_id, key, &serde_json::Value::Bool(value))
            .await
    }
}
