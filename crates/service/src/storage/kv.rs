use async_trait::async_trait;
use serde_json::Value;

use crate::errors::ServiceError;

/// Trait abstraction for the key-value backend holding serialized state.
/// Implementations can be file-backed, in-memory, or remote KV; callers see
/// only whole-value get/put on string keys.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Value stored under `key`, or `None` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<Value>, ServiceError>;
    /// Store `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: Value) -> Result<(), ServiceError>;
}
