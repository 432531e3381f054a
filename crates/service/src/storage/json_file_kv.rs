use std::{collections::HashMap, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;
use tokio::{fs, sync::RwLock};

use crate::errors::ServiceError;
use crate::storage::kv::KvStore;

/// JSON file-backed key-value adapter.
///
/// Persists a `HashMap<String, Value>` to one JSON file and exposes
/// whole-value get/put. Intended for lightweight state where a database is
/// overkill.
#[derive(Clone)]
pub struct JsonFileKv {
    inner: Arc<RwLock<HashMap<String, Value>>>,
    file_path: PathBuf,
}

impl JsonFileKv {
    /// Initialize the adapter from a path. Creates the file with an empty
    /// map if missing; an unreadable map resets to empty.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await.ok();
        }

        let map: HashMap<String, Value> = match fs::read(&file_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
            Err(_) => {
                let empty: HashMap<String, Value> = HashMap::new();
                fs::write(
                    &file_path,
                    serde_json::to_vec(&empty).map_err(|e| ServiceError::Storage(e.to_string()))?,
                )
                .await
                .map_err(|e| ServiceError::Storage(e.to_string()))?;
                empty
            }
        };

        Ok(Arc::new(Self { inner: Arc::new(RwLock::new(map)), file_path }))
    }

}

#[async_trait]
impl KvStore for JsonFileKv {
    async fn get(&self, key: &str) -> Result<Option<Value>, ServiceError> {
        let map = self.inner.read().await;
        Ok(map.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> Result<(), ServiceError> {
        let mut map = self.inner.write().await;
        let mut next = map.clone();
        next.insert(key.to_string(), value);
        // Memory adopts the new map only after the bytes land on disk;
        // a failed write must leave no trace of the operation.
        let data = serde_json::to_vec(&next).map_err(|e| ServiceError::Storage(e.to_string()))?;
        fs::write(&self.file_path, data)
            .await
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        *map = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("json_file_kv_{}.json", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn get_absent_key_is_none() -> Result<(), anyhow::Error> {
        let tmp = temp_path();
        let kv = JsonFileKv::new(&tmp).await?;
        assert!(kv.get("missing").await?.is_none());
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn put_replaces_whole_value_and_persists() -> Result<(), anyhow::Error> {
        let tmp = temp_path();
        let kv = JsonFileKv::new(&tmp).await?;

        kv.put("a", json!([1, 2])).await?;
        kv.put("b", json!({"x": true})).await?;
        assert_eq!(kv.get("a").await?, Some(json!([1, 2])));

        kv.put("a", json!([3])).await?;
        assert_eq!(kv.get("a").await?, Some(json!([3])));

        // reload from disk to ensure persistence
        let reloaded = JsonFileKv::new(&tmp).await?;
        assert_eq!(reloaded.get("a").await?, Some(json!([3])));
        assert_eq!(reloaded.get("b").await?, Some(json!({"x": true})));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn unreadable_file_resets_to_empty() -> Result<(), anyhow::Error> {
        let tmp = temp_path();
        tokio::fs::write(&tmp, b"not json at all").await?;
        let kv = JsonFileKv::new(&tmp).await?;
        assert!(kv.get("anything").await?.is_none());
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn failed_write_leaves_memory_unchanged() -> Result<(), anyhow::Error> {
        let tmp = temp_path();
        let kv = JsonFileKv::new(&tmp).await?;
        kv.put("a", json!([1])).await?;

        // a directory in place of the file makes every write fail
        tokio::fs::remove_file(&tmp).await?;
        tokio::fs::create_dir(&tmp).await?;

        let err = kv.put("b", json!([2])).await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));
        assert_eq!(kv.get("a").await?, Some(json!([1])));
        assert!(kv.get("b").await?.is_none());

        let _ = tokio::fs::remove_dir(&tmp).await;
        Ok(())
    }
}
