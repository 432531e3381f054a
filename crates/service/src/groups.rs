use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use common::types::{GroupRecord, GroupUpsert};

use crate::errors::ServiceError;
use crate::storage::kv::KvStore;

/// Backend key holding the serialized group array. The whole collection is
/// always the unit of read and write; there are no per-record keys.
pub const NODE_GROUPS_KEY: &str = "node_groups";

/// Whether an upsert created a new group or rewrote an existing one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Store owning the canonical group list in the key-value backend.
///
/// Every mutation runs one read-whole/validate/write-whole cycle under the
/// write lock, so concurrent upserts and deletes queue instead of clobbering
/// each other's base state. Reads take no lock; they see one consistent
/// whole value.
pub struct NodeGroupStore<S: KvStore> {
    kv: Arc<S>,
    write_lock: Mutex<()>,
}

impl<S: KvStore> NodeGroupStore<S> {
    pub fn new(kv: Arc<S>) -> Self {
        Self { kv, write_lock: Mutex::new(()) }
    }

    /// Current collection; an absent key reads as the empty list.
    pub async fn list(&self) -> Result<Vec<GroupRecord>, ServiceError> {
        self.load().await
    }

    /// Create (no `id` in the input) or update (matching `id`) one group.
    /// Returns the outcome together with the full authoritative list.
    pub async fn upsert(
        &self,
        input: GroupUpsert,
    ) -> Result<(UpsertOutcome, Vec<GroupRecord>), ServiceError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::Validation("name required".into()));
        }
        if input.node_ids.is_empty() {
            return Err(ServiceError::Validation("at least one node required".into()));
        }

        let _guard = self.write_lock.lock().await;
        let mut groups = self.load().await?;
        let now = Utc::now();
        let description = input.description.trim().to_string();
        let enabled = input.enabled.unwrap_or(true);

        let outcome = match input.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => {
                let index = groups
                    .iter()
                    .position(|g| g.id == id)
                    .ok_or_else(|| ServiceError::not_found("group"))?;
                // Names must stay unique; the record being updated is excluded
                // by position, not by name, so renaming to itself is fine.
                if groups.iter().enumerate().any(|(i, g)| i != index && g.name.trim() == name) {
                    return Err(ServiceError::Validation("duplicate name".into()));
                }
                let group = &mut groups[index];
                group.name = name;
                group.description = description;
                group.node_ids = input.node_ids;
                group.enabled = enabled;
                group.updated_at = now;
                UpsertOutcome::Updated
            }
            None => {
                if groups.iter().any(|g| g.name.trim() == name) {
                    return Err(ServiceError::Validation("duplicate name".into()));
                }
                groups.push(GroupRecord {
                    id: generate_group_id(),
                    name,
                    description,
                    node_ids: input.node_ids,
                    enabled,
                    created_at: now,
                    updated_at: now,
                });
                UpsertOutcome::Created
            }
        };

        self.persist(&groups).await?;
        info!(outcome = ?outcome, count = groups.len(), "node group upsert persisted");
        Ok((outcome, groups))
    }

    /// Remove the group with `id`; returns the remaining collection.
    pub async fn delete(&self, id: &str) -> Result<Vec<GroupRecord>, ServiceError> {
        if id.is_empty() {
            return Err(ServiceError::Validation("id required".into()));
        }

        let _guard = self.write_lock.lock().await;
        let mut groups = self.load().await?;
        let index = groups
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| ServiceError::not_found("group"))?;
        groups.remove(index);
        self.persist(&groups).await?;
        info!(%id, count = groups.len(), "node group deleted");
        Ok(groups)
    }

    async fn load(&self) -> Result<Vec<GroupRecord>, ServiceError> {
        match self.kv.get(NODE_GROUPS_KEY).await? {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| ServiceError::Storage(format!("corrupt group list: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    async fn persist(&self, groups: &[GroupRecord]) -> Result<(), ServiceError> {
        let value =
            serde_json::to_value(groups).map_err(|e| ServiceError::Storage(e.to_string()))?;
        self.kv.put(NODE_GROUPS_KEY, value).await
    }
}

/// Ids keep a visible `group-` prefix with a UUID suffix, unique across
/// concurrent callers without collision retries.
fn generate_group_id() -> String {
    format!("group-{}", Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::storage::json_file_kv::JsonFileKv;

    async fn temp_store() -> (NodeGroupStore<JsonFileKv>, PathBuf) {
        let path = std::env::temp_dir().join(format!("node_groups_{}.json", Uuid::new_v4()));
        let kv = JsonFileKv::new(&path).await.expect("kv init");
        (NodeGroupStore::new(kv), path)
    }

    fn group(name: &str, nodes: &[&str]) -> GroupUpsert {
        GroupUpsert {
            id: None,
            name: name.into(),
            description: String::new(),
            node_ids: nodes.iter().map(|s| s.to_string()).collect(),
            enabled: None,
        }
    }

    #[tokio::test]
    async fn list_on_fresh_store_is_empty() -> Result<(), anyhow::Error> {
        let (store, path) = temp_store().await;
        assert!(store.list().await?.is_empty());
        assert!(store.list().await?.is_empty());
        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn create_assigns_id_and_stamps_timestamps() -> Result<(), anyhow::Error> {
        let (store, path) = temp_store().await;

        let mut input = group("  EU  ", &["n1", "n2"]);
        input.description = " primary region ".into();
        let (outcome, groups) = store.upsert(input).await?;

        assert_eq!(outcome, UpsertOutcome::Created);
        assert_eq!(groups.len(), 1);
        let rec = &groups[0];
        assert!(rec.id.starts_with("group-"));
        assert_eq!(rec.name, "EU");
        assert_eq!(rec.description, "primary region");
        assert_eq!(rec.node_ids, vec!["n1".to_string(), "n2".to_string()]);
        assert!(rec.enabled);
        assert_eq!(rec.created_at, rec.updated_at);

        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn missing_name_or_nodes_never_mutates() -> Result<(), anyhow::Error> {
        let (store, path) = temp_store().await;

        let err = store.upsert(group("   ", &["n1"])).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref m) if m == "name required"));

        let err = store.upsert(group("EU", &[])).await.unwrap_err();
        assert!(
            matches!(err, ServiceError::Validation(ref m) if m == "at least one node required")
        );

        assert!(store.list().await?.is_empty());
        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_name_rejected_on_create() -> Result<(), anyhow::Error> {
        let (store, path) = temp_store().await;
        store.upsert(group("EU", &["n1", "n2"])).await?;

        // exact duplicate and trimmed duplicate both collide
        for name in ["EU", "  EU  "] {
            let err = store.upsert(group(name, &["n3"])).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation(ref m) if m == "duplicate name"));
        }
        // case differs, so it is a distinct name
        store.upsert(group("eu", &["n3"])).await?;

        assert_eq!(store.list().await?.len(), 2);
        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn update_preserves_identity_and_position() -> Result<(), anyhow::Error> {
        let (store, path) = temp_store().await;
        store.upsert(group("A", &["n1"])).await?;
        let (_, groups) = store.upsert(group("B", &["n2"])).await?;
        store.upsert(group("C", &["n3"])).await?;
        let original = groups[1].clone();

        tokio::time::sleep(Duration::from_millis(5)).await;

        let (outcome, groups) = store
            .upsert(GroupUpsert {
                id: Some(original.id.clone()),
                name: "B-West".into(),
                description: "rotated".into(),
                node_ids: vec!["n9".into()],
                enabled: Some(false),
            })
            .await?;

        assert_eq!(outcome, UpsertOutcome::Updated);
        assert_eq!(groups.len(), 3);
        let rec = &groups[1];
        assert_eq!(rec.id, original.id);
        assert_eq!(rec.created_at, original.created_at);
        assert!(rec.updated_at > original.updated_at);
        assert_eq!(rec.name, "B-West");
        assert_eq!(rec.node_ids, vec!["n9".to_string()]);
        assert!(!rec.enabled);
        assert_eq!(groups[0].name, "A");
        assert_eq!(groups[2].name, "C");

        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() -> Result<(), anyhow::Error> {
        let (store, path) = temp_store().await;
        store.upsert(group("EU", &["n1"])).await?;

        let mut input = group("US", &["n2"]);
        input.id = Some("group-missing".into());
        let err = store.upsert(input).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let groups = store.list().await?;
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "EU");
        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn rename_collides_only_with_other_groups() -> Result<(), anyhow::Error> {
        let (store, path) = temp_store().await;
        store.upsert(group("EU", &["n1"])).await?;
        let (_, groups) = store.upsert(group("US", &["n2"])).await?;
        let us_id = groups[1].id.clone();

        let mut stolen = group("EU", &["n2"]);
        stolen.id = Some(us_id.clone());
        let err = store.upsert(stolen).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref m) if m == "duplicate name"));

        // keeping its own name (modulo surrounding whitespace) is not a clash
        let mut own = group("  US  ", &["n2", "n4"]);
        own.id = Some(us_id);
        store.upsert(own).await?;

        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn delete_removes_exactly_one_preserving_order() -> Result<(), anyhow::Error> {
        let (store, path) = temp_store().await;
        store.upsert(group("A", &["n1"])).await?;
        let (_, groups) = store.upsert(group("B", &["n2"])).await?;
        store.upsert(group("C", &["n3"])).await?;
        let b_id = groups[1].id.clone();

        let remaining = store.delete(&b_id).await?;
        let names: Vec<&str> = remaining.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);

        let err = store.delete(&b_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert_eq!(store.list().await?.len(), 2);

        let err = store.delete("").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref m) if m == "id required"));

        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn collection_survives_reopen() -> Result<(), anyhow::Error> {
        let path = std::env::temp_dir().join(format!("node_groups_{}.json", Uuid::new_v4()));
        {
            let kv = JsonFileKv::new(&path).await?;
            let store = NodeGroupStore::new(kv);
            store.upsert(group("EU", &["n1"])).await?;
            store.upsert(group("US", &["n2"])).await?;
        }

        let kv = JsonFileKv::new(&path).await?;
        let store = NodeGroupStore::new(kv);
        let groups = store.list().await?;
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "EU");
        assert_eq!(groups[1].name, "US");

        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_upserts_all_land() -> Result<(), anyhow::Error> {
        let path = std::env::temp_dir().join(format!("node_groups_{}.json", Uuid::new_v4()));
        let kv = JsonFileKv::new(&path).await?;
        let store = Arc::new(NodeGroupStore::new(kv));

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.upsert(group(&format!("region-{i}"), &["n1"])).await
            }));
        }
        for handle in handles {
            handle.await.expect("join")?;
        }

        let groups = store.list().await?;
        assert_eq!(groups.len(), 8);
        let ids: std::collections::HashSet<_> = groups.iter().map(|g| g.id.clone()).collect();
        assert_eq!(ids.len(), 8);

        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    #[tokio::test]
    async fn rejected_persist_leaves_collection_unchanged() -> Result<(), anyhow::Error> {
        let path = std::env::temp_dir().join(format!("node_groups_{}.json", Uuid::new_v4()));
        let kv = JsonFileKv::new(&path).await?;
        let store = NodeGroupStore::new(kv);
        store.upsert(group("EU", &["n1"])).await?;

        // a directory in place of the file makes the persist step fail
        tokio::fs::remove_file(&path).await?;
        tokio::fs::create_dir(&path).await?;

        let err = store.upsert(group("US", &["n2"])).await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));
        let groups = store.list().await?;
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["EU"]);

        // once the path works again the same submission goes through,
        // not blocked by any leftover of the failed one
        tokio::fs::remove_dir(&path).await?;
        store.upsert(group("US", &["n2"])).await?;
        assert_eq!(store.list().await?.len(), 2);

        let _ = tokio::fs::remove_file(&path).await;
        Ok(())
    }

    struct FailingKv;

    #[async_trait]
    impl KvStore for FailingKv {
        async fn get(&self, _key: &str) -> Result<Option<Value>, ServiceError> {
            Err(ServiceError::Storage("backend offline".into()))
        }

        async fn put(&self, _key: &str, _value: Value) -> Result<(), ServiceError> {
            Err(ServiceError::Storage("backend offline".into()))
        }
    }

    #[tokio::test]
    async fn backend_failure_surfaces_as_storage_error() {
        let store = NodeGroupStore::new(Arc::new(FailingKv));

        let err = store.list().await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));

        let err = store.upsert(group("EU", &["n1"])).await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));
    }
}
