use tracing::error;

use common::types::GroupUpsert;

use crate::cache::GroupCache;
use crate::errors::ClientError;
use crate::http::GroupsApi;

/// Consumer-side handle on the group collection. Remote operations go
/// through the HTTP API and every success replaces the local mirror with
/// the server's authoritative list; failures leave the mirror untouched.
pub struct GroupClient {
    api: GroupsApi,
    cache: GroupCache,
}

impl GroupClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            api: GroupsApi::new(base_url),
            cache: GroupCache::new(),
        }
    }

    pub fn cache(&self) -> &GroupCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut GroupCache {
        &mut self.cache
    }

    /// Refresh the mirror from the server.
    pub async fn fetch_groups(&mut self) -> Result<(), ClientError> {
        self.cache.set_loading(true);
        let result = self.api.fetch_groups().await;
        self.cache.set_loading(false);
        match result {
            Ok(groups) => {
                self.cache.set_groups(groups);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to fetch node groups");
                Err(e)
            }
        }
    }

    /// Create or update one group, then adopt the returned list.
    pub async fn save_group(&mut self, group: &GroupUpsert) -> Result<(), ClientError> {
        match self.api.save_group(group).await {
            Ok(groups) => {
                self.cache.set_groups(groups);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to save node group");
                Err(e)
            }
        }
    }

    /// Delete one group by id, then adopt the returned list.
    pub async fn delete_group(&mut self, id: &str) -> Result<(), ClientError> {
        match self.api.delete_group(id).await {
            Ok(groups) => {
                self.cache.set_groups(groups);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to delete node group");
                Err(e)
            }
        }
    }
}
