use common::types::{ApiResponse, GroupRecord, GroupUpsert};

use crate::errors::ClientError;

/// Thin typed wrapper over the node-group HTTP endpoint.
#[derive(Clone)]
pub struct GroupsApi {
    base_url: String,
    http: reqwest::Client,
}

impl GroupsApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Build on a caller-supplied client, e.g. one with custom timeouts.
    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/node-groups", self.base_url)
    }

    /// Fetch the full authoritative collection.
    pub async fn fetch_groups(&self) -> Result<Vec<GroupRecord>, ClientError> {
        let response = self
            .http
            .get(self.endpoint())
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        parse_groups(response).await
    }

    /// Create or update one group; the server answers with the whole list.
    pub async fn save_group(&self, group: &GroupUpsert) -> Result<Vec<GroupRecord>, ClientError> {
        let response = self
            .http
            .post(self.endpoint())
            .json(group)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        parse_groups(response).await
    }

    /// Delete by id; the server answers with the remaining list.
    pub async fn delete_group(&self, id: &str) -> Result<Vec<GroupRecord>, ClientError> {
        let response = self
            .http
            .delete(self.endpoint())
            .query(&[("id", id)])
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        parse_groups(response).await
    }
}

/// A non-2xx status is an error before the body is read; a 2xx body must
/// still carry `success: true` to count.
async fn parse_groups(response: reqwest::Response) -> Result<Vec<GroupRecord>, ClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Http(status));
    }
    let reply: ApiResponse<Vec<GroupRecord>> = response
        .json()
        .await
        .map_err(|e| ClientError::Parse(e.to_string()))?;
    if reply.success {
        Ok(reply.data.unwrap_or_default())
    } else {
        Err(ClientError::Api(
            reply.message.unwrap_or_else(|| "request failed".to_string()),
        ))
    }
}
