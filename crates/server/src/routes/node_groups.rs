use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use common::types::{ApiResponse, GroupRecord, GroupUpsert};
use service::groups::UpsertOutcome;

use crate::errors::ApiError;
use crate::routes::ServerState;

/// `GET /api/node-groups`: the full collection, empty when nothing is
/// stored yet.
pub async fn list_groups(
    State(state): State<ServerState>,
) -> Result<Json<ApiResponse<Vec<GroupRecord>>>, ApiError> {
    let groups = state.groups.list().await?;
    Ok(Json(ApiResponse::ok(groups)))
}

/// `POST /api/node-groups`: create (body without `id`) or update (body
/// with `id`). The body is parsed by hand so malformed JSON lands in the
/// infrastructure error class instead of a framework reject.
pub async fn upsert_group(
    State(state): State<ServerState>,
    body: Bytes,
) -> Result<Json<ApiResponse<Vec<GroupRecord>>>, ApiError> {
    let input: GroupUpsert = serde_json::from_slice(&body)
        .map_err(|e| ApiError::Internal(format!("invalid request body: {e}")))?;

    let (outcome, groups) = state.groups.upsert(input).await?;
    let message = match outcome {
        UpsertOutcome::Created => "created",
        UpsertOutcome::Updated => "updated",
    };
    Ok(Json(ApiResponse::ok_with_message(message, groups)))
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub id: Option<String>,
}

/// `DELETE /api/node-groups?id=<id>`: a missing or empty `id` is rejected
/// before the store is touched.
pub async fn delete_group(
    State(state): State<ServerState>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<ApiResponse<Vec<GroupRecord>>>, ApiError> {
    let id = query.id.unwrap_or_default();
    let groups = state.groups.delete(&id).await?;
    Ok(Json(ApiResponse::ok_with_message("deleted", groups)))
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
