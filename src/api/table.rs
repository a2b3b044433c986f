//! Table API Endpoints
//! Mission: CRUD and restore over the broker account table

use crate::{
    api::error::ApiError,
    auth::CurrentUser,
    store::{RecordPatch, TableRecord, TableStore},
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

/// GET /csv
pub async fn list_records(
    State(table): State<Arc<TableStore>>,
) -> Result<Json<Vec<TableRecord>>, ApiError> {
    Ok(Json(table.list().await?))
}

/// POST /csv
pub async fn create_record(
    State(table): State<Arc<TableStore>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    Json(record): Json<TableRecord>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = record.user.clone();
    table.create(record).await?;

    info!(actor = %actor, user = %user, "✅ Record created");
    Ok(MessageResponse::new("Record created successfully"))
}

/// PUT /csv/:user_id
pub async fn update_record(
    State(table): State<Arc<TableStore>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    Path(user_id): Path<String>,
    Json(patch): Json<RecordPatch>,
) -> Result<Json<MessageResponse>, ApiError> {
    let matched = table.update(&user_id, &patch).await?;

    info!(actor = %actor, user = %user_id, matched, "✏️ Record updated");
    Ok(MessageResponse::new("Record updated successfully"))
}

/// DELETE /csv/:record_id
pub async fn delete_record(
    State(table): State<Arc<TableStore>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
    Path(record_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let removed = table.delete(&record_id).await?;

    info!(actor = %actor, user = %record_id, removed, "🗑️ Record deleted");
    Ok(MessageResponse::new("Record deleted successfully"))
}

/// POST /restore
pub async fn restore_backup(
    State(table): State<Arc<TableStore>>,
    Extension(CurrentUser(actor)): Extension<CurrentUser>,
) -> Result<Json<MessageResponse>, ApiError> {
    table.restore().await?;

    info!(actor = %actor, "♻️ Backup restored");
    Ok(MessageResponse::new("Backup restored successfully"))
}
